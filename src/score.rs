use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    pub fn record(&mut self, correct: bool) {
        if correct {
            self.correct += 1;
        }
        self.total += 1;
    }

    /// `None` until at least one query has been scored.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 / self.total as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_score_has_no_accuracy() {
        assert_eq!(Score::default().accuracy(), None);
    }

    #[test]
    fn accuracy_is_correct_over_total() {
        let mut s = Score::default();
        s.record(true);
        s.record(false);
        s.record(true);
        assert_eq!(s, Score { correct: 2, total: 3 });
        assert_eq!(format!("{:.4}", s.accuracy().unwrap()), "0.6667");

        let perfect = Score { correct: 3, total: 3 };
        assert_eq!(perfect.accuracy(), Some(1.0));
    }
}
