use std::fmt::Write;

use anyhow::Result;
use serde::Serialize;

use crate::eval::{EvalError, Report};

pub const NO_TEST_IMAGES: &str = "No test images with detected faces.";

/// The one-line result printed at the end of a run.
pub fn accuracy_line(report: &Report) -> String {
    match report.accuracy() {
        Some(accuracy) => format!("Accuracy: {:.4}", accuracy),
        None => NO_TEST_IMAGES.to_string(),
    }
}

pub fn per_person_table(report: &Report) -> String {
    let rows = report.per_person();
    let width = rows.keys().map(|l| l.len()).max().unwrap_or(0).max(6);
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  correct  total  accuracy", "person");
    for (label, score) in rows {
        let acc = score.accuracy().unwrap_or(0.0);
        let _ = writeln!(
            out,
            "{:<width$}  {:>7}  {:>5}  {:>8.4}",
            label, score.correct, score.total, acc
        );
    }
    out
}

/// Message for a run that stopped before scoring, if `err` is such a stop.
pub fn early_exit_message(err: &anyhow::Error) -> Option<String> {
    err.downcast_ref::<EvalError>().map(|e| e.to_string())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    accuracy: Option<f64>,
    #[serde(flatten)]
    report: &'a Report,
}

pub fn to_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport {
        accuracy: report.accuracy(),
        report,
    })?)
}
