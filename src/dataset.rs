//! Dataset folder scanning.
//!
//! The layout is `root/<person>/<image>.jpg`. Each person's images are sorted
//! by file name; the first becomes the reference sample and the rest become
//! queries. Persons with fewer than two images are left out entirely.

use anyhow::{Context, Result};
use log::warn;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const IMAGE_SUFFIX: &str = ".jpg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub label: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPerson {
    pub label: String,
    pub images: usize,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Split {
    pub references: Vec<Sample>,
    pub queries: Vec<Sample>,
    pub skipped: Vec<SkippedPerson>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSummary {
    pub persons: usize,
    pub references: usize,
    pub queries: usize,
    pub skipped: usize,
}

impl Split {
    pub fn summary(&self) -> SplitSummary {
        SplitSummary {
            persons: self.references.len() + self.skipped.len(),
            references: self.references.len(),
            queries: self.queries.len(),
            skipped: self.skipped.len(),
        }
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        match entry.file_name().into_string() {
            Ok(name) => entries.push((name, entry.path())),
            Err(name) => warn!("Ignoring non UTF-8 entry {:?} in {}", name, dir.display()),
        }
    }
    entries.sort();
    Ok(entries)
}

/// Sorted `.jpg` files directly inside a person folder.
pub fn person_images(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|(name, path)| name.ends_with(IMAGE_SUFFIX) && path.is_file())
        .map(|(_, path)| path)
        .collect())
}

/// Partition the dataset at `root` into reference and query samples.
pub fn scan(root: &Path) -> Result<Split> {
    let mut split = Split::default();

    for (person, dir) in sorted_entries(root)? {
        if !dir.is_dir() {
            continue;
        }
        let images = person_images(&dir)?;
        if images.len() < 2 {
            warn!(
                "Person {} has only {} image(s). Skipping.",
                person,
                images.len()
            );
            split.skipped.push(SkippedPerson {
                label: person,
                images: images.len(),
            });
            continue;
        }

        let mut images = images.into_iter();
        if let Some(first) = images.next() {
            split.references.push(Sample {
                label: person.clone(),
                path: first,
            });
        }
        split.queries.extend(images.map(|path| Sample {
            label: person.clone(),
            path,
        }));
    }

    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn first_sorted_image_is_reference() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "alice/c.jpg");
        touch(dir.path(), "alice/a.jpg");
        touch(dir.path(), "alice/b.jpg");

        let split = scan(dir.path()).unwrap();
        assert_eq!(split.references.len(), 1);
        assert_eq!(split.references[0].label, "alice");
        assert!(split.references[0].path.ends_with("alice/a.jpg"));

        let queries: Vec<_> = split
            .queries
            .iter()
            .map(|s| s.path.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(queries, vec!["b.jpg", "c.jpg"]);
    }

    #[test]
    fn single_image_person_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "solo/only.jpg");
        touch(dir.path(), "pair/1.jpg");
        touch(dir.path(), "pair/2.jpg");
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let split = scan(dir.path()).unwrap();
        assert!(split.references.iter().all(|s| s.label == "pair"));
        assert!(split.queries.iter().all(|s| s.label == "pair"));
        assert_eq!(
            split.skipped,
            vec![
                SkippedPerson {
                    label: "empty".into(),
                    images: 0
                },
                SkippedPerson {
                    label: "solo".into(),
                    images: 1
                },
            ]
        );
    }

    #[test]
    fn only_jpg_files_count() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "bob/1.jpg");
        touch(dir.path(), "bob/2.png");
        touch(dir.path(), "bob/3.JPG");
        touch(dir.path(), "bob/notes.txt");
        fs::create_dir_all(dir.path().join("bob/4.jpg")).unwrap();

        let split = scan(dir.path()).unwrap();
        assert!(split.references.is_empty());
        assert_eq!(split.skipped[0].images, 1);
    }

    #[test]
    fn root_files_are_not_persons() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "readme.jpg");
        touch(dir.path(), "carol/1.jpg");
        touch(dir.path(), "carol/2.jpg");

        let summary = scan(dir.path()).unwrap().summary();
        assert_eq!(
            summary,
            SplitSummary {
                persons: 1,
                references: 1,
                queries: 1,
                skipped: 0,
            }
        );
    }

    #[test]
    fn n_images_give_n_minus_one_queries() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            touch(dir.path(), &format!("dave/{:02}.jpg", i));
        }
        touch(dir.path(), "erin/x.jpg");
        touch(dir.path(), "erin/y.jpg");

        let split = scan(dir.path()).unwrap();
        assert_eq!(split.references.len(), 2);
        assert_eq!(split.queries.iter().filter(|s| s.label == "dave").count(), 4);
        assert_eq!(split.queries.iter().filter(|s| s.label == "erin").count(), 1);
        assert_eq!(split.references[0].label, "dave");
    }

    #[test]
    fn missing_root_is_an_error() {
        let err = scan(Path::new("/nonexistent/dataset")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dataset"));
    }
}
