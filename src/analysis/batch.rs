//! Parallel analysis of many images.

use crate::analysis::{AnalysisReport, Detector};
use crate::error::{Error, Result};
use crate::imaging::{has_image_extension, load_gray};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Analysis outcome for one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Input path.
    pub path: PathBuf,
    /// One report per detector, in detector order. Empty on failure.
    pub reports: Vec<AnalysisReport>,
    /// Error that stopped this file, if any.
    pub error: Option<String>,
}

impl BatchEntry {
    /// Whether any detector flagged the image.
    pub fn flagged(&self) -> bool {
        self.reports.iter().any(|r| r.verdict().contains_payload)
    }
}

/// Run every detector over every image on a pool of `workers` threads.
///
/// Entries come back in input order. A file that fails to load or analyse
/// records its error and does not stop the batch.
pub fn analyze_batch(
    paths: &[PathBuf],
    detectors: &[Box<dyn Detector>],
    workers: usize,
) -> Result<Vec<BatchEntry>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| Error::InvalidConfig(format!("cannot build worker pool: {e}")))?;

    info!(images = paths.len(), detectors = detectors.len(), workers, "Starting batch analysis");

    let entries: Vec<BatchEntry> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| analyze_one(path, detectors))
            .collect()
    });

    let failed = entries.iter().filter(|e| e.error.is_some()).count();
    let flagged = entries.iter().filter(|e| e.flagged()).count();
    info!(images = entries.len(), flagged, failed, "Batch analysis complete");

    Ok(entries)
}

fn analyze_one(path: &Path, detectors: &[Box<dyn Detector>]) -> BatchEntry {
    let result = load_gray(path).and_then(|img| {
        detectors
            .iter()
            .map(|detector| detector.analyze(&img))
            .collect::<Result<Vec<_>>>()
    });

    match result {
        Ok(reports) => {
            debug!(path = %path.display(), reports = reports.len(), "Analysed image");
            BatchEntry {
                path: path.to_path_buf(),
                reports,
                error: None,
            }
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Analysis failed");
            BatchEntry {
                path: path.to_path_buf(),
                reports: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Collect image files below `root`, sorted by path.
///
/// A file path is returned as-is when it has an image extension.
pub fn collect_images(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Path not found: {}", root.display()),
        )));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_image_extension(p))
        .collect();
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::natural_cover;
    use crate::analysis::{detectors, Method};
    use crate::config::LabConfig;
    use tempfile::TempDir;

    #[test]
    fn test_collect_images_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["b.png", "a.bmp", "notes.txt", "nested/c.PNG"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let found = collect_images(dir.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.bmp", "b.png", "nested/c.PNG"]);
    }

    #[test]
    fn test_collect_missing_dir() {
        let result = collect_images(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_batch_keeps_order_and_records_failures() {
        let dir = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for i in 0..3 {
            let path = dir.path().join(format!("img{i}.png"));
            natural_cover(32, 32, i).save(&path).unwrap();
            paths.push(path);
        }
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();
        paths.insert(1, broken.clone());

        let config = LabConfig::default();
        let detectors = detectors(&config, &[Method::Rs, Method::Aump]);
        let entries = analyze_batch(&paths, &detectors, 2).unwrap();

        assert_eq!(entries.len(), 4);
        for (entry, path) in entries.iter().zip(&paths) {
            assert_eq!(&entry.path, path);
        }
        assert!(entries[1].error.is_some());
        assert!(entries[1].reports.is_empty());
        for i in [0, 2, 3] {
            assert!(entries[i].error.is_none());
            assert_eq!(entries[i].reports[0].method(), Method::Rs);
            assert_eq!(entries[i].reports[1].method(), Method::Aump);
        }
    }

    #[test]
    fn test_batch_report_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("one.png");
        natural_cover(32, 32, 5).save(&path).unwrap();

        let config = LabConfig::default();
        let entries =
            analyze_batch(&[path], &detectors(&config, &Method::ALL), 1).unwrap();
        let json = serde_json::to_string(&entries).unwrap();
        let back: Vec<BatchEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0].reports.len(), 3);
    }
}
