// src/storage/mod.rs
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use crate::cot::models::ReportDocument;
use crate::utils::error::StorageError;

const REPORT_PREFIX: &str = "cot-report-";
const REPORT_EXT: &str = ".json";

/// How saved reports are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoragePolicy {
    /// One new `cot-report-<timestamp>.json` per save. Existing files are never touched.
    Timestamped,
    /// Every save overwrites the same file.
    Fixed(String),
}

/// Where a report ended up on disk.
#[derive(Debug, Clone)]
pub struct SavedReport {
    pub filename: String,
    pub path: PathBuf,
}

pub struct StorageManager {
    base_dir: PathBuf,
    policy: StoragePolicy,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P, policy: StoragePolicy) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path, policy })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Serializes the report as pretty JSON under a name chosen by the policy.
    pub fn save_report(&self, report: &ReportDocument) -> Result<SavedReport, StorageError> {
        let body = serde_json::to_string_pretty(report)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let saved = match &self.policy {
            StoragePolicy::Timestamped => {
                let filename = timestamped_filename(chrono::Utc::now());
                let path = self.base_dir.join(&filename);

                // create_new keeps two saves in the same instant from clobbering each other
                let mut file = fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .map_err(|e| match e.kind() {
                        ErrorKind::AlreadyExists => StorageError::FileExists(path.display().to_string()),
                        _ => StorageError::IoError(e),
                    })?;
                file.write_all(body.as_bytes())
                    .map_err(StorageError::IoError)?;
                SavedReport { filename, path }
            }
            StoragePolicy::Fixed(name) => {
                let path = self.base_dir.join(name);
                fs::write(&path, body)
                    .map_err(StorageError::IoError)?;
                SavedReport { filename: name.clone(), path }
            }
        };

        tracing::info!("Saved COT report to {}", saved.path.display());
        Ok(saved)
    }

    /// Names of the stored reports, most recent first.
    pub fn list_reports(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_report_file(&name) {
                names.push(name);
            }
        }

        // Timestamps are zero-padded ISO-8601, so lexical order is chronological.
        names.sort();
        names.reverse();
        Ok(names)
    }

    /// Loads the most recently saved report.
    pub fn load_latest(&self) -> Result<ReportDocument, StorageError> {
        let latest = self
            .list_reports()?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::NotFound(self.base_dir.display().to_string()))?;

        tracing::debug!("Latest COT report is {}", latest);
        self.load(&latest)
    }

    /// Loads one stored report by file name.
    pub fn load(&self, filename: &str) -> Result<ReportDocument, StorageError> {
        let path = self.base_dir.join(filename);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
            _ => StorageError::IoError(e),
        })?;

        serde_json::from_str(&content)
            .map_err(|e| StorageError::SerializationError(format!("{}: {}", path.display(), e)))
    }

    fn is_report_file(&self, name: &str) -> bool {
        match &self.policy {
            StoragePolicy::Fixed(fixed) => name == fixed,
            StoragePolicy::Timestamped => name.starts_with(REPORT_PREFIX) && name.ends_with(REPORT_EXT),
        }
    }
}

/// `cot-report-2025-10-17T14-03-22-123Z.json`: ISO-8601 with `:` and `.` made filename-safe.
fn timestamped_filename(now: chrono::DateTime<chrono::Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}{}{}", REPORT_PREFIX, stamp, REPORT_EXT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cot::models::{MarketSection, REPORT_TYPE};
    use chrono::TimeZone;

    fn sample_report(name: &str) -> ReportDocument {
        let mut report = ReportDocument::new();
        report.sections.push(MarketSection {
            market_name: Some(name.to_string()),
            code: Some("099741".to_string()),
            open_interest: Some(805_217),
            ..Default::default()
        });
        report
    }

    #[test]
    fn filename_is_filesystem_safe() {
        let at = chrono::Utc.with_ymd_and_hms(2025, 10, 17, 14, 3, 22).unwrap();
        assert_eq!(timestamped_filename(at), "cot-report-2025-10-17T14-03-22-000Z.json");
    }

    #[test]
    fn save_then_load_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = StorageManager::new(dir.path(), StoragePolicy::Timestamped).unwrap();

        let saved = store.save_report(&sample_report("EURO FX")).unwrap();
        assert!(saved.filename.starts_with(REPORT_PREFIX));
        assert!(saved.path.exists());

        let loaded = store.load_latest().unwrap();
        assert_eq!(loaded.report_type, REPORT_TYPE);
        assert_eq!(loaded, sample_report("EURO FX"));
    }

    #[test]
    fn latest_is_lexically_last_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = StorageManager::new(dir.path(), StoragePolicy::Timestamped).unwrap();
        let older = serde_json::to_string(&sample_report("OLDER")).unwrap();
        let newer = serde_json::to_string(&sample_report("NEWER")).unwrap();
        fs::write(dir.path().join("cot-report-2025-10-07T10-00-00-000Z.json"), older).unwrap();
        fs::write(dir.path().join("cot-report-2025-10-14T10-00-00-000Z.json"), newer).unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let names = store.list_reports().unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0], "cot-report-2025-10-14T10-00-00-000Z.json");

        let latest = store.load_latest().unwrap();
        assert_eq!(latest.sections[0].market_name.as_deref(), Some("NEWER"));
    }

    #[test]
    fn empty_store_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = StorageManager::new(dir.path().join("nested/data"), StoragePolicy::Timestamped).unwrap();
        assert!(store.base_dir().exists());
        assert!(matches!(store.load_latest(), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn fixed_policy_overwrites_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StorageManager::new(dir.path(), StoragePolicy::Fixed("cot-data.json".to_string())).unwrap();

        store.save_report(&sample_report("FIRST")).unwrap();
        let saved = store.save_report(&sample_report("SECOND")).unwrap();
        assert_eq!(saved.filename, "cot-data.json");

        assert_eq!(store.list_reports().unwrap(), vec!["cot-data.json".to_string()]);
        let latest = store.load_latest().unwrap();
        assert_eq!(latest.sections[0].market_name.as_deref(), Some("SECOND"));
    }

    #[test]
    fn corrupt_artifact_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = StorageManager::new(dir.path(), StoragePolicy::Timestamped).unwrap();
        fs::write(dir.path().join("cot-report-2025-10-14T10-00-00-000Z.json"), "not json").unwrap();
        assert!(matches!(store.load_latest(), Err(StorageError::SerializationError(_))));
    }
}
