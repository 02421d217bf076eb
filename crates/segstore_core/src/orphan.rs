//! Archive orphan reconciliation.
//!
//! Compares the archive destination directory with the metadata
//! provider's view of what has been archived and reports every
//! discrepancy through the notification channel. The reconciler never
//! touches the store or the archive; cleanup is an operator decision.

use crate::error::CoreResult;
use crate::notify::Notifier;
use crate::provider::MetadataProvider;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Read-only consistency check between archive directory and metadata.
pub struct OrphanReconciler<'a> {
    archive_dir: PathBuf,
    provider: &'a dyn MetadataProvider,
    notifier: &'a dyn Notifier,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OrphanReport {
    /// Files in the archive directory matching neither a known container
    /// nor an archived data set's tarball.
    pub unknown_files: Vec<String>,
    /// Containers recorded as archived but absent from the directory.
    pub missing_containers: Vec<String>,
    /// Data sets recorded as archived with no tarball in the directory.
    pub missing_data_sets: Vec<String>,
}

impl OrphanReport {
    /// Whether directory and metadata agree completely.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unknown_files.is_empty()
            && self.missing_containers.is_empty()
            && self.missing_data_sets.is_empty()
    }
}

impl<'a> OrphanReconciler<'a> {
    /// Creates a reconciler for the given archive directory.
    #[must_use]
    pub fn new(
        archive_dir: impl Into<PathBuf>,
        provider: &'a dyn MetadataProvider,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            provider,
            notifier,
        }
    }

    /// Runs the reconciliation and reports discrepancies.
    pub fn run(&self) -> CoreResult<OrphanReport> {
        let containers: BTreeSet<String> =
            self.provider.list_archived_containers()?.into_iter().collect();
        let codes: BTreeSet<String> =
            self.provider.list_archived_data_sets()?.into_iter().collect();
        let files = list_file_names(&self.archive_dir)?;

        let report = reconcile(&containers, &codes, &files);
        info!(
            "Reconciled {} archive files against {} containers and {} archived data sets.",
            files.len(),
            containers.len(),
            codes.len()
        );
        if !report.is_clean() {
            self.notifier
                .notify("Archive inconsistencies detected", &render_report(&report));
        }
        Ok(report)
    }
}

fn reconcile(
    containers: &BTreeSet<String>,
    codes: &BTreeSet<String>,
    files: &BTreeSet<String>,
) -> OrphanReport {
    let mut report = OrphanReport::default();
    for file in files {
        let known = containers.contains(file)
            || tarball_code(file).is_some_and(|code| codes.contains(code));
        if !known {
            report.unknown_files.push(file.clone());
        }
    }
    for container in containers {
        if !files.contains(container) {
            report.missing_containers.push(container.clone());
        }
    }
    for code in codes {
        let present = files.contains(&format!("{code}.tar")) || files.contains(&format!("{code}.zip"));
        if !present {
            report.missing_data_sets.push(code.clone());
        }
    }
    report
}

/// Extracts the data set code from an archive tarball name.
fn tarball_code(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".tar")
        .or_else(|| file_name.strip_suffix(".zip"))
}

fn list_file_names(dir: &Path) -> CoreResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

fn render_report(report: &OrphanReport) -> String {
    let mut body = String::new();
    if !report.unknown_files.is_empty() {
        body.push_str("Files found in the archive but unknown to the database:\n");
        for file in &report.unknown_files {
            body.push_str(&format!("  {file}\n"));
        }
    }
    if !report.missing_containers.is_empty() {
        body.push_str("Containers recorded in the database but missing in the archive:\n");
        for container in &report.missing_containers {
            body.push_str(&format!("  {container}\n"));
        }
    }
    if !report.missing_data_sets.is_empty() {
        body.push_str("Archived data sets without a tarball in the archive:\n");
        for code in &report.missing_data_sets {
            body.push_str(&format!("  {code}\n"));
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataSet;
    use parking_lot::Mutex;
    use tempfile::tempdir;

    struct ArchiveProvider {
        containers: Vec<String>,
        codes: Vec<String>,
    }

    impl MetadataProvider for ArchiveProvider {
        fn list_data_sets(&self) -> CoreResult<Vec<DataSet>> {
            Ok(Vec::new())
        }
        fn update_share_and_size(&self, _: &str, _: &str, _: u64) -> CoreResult<()> {
            Ok(())
        }
        fn set_size(&self, _: &str, _: u64) -> CoreResult<()> {
            Ok(())
        }
        fn list_archived_containers(&self) -> CoreResult<Vec<String>> {
            Ok(self.containers.clone())
        }
        fn list_archived_data_sets(&self) -> CoreResult<Vec<String>> {
            Ok(self.codes.clone())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, subject: &str, body: &str) {
            self.messages
                .lock()
                .push((subject.to_string(), body.to_string()));
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn consistent_archive_stays_silent() {
        let temp = tempdir().unwrap();
        for name in ["container-1", "ds-1.tar", "ds-2.zip"] {
            fs::write(temp.path().join(name), b"").unwrap();
        }
        let provider = ArchiveProvider {
            containers: strings(&["container-1"]),
            codes: strings(&["ds-1", "ds-2"]),
        };
        let notifier = RecordingNotifier::default();

        let report = OrphanReconciler::new(temp.path(), &provider, &notifier)
            .run()
            .unwrap();
        assert!(report.is_clean());
        assert!(notifier.messages.lock().is_empty());
    }

    #[test]
    fn unknown_file_is_reported() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("stray.tar"), b"").unwrap();
        let provider = ArchiveProvider {
            containers: Vec::new(),
            codes: Vec::new(),
        };
        let notifier = RecordingNotifier::default();

        let report = OrphanReconciler::new(temp.path(), &provider, &notifier)
            .run()
            .unwrap();
        assert_eq!(report.unknown_files, strings(&["stray.tar"]));
        let messages = notifier.messages.lock();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("stray.tar"));
    }

    #[test]
    fn missing_container_and_tarball_are_reported() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("ds-1.tar"), b"").unwrap();
        let provider = ArchiveProvider {
            containers: strings(&["container-9"]),
            codes: strings(&["ds-1", "ds-2"]),
        };
        let notifier = RecordingNotifier::default();

        let report = OrphanReconciler::new(temp.path(), &provider, &notifier)
            .run()
            .unwrap();
        assert_eq!(report.missing_containers, strings(&["container-9"]));
        assert_eq!(report.missing_data_sets, strings(&["ds-2"]));
        assert!(report.unknown_files.is_empty());
    }

    #[test]
    fn either_tarball_flavor_satisfies_an_archived_code() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("ds-1.zip"), b"").unwrap();
        let provider = ArchiveProvider {
            containers: Vec::new(),
            codes: strings(&["ds-1"]),
        };
        let notifier = RecordingNotifier::default();

        let report = OrphanReconciler::new(temp.path(), &provider, &notifier)
            .run()
            .unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn reconciler_leaves_the_archive_untouched() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("stray.bin"), b"payload").unwrap();
        let provider = ArchiveProvider {
            containers: Vec::new(),
            codes: Vec::new(),
        };
        let notifier = RecordingNotifier::default();

        OrphanReconciler::new(temp.path(), &provider, &notifier)
            .run()
            .unwrap();
        assert_eq!(fs::read(temp.path().join("stray.bin")).unwrap(), b"payload");
    }
}
