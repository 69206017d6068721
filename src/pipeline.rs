use std::path::Path;

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::queue::{self, task::Task, task::TaskOrigin};
use crate::scan;
use crate::types::{FileReport, ProcessingOutcome, RunSummary};

/// Create the output root up front so a bad location is a setup failure
/// rather than one error per file.
pub async fn prepare_output_root(state: &AppState) -> Result<()> {
    let root = state.organizer.output_root();
    tokio::fs::create_dir_all(root).await.map_err(|e| {
        AppError::Setup(format!(
            "cannot create output directory '{}': {e}",
            root.display()
        ))
    })
}

/// Classify one file and move it to its destination.
///
/// Classification problems are not errors: the file goes to the failure
/// bucket. Only filesystem problems are returned as `Err`.
pub async fn process_file(state: &AppState, source: &Path) -> Result<FileReport> {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| AppError::Filesystem(format!("Invalid file path {}", source.display())))?;

    let outcome = state.classifier.classify_file(source).await?;

    if let ProcessingOutcome::Failure(reason) = &outcome {
        tracing::warn!(
            file = %file_name,
            reason = %reason,
            "Could not classify document, moving to failure bucket"
        );
    }

    let report = state.organizer.organize(source, &outcome).await?;

    tracing::info!(
        file = %file_name,
        destination = %report.destination.display(),
        placement = ?report.placement,
        "Moved file"
    );

    Ok(report)
}

/// One-shot mode: process every file currently in `input_dir`.
pub async fn process_directory(state: &AppState, input_dir: &Path) -> Result<RunSummary> {
    let files = scan::list_input_files(input_dir).await?;

    if files.is_empty() {
        tracing::info!(input = %input_dir.display(), "No files to process");
        return Ok(RunSummary::default());
    }

    tracing::info!(
        count = files.len(),
        input = %input_dir.display(),
        output = %state.organizer.output_root().display(),
        "Processing files"
    );

    {
        let mut file_queue = state.file_queue.write().await;
        for path in files {
            file_queue.enqueue(Task::new(path, TaskOrigin::Scan));
        }
    }

    Ok(queue::drain_queue(state).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassificationError, DocumentImage, LabelService};
    use crate::config::AppConfig;
    use crate::organizer::FAILED_DIR;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Replies keyed by file name; unknown names get an unparseable reply.
    struct ScriptedService {
        replies: HashMap<String, std::result::Result<String, ClassificationError>>,
    }

    #[async_trait]
    impl LabelService for ScriptedService {
        async fn label(
            &self,
            image: &DocumentImage<'_>,
        ) -> std::result::Result<String, ClassificationError> {
            self.replies
                .get(image.file_name)
                .cloned()
                .unwrap_or_else(|| Ok("not json".to_string()))
        }
    }

    fn label(doc_type: &str, serial: &str) -> std::result::Result<String, ClassificationError> {
        Ok(format!(
            r#"{{"documentType": "{doc_type}", "serialNumber": "{serial}", "site": "ATR 60"}}"#
        ))
    }

    fn state(
        output: PathBuf,
        replies: Vec<(&str, std::result::Result<String, ClassificationError>)>,
    ) -> AppState {
        let mut config = AppConfig::default();
        config.output.root = output;
        let service = ScriptedService {
            replies: replies
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        };
        AppState::with_service(config, Box::new(service))
    }

    fn count_files(dir: &Path) -> usize {
        let mut count = 0;
        for entry in std::fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            if entry.file_type().unwrap().is_dir() {
                count += count_files(&entry.path());
            } else {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_success_example() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("scan1.jpg"), b"jpeg").unwrap();

        let out = tmp.path().join("out");
        let state = state(out.clone(), vec![("scan1.jpg", label("Delivery Challan", "67890"))]);

        let summary = process_directory(&state, &input).await.unwrap();

        assert_eq!(summary.sorted, 1);
        assert!(out.join("delivery_challan/delivery_challan_67890.jpg").exists());
        assert!(!input.join("scan1.jpg").exists());
    }

    #[tokio::test]
    async fn test_failure_example() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("blurry.png"), b"blurry pixels").unwrap();

        let out = tmp.path().join("out");
        let state = state(out.clone(), vec![]);

        let summary = process_directory(&state, &input).await.unwrap();

        assert_eq!(summary.quarantined, 1);
        let moved = out.join(FAILED_DIR).join("blurry.png");
        assert_eq!(std::fs::read(moved).unwrap(), b"blurry pixels");
        assert!(!input.join("blurry.png").exists());
    }

    #[tokio::test]
    async fn test_no_file_lost_or_duplicated() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        std::fs::create_dir(&input).unwrap();
        let names = [
            "a.jpg", "b.jpg", "c.png", "d.jpg", "e.txt", "f.jpeg", "g.png",
        ];
        for name in names {
            std::fs::write(input.join(name), name.as_bytes()).unwrap();
        }

        let out = tmp.path().join("out");
        let state = state(
            out.clone(),
            vec![
                ("a.jpg", label("Receipt Memo", "58653")),
                // Same label as a.jpg: must not overwrite.
                ("b.jpg", label("Receipt Memo", "58653")),
                ("c.png", label("Unknown", "1")),
                ("d.jpg", Err(ClassificationError::Unreachable("offline".to_string()))),
                ("f.jpeg", label("Goods Received Note", "GRN-77")),
            ],
        );

        let summary = process_directory(&state, &input).await.unwrap();

        assert_eq!(summary.total(), names.len());
        assert_eq!(summary.sorted, 3);
        assert_eq!(summary.quarantined, 4);
        assert_eq!(summary.errored, 0);
        assert_eq!(count_files(&out), names.len());
        assert_eq!(count_files(&input), 0);

        assert!(out.join("receipt_memo/receipt_memo_58653.jpg").exists());
        assert!(out.join("receipt_memo/receipt_memo_58653_1.jpg").exists());
        assert!(out.join("goods_received_note/goods_received_note_GRN77.jpeg").exists());
        for name in ["c.png", "d.jpg", "e.txt", "g.png"] {
            assert!(out.join(FAILED_DIR).join(name).exists(), "{name}");
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path().join("out"), vec![]);
        let summary = process_directory(&state, tmp.path()).await.unwrap();
        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_hidden_files_left_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        let out = tmp.path().join("out");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join(".scan2.jpg"), b"hidden").unwrap();
        std::fs::write(input.join("scan1.jpg"), b"visible").unwrap();

        let state = state(out.clone(), vec![("scan1.jpg", label("Oil Issue", "7"))]);
        let summary = process_directory(&state, &input).await.unwrap();

        assert_eq!(summary.total(), 1);
        assert_eq!(summary.sorted, 1);
        assert_eq!(std::fs::read(input.join(".scan2.jpg")).unwrap(), b"hidden");
        assert!(!out.join(FAILED_DIR).join(".scan2.jpg").exists());
    }

    #[tokio::test]
    async fn test_process_missing_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let state = state(tmp.path().join("out"), vec![]);
        let result = process_file(&state, &tmp.path().join("gone.jpg")).await;
        assert!(matches!(result, Err(AppError::Filesystem(_))));
    }

    #[tokio::test]
    async fn test_prepare_output_root() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested/out");
        let state = state(out.clone(), vec![]);
        prepare_output_root(&state).await.unwrap();
        assert!(out.is_dir());
    }
}
