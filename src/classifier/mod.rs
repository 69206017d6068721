pub mod gemini;
pub mod parse;
pub mod prompt;

use std::path::Path;

use async_trait::async_trait;
use mime_guess::Mime;
use thiserror::Error;

use crate::error::{AppError, Result};
use crate::types::ProcessingOutcome;

/// Why a document could not be labelled. Carried inside
/// `ProcessingOutcome::Failure`, never returned as an `Err`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("classification service unreachable: {0}")]
    Unreachable(String),

    #[error("classification service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("classification service returned an empty reply")]
    EmptyReply,

    #[error("classification reply is not valid JSON: {0}")]
    Malformed(String),

    #[error("classification reply is missing `{0}`")]
    MissingField(&'static str),

    #[error("document not recognised (type '{document_type}', serial '{serial_number}')")]
    Unrecognized {
        document_type: String,
        serial_number: String,
    },

    #[error("not an image ({0})")]
    UnsupportedMedia(String),

    #[error("file is empty")]
    EmptyFile,

    #[error("image is too large ({size} bytes, max {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },
}

/// One document image handed to the labelling service.
pub struct DocumentImage<'a> {
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub bytes: &'a [u8],
}

/// The external vision model: image in, raw reply text out.
#[async_trait]
pub trait LabelService: Send + Sync {
    async fn label(
        &self,
        image: &DocumentImage<'_>,
    ) -> std::result::Result<String, ClassificationError>;
}

pub struct ClassifierAdapter {
    service: Box<dyn LabelService>,
    max_image_bytes: u64,
}

impl ClassifierAdapter {
    pub fn new(service: Box<dyn LabelService>, max_image_bytes: u64) -> Self {
        Self {
            service,
            max_image_bytes,
        }
    }

    /// Classify one document from its bytes. Makes at most one service call.
    pub async fn classify(&self, file_name: &str, bytes: &[u8]) -> ProcessingOutcome {
        let mime = match image_mime(file_name) {
            Ok(mime) => mime,
            Err(e) => return ProcessingOutcome::Failure(e),
        };
        if let Err(e) = self.check_size(bytes.len() as u64) {
            return ProcessingOutcome::Failure(e);
        }

        self.label_image(file_name, mime.essence_str(), bytes).await
    }

    /// Classify the file at `path`, reading it only once the name and size
    /// pass the gates. Never modifies the file.
    ///
    /// Only filesystem problems are returned as `Err`.
    pub async fn classify_file(&self, path: &Path) -> Result<ProcessingOutcome> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| AppError::Filesystem(format!("Invalid file path {}", path.display())))?;

        if let Err(e) = image_mime(&file_name) {
            return Ok(ProcessingOutcome::Failure(e));
        }

        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| AppError::Filesystem(format!("Failed to inspect {file_name}: {e}")))?
            .len();
        if let Err(e) = self.check_size(size) {
            return Ok(ProcessingOutcome::Failure(e));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Filesystem(format!("Failed to read {file_name}: {e}")))?;

        // Gates run again on the bytes: the file may have grown since.
        Ok(self.classify(&file_name, &bytes).await)
    }

    fn check_size(&self, size: u64) -> std::result::Result<(), ClassificationError> {
        if size == 0 {
            return Err(ClassificationError::EmptyFile);
        }
        if size > self.max_image_bytes {
            return Err(ClassificationError::TooLarge {
                size,
                limit: self.max_image_bytes,
            });
        }
        Ok(())
    }

    async fn label_image(&self, file_name: &str, mime_type: &str, bytes: &[u8]) -> ProcessingOutcome {
        let image = DocumentImage {
            file_name,
            mime_type,
            bytes,
        };

        tracing::info!(file = file_name, mime = mime_type, "Analyzing document");

        let reply = match self.service.label(&image).await {
            Ok(reply) => reply,
            Err(e) => return ProcessingOutcome::Failure(e),
        };

        match parse::parse_reply(&reply) {
            Ok(result) => {
                tracing::info!(
                    file = file_name,
                    document_type = %result.document_type,
                    serial = %result.serial_number,
                    site = result.site.as_deref().unwrap_or("-"),
                    "Detected document"
                );
                ProcessingOutcome::Success(result)
            }
            Err(e) => ProcessingOutcome::Failure(e),
        }
    }
}

/// MIME type guessed from the file name, if it is an image.
fn image_mime(file_name: &str) -> std::result::Result<Mime, ClassificationError> {
    match mime_guess::from_path(file_name).first() {
        Some(m) if m.type_() == mime_guess::mime::IMAGE => Ok(m),
        Some(m) => Err(ClassificationError::UnsupportedMedia(
            m.essence_str().to_string(),
        )),
        None => Err(ClassificationError::UnsupportedMedia(
            "unknown type".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedReply {
        reply: std::result::Result<String, ClassificationError>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LabelService for FixedReply {
        async fn label(
            &self,
            _image: &DocumentImage<'_>,
        ) -> std::result::Result<String, ClassificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn adapter(
        reply: std::result::Result<String, ClassificationError>,
    ) -> (ClassifierAdapter, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = FixedReply {
            reply,
            calls: Arc::clone(&calls),
        };
        (ClassifierAdapter::new(Box::new(service), 1024), calls)
    }

    #[tokio::test]
    async fn test_success() {
        let (adapter, calls) = adapter(Ok(
            r#"{"documentType": "Delivery Challan", "serialNumber": "67890"}"#.to_string(),
        ));
        match adapter.classify("scan1.jpg", b"jpegbytes").await {
            ProcessingOutcome::Success(result) => {
                assert_eq!(result.document_type, "Delivery Challan");
                assert_eq!(result.serial_number, "67890");
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_service_failure_becomes_outcome() {
        let (adapter, _) = adapter(Err(ClassificationError::Unreachable("dns".to_string())));
        let outcome = adapter.classify("scan1.png", b"png").await;
        assert!(matches!(
            outcome,
            ProcessingOutcome::Failure(ClassificationError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_unparseable_reply() {
        let (adapter, _) = adapter(Ok("I think this is a receipt".to_string()));
        let outcome = adapter.classify("blurry.png", b"png").await;
        assert!(matches!(
            outcome,
            ProcessingOutcome::Failure(ClassificationError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_non_image_skips_service() {
        let (adapter, calls) = adapter(Ok("{}".to_string()));
        let outcome = adapter.classify("notes.txt", b"hello").await;
        assert!(matches!(
            outcome,
            ProcessingOutcome::Failure(ClassificationError::UnsupportedMedia(_))
        ));

        let outcome = adapter.classify("no_extension", b"hello").await;
        assert!(matches!(outcome, ProcessingOutcome::Failure(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_and_oversized_files() {
        let (adapter, calls) = adapter(Ok("{}".to_string()));
        assert!(matches!(
            adapter.classify("a.jpg", b"").await,
            ProcessingOutcome::Failure(ClassificationError::EmptyFile)
        ));
        assert!(matches!(
            adapter.classify("b.jpg", &vec![0u8; 2048]).await,
            ProcessingOutcome::Failure(ClassificationError::TooLarge { size: 2048, limit: 1024 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classify_file_reads_image() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scan1.jpg");
        std::fs::write(&path, b"jpegbytes").unwrap();

        let (adapter, calls) = adapter(Ok(
            r#"{"documentType": "Oil Issue", "serialNumber": "12"}"#.to_string(),
        ));
        let outcome = adapter.classify_file(&path).await.unwrap();
        assert!(matches!(outcome, ProcessingOutcome::Success(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"jpegbytes");
    }

    #[tokio::test]
    async fn test_classify_file_gates_before_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, vec![0u8; 4096]).unwrap();
        let huge = tmp.path().join("huge.tiff");
        std::fs::write(&huge, vec![0u8; 4096]).unwrap();
        let empty = tmp.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();

        let (adapter, calls) = adapter(Ok("{}".to_string()));

        assert!(matches!(
            adapter.classify_file(&video).await.unwrap(),
            ProcessingOutcome::Failure(ClassificationError::UnsupportedMedia(_))
        ));
        assert!(matches!(
            adapter.classify_file(&huge).await.unwrap(),
            ProcessingOutcome::Failure(ClassificationError::TooLarge { size: 4096, limit: 1024 })
        ));
        assert!(matches!(
            adapter.classify_file(&empty).await.unwrap(),
            ProcessingOutcome::Failure(ClassificationError::EmptyFile)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_classify_file_missing_image_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let (adapter, _) = adapter(Ok("{}".to_string()));
        let result = adapter.classify_file(&tmp.path().join("gone.jpg")).await;
        assert!(matches!(result, Err(AppError::Filesystem(_))));
    }
}
