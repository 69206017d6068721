use tokio::sync::RwLock;

use crate::classifier::gemini::GeminiClient;
use crate::classifier::{ClassifierAdapter, LabelService};
use crate::config::AppConfig;
use crate::error::Result;
use crate::organizer::FileOrganizer;
use crate::queue::FileQueue;

/// Everything a run needs, built once from the configuration and passed
/// explicitly to each stage.
pub struct AppState {
    pub config: AppConfig,
    pub classifier: ClassifierAdapter,
    pub organizer: FileOrganizer,
    pub file_queue: RwLock<FileQueue>,
}

impl AppState {
    /// Build the state with the Gemini-backed classifier. Fails with a setup
    /// error when no credential is configured.
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = GeminiClient::new(&config.classifier, config.api_key()?)?;
        Ok(Self::with_service(config, Box::new(client)))
    }

    pub fn with_service(config: AppConfig, service: Box<dyn LabelService>) -> Self {
        let classifier = ClassifierAdapter::new(service, config.classifier.max_image_bytes);
        let organizer = FileOrganizer::new(&config.output);

        Self {
            config,
            classifier,
            organizer,
            file_queue: RwLock::new(FileQueue::new()),
        }
    }
}
