use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::algorithms::{LocalSaliencyFactory, RemoteDetectorFactory};
use crate::config::{Config, ExtractorBackend};
use crate::error::AlignResult;
use crate::pipeline::{ExtractorFactory, SignalExtractor};

/// Lazily initialized, reference-counted extractor shared by every clone
/// of the analyzer that owns it.
///
/// Concurrent first callers await one initialization. A failed
/// initialization leaves the cell empty so a later call can retry; a
/// successful one is kept for the rest of the session.
#[derive(Clone)]
pub struct SharedDetector {
    factory: Arc<dyn ExtractorFactory>,
    cell: Arc<OnceCell<Arc<dyn SignalExtractor>>>,
}

impl SharedDetector {
    pub fn new(factory: Arc<dyn ExtractorFactory>) -> Self {
        Self {
            factory,
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// Select the backend named by `extractor.backend`
    pub fn from_config(config: &Config) -> Self {
        let factory: Arc<dyn ExtractorFactory> = match config.extractor.backend {
            ExtractorBackend::Local => Arc::new(LocalSaliencyFactory::new(
                config.extractor.local.clone(),
                config.image.clone(),
            )),
            ExtractorBackend::Remote => {
                Arc::new(RemoteDetectorFactory::new(config.extractor.remote.clone()))
            }
        };
        Self::new(factory)
    }

    /// Wrap an extractor that is already usable
    pub fn ready(extractor: Arc<dyn SignalExtractor>) -> Self {
        Self {
            factory: Arc::new(ReadyFactory(Arc::clone(&extractor))),
            cell: Arc::new(OnceCell::new_with(Some(extractor))),
        }
    }

    pub fn backend(&self) -> &str {
        self.factory.backend()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get(&self) -> AlignResult<Arc<dyn SignalExtractor>> {
        let extractor = self
            .cell
            .get_or_try_init(|| async {
                info!(backend = self.factory.backend(), "Initializing detector");
                self.factory.initialize().await
            })
            .await?;
        Ok(Arc::clone(extractor))
    }
}

struct ReadyFactory(Arc<dyn SignalExtractor>);

#[async_trait]
impl ExtractorFactory for ReadyFactory {
    fn backend(&self) -> &str {
        self.0.name()
    }

    async fn initialize(&self) -> AlignResult<Arc<dyn SignalExtractor>> {
        Ok(Arc::clone(&self.0))
    }
}
