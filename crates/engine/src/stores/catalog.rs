//! Current configuration snapshot.
//!
//! Readers clone the `Arc` and keep it for as long as they need; a reload
//! swaps the pointer, so an encounter mid-stage never sees a half-loaded
//! catalog.

use std::sync::Arc;

use tokio::sync::RwLock;

use cometwave_domain::CometSettings;

use crate::infrastructure::ports::ConfigSource;

/// Summary of a reload, mostly for logging and operator feedback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    pub theme_count: usize,
    pub warnings: usize,
    /// The source failed and built-in defaults were installed instead.
    pub used_defaults: bool,
}

pub struct CatalogStore {
    current: RwLock<Arc<CometSettings>>,
    source: Arc<dyn ConfigSource>,
}

impl CatalogStore {
    /// Starts with built-in defaults until the first `reload`.
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self {
            current: RwLock::new(Arc::new(CometSettings::default())),
            source,
        }
    }

    pub async fn snapshot(&self) -> Arc<CometSettings> {
        self.current.read().await.clone()
    }

    /// Load from the source and atomically replace the snapshot.
    ///
    /// Configuration problems never propagate: a failing source installs
    /// the built-in defaults and theme problems are logged as warnings.
    pub async fn reload(&self) -> ReloadReport {
        let (settings, used_defaults) = match self.source.load() {
            Ok(settings) => (settings, false),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load comet config, using built-in defaults");
                (CometSettings::default(), true)
            }
        };

        let problems = settings.catalog.validate();
        for (theme_id, messages) in &problems {
            for message in messages {
                tracing::warn!(theme_id = %theme_id, problem = %message, "Theme validation warning");
            }
        }

        let report = ReloadReport {
            theme_count: settings.catalog.len(),
            warnings: problems.iter().map(|(_, m)| m.len()).sum(),
            used_defaults,
        };
        self.replace(settings).await;

        tracing::info!(
            themes = report.theme_count,
            warnings = report.warnings,
            used_defaults = report.used_defaults,
            "Comet config loaded"
        );
        report
    }

    pub async fn replace(&self, settings: CometSettings) {
        *self.current.write().await = Arc::new(settings);
    }
}
