use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::core::VoicePipeline;

/// Process-wide state handed to every request and realtime session.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Shared outbound client, owned for the lifetime of the process
    pub http_client: reqwest::Client,
    pub pipeline: Arc<VoicePipeline>,
}

impl AppState {
    /// Build the shared HTTP client and the production adapters.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()?;

        let pipeline = VoicePipeline::from_config(&config, http_client.clone());
        info!(
            timeout_secs = config.http_timeout_seconds,
            max_upload_mb = config.max_upload_mb,
            "Application state initialized"
        );

        Ok(Self::with_pipeline(config, http_client, pipeline))
    }

    /// Assemble state around an existing pipeline.
    pub fn with_pipeline(
        config: ServerConfig,
        http_client: reqwest::Client,
        pipeline: VoicePipeline,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            http_client,
            pipeline: Arc::new(pipeline),
        })
    }
}
