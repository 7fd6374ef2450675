use anyhow::Result;
use log::{error, info};
use tokio::signal;

use crate::modimpl::config::{Config, Environment, LogLevel};
use crate::modimpl::healthstatus::{HealthStatus, HealthTracker};
use crate::modimpl::processor::{report_health, LoopSettings, Processor, SyntheticWorkload};

#[derive(Debug, Clone)]
pub struct App {
    pub name: String,
    pub version: String,
    pub port: u16,
    pub environment: Environment,
    log_level: LogLevel,
    settings: LoopSettings,
    health: HealthTracker,
}

impl App {
    pub fn new(config: &Config, health: HealthTracker) -> Self {
        Self {
            name: config.app_name.clone(),
            version: config.app_version.clone(),
            port: config.port,
            environment: config.environment,
            log_level: config.log_level,
            settings: LoopSettings::default(),
            health,
        }
    }

    pub fn with_settings(mut self, settings: LoopSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Current health, for whatever serves health checks.
    pub async fn health(&self) -> HealthStatus {
        self.health.snapshot().await
    }

    /// Spawns the processing and health summary tasks and returns right away.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let processor = Processor::new(SyntheticWorkload::new(), self.health.clone());
        tokio::spawn(processor.run(self.settings.tick_every));
        tokio::spawn(report_health(self.health.clone(), self.settings.summary_every));

        info!("🚀 {} v{} started successfully!", self.name, self.version);
        info!("🌍 Environment: {}", self.environment);
        info!("🚀 Port: {}", self.port);
        info!("📊 Log Level: {}", self.log_level);
    }

    /// Starts the service and blocks until Ctrl+C.
    pub async fn run(&self) -> Result<()> {
        self.start();
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return Err(e.into());
        }
        info!("⚠️  Received Ctrl+C");
        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        let health = self.health().await;
        info!(
            "🛑 Shutting down {} - Processed: {}, Errors: {}, Healthy: {}",
            self.name,
            health.processed_count,
            health.error_count,
            health.is_healthy()
        );
    }
}
