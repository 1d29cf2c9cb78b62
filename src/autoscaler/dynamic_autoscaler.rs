use crate::autoscaler::{Autoscaler, AutoscalerBuilder};
use crate::dynamic::{Config, ConfigFetcher};
use crate::errors::{AutoscalerError, Result};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use strum_macros::Display;
use tracing::{error, info};

/// Where the reload cycle stands.
///
/// `Draining` covers the window between cleaning up the old autoscaler and
/// a successful rebuild. `Failed` means the held autoscaler is already cleaned
/// up and every tick retries the build with the stored config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ReloadState {
    Running,
    Draining,
    Failed,
}

#[derive(thiserror::Error, Debug)]
pub enum TickError {
    #[error("failed to rebuild autoscaler: {0}")]
    Rebuild(#[source] AutoscalerError),
    #[error("failed to start autoscaler: {0}")]
    Start(#[source] AutoscalerError),
    #[error("autoscaler iteration failed: {0}")]
    Iteration(#[source] AutoscalerError),
}

impl TickError {
    /// A rebuilt autoscaler that fails to start can not be recovered.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TickError::Start(_))
    }
}

/// Wraps an autoscaler and swaps it out whenever the dynamic config changes.
#[derive(Debug)]
pub struct DynamicAutoscaler {
    autoscaler: Box<dyn Autoscaler>,
    builder: AutoscalerBuilder,
    fetcher: ConfigFetcher,
    state: ReloadState,
}

impl DynamicAutoscaler {
    pub fn new(mut builder: AutoscalerBuilder, fetcher: ConfigFetcher) -> Result<Self> {
        let autoscaler = builder.build()?;

        Ok(Self {
            autoscaler,
            builder,
            fetcher,
            state: ReloadState::Running,
        })
    }

    pub fn state(&self) -> ReloadState {
        self.state
    }

    pub fn builder(&self) -> &AutoscalerBuilder {
        &self.builder
    }

    /// Scan interval of the autoscaler built last.
    pub fn scan_interval(&self) -> Duration {
        self.builder.options().scan_interval
    }

    pub fn start(&mut self) -> Result<()> {
        self.autoscaler.start()
    }

    pub fn exit_cleanup(&mut self) {
        self.autoscaler.exit_cleanup()
    }

    /// Rebuilds the autoscaler if the dynamic config changed since the last call.
    ///
    /// Fetch errors are logged and leave the current autoscaler in place.
    pub async fn reconfigure(&mut self) -> std::result::Result<(), TickError> {
        let config = match self.fetcher.fetch_config_if_updated().await {
            Ok(config) => config,
            Err(e) => {
                error!(path = %self.fetcher.path().display(), "Failed to fetch dynamic config: {}", e);
                None
            }
        };

        if let Some(config) = config {
            self.drain(config);
        }

        self.rebuild()
    }

    /// Cleans up the running autoscaler and stores `config` for the next rebuild.
    pub fn drain(&mut self, config: Config) {
        info!(
            node_groups = config.node_groups.len(),
            from = %self.state,
            "Dynamic config changed, draining autoscaler"
        );

        if self.state == ReloadState::Running {
            self.autoscaler.exit_cleanup();
        }
        self.state = ReloadState::Draining;
        self.builder.set_dynamic_config(config);
    }

    /// Builds and starts a replacement from the stored config. No-op while running.
    pub fn rebuild(&mut self) -> std::result::Result<(), TickError> {
        if self.state == ReloadState::Running {
            return Ok(());
        }

        match self.builder.build() {
            Ok(autoscaler) => {
                self.autoscaler = autoscaler;
                self.state = ReloadState::Running;
            }
            Err(e) => {
                self.state = ReloadState::Failed;
                return Err(TickError::Rebuild(e));
            }
        }

        self.autoscaler.start().map_err(TickError::Start)
    }

    #[tracing::instrument(name = "DynamicAutoscaler::run_once", skip(self))]
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> std::result::Result<(), TickError> {
        let reconfigure_start = Instant::now();
        let reconfigured = self.reconfigure().await;

        info!(
            duration = ?reconfigure_start.elapsed(),
            state = %self.state,
            "Reconfigure finished"
        );
        reconfigured?;

        self.autoscaler
            .run_once(now)
            .await
            .map_err(TickError::Iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud_provider::mock::MockCloudProviderFactory;
    use crate::autoscaler::BuilderState;
    use crate::dynamic::ConfigFetcherOptions;
    use crate::options::AutoscalingOptions;
    use crate::pods::recording::RecordingEventRecorder;
    use crate::pods::NoPodLister;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    const CONFIG_A: &str = "nodeGroups:\n  - {name: pool-a, minSize: 1, maxSize: 10}\nautoScalerProfile:\n  scan-interval: 30s\n";
    const CONFIG_B: &str = "nodeGroups:\n  - {name: pool-a, minSize: 1, maxSize: 20}\n";

    fn dynamic_autoscaler(
        dir: &TempDir,
        factory: &Arc<MockCloudProviderFactory>,
    ) -> Result<DynamicAutoscaler> {
        let builder = AutoscalerBuilder::new(
            AutoscalingOptions::default(),
            factory.clone(),
            Arc::new(NoPodLister),
            Arc::new(RecordingEventRecorder::default()),
            50,
        )?;
        let fetcher = ConfigFetcher::new(ConfigFetcherOptions {
            config_path: config_path(dir),
            support_scale_to_zero: false,
        });

        let mut autoscaler = DynamicAutoscaler::new(builder, fetcher)?;
        autoscaler.start()?;

        Ok(autoscaler)
    }

    fn config_path(dir: &TempDir) -> PathBuf {
        dir.path().join("config.yaml")
    }

    fn write_config(dir: &TempDir, content: &str) {
        fs::write(config_path(dir), content).expect("write config");
    }

    fn fetcher_dir() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    #[tokio::test]
    async fn test_reloads_changed_config_once() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = fetcher_dir();
        let factory = Arc::new(MockCloudProviderFactory::default());
        let mut autoscaler = dynamic_autoscaler(&dir, &factory)?;
        assert_eq!(1, factory.builds().len());
        assert_eq!(BuilderState::Unconfigured, autoscaler.builder().state());

        write_config(&dir, CONFIG_A);
        autoscaler.run_once(Utc::now()).await?;

        assert_eq!(ReloadState::Running, autoscaler.state());
        assert_eq!(BuilderState::Configured, autoscaler.builder().state());
        assert_eq!(2, factory.builds().len());
        assert_eq!(Duration::from_secs(30), autoscaler.scan_interval());

        autoscaler.run_once(Utc::now()).await?;
        assert_eq!(2, factory.builds().len());

        write_config(&dir, CONFIG_B);
        autoscaler.run_once(Utc::now()).await?;
        assert_eq!(3, factory.builds().len());
        assert_eq!(
            vec!["1:20:Delete:pool-a:{}|".to_owned()],
            factory.last_build().map(|o| o.node_groups).unwrap_or_default()
        );
        assert_eq!(AutoscalingOptions::default().scan_interval, autoscaler.scan_interval());

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_errors_keep_current_autoscaler() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = fetcher_dir();
        let factory = Arc::new(MockCloudProviderFactory::default());
        let mut autoscaler = dynamic_autoscaler(&dir, &factory)?;

        // no config file yet
        autoscaler.run_once(Utc::now()).await?;

        write_config(&dir, "nodeGroups: [{name: pool-a, minSize: 5, maxSize: 1}]");
        autoscaler.run_once(Utc::now()).await?;

        assert_eq!(ReloadState::Running, autoscaler.state());
        assert_eq!(1, factory.builds().len());

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_rebuild_is_retried() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = fetcher_dir();
        let factory = Arc::new(MockCloudProviderFactory::default());
        let mut autoscaler = dynamic_autoscaler(&dir, &factory)?;

        factory.set_fail(true);
        write_config(&dir, CONFIG_A);

        let err = autoscaler.run_once(Utc::now()).await.unwrap_err();
        assert!(matches!(err, TickError::Rebuild(_)));
        assert!(!err.is_fatal());
        assert_eq!(ReloadState::Failed, autoscaler.state());

        // config unchanged, the stored one is built again
        assert!(autoscaler.run_once(Utc::now()).await.is_err());
        assert_eq!(ReloadState::Failed, autoscaler.state());

        factory.set_fail(false);
        autoscaler.run_once(Utc::now()).await?;
        assert_eq!(ReloadState::Running, autoscaler.state());
        assert_eq!(
            vec!["1:10:Delete:pool-a:{}|".to_owned()],
            factory.last_build().map(|o| o.node_groups).unwrap_or_default()
        );
        assert_eq!(Duration::from_secs(30), autoscaler.scan_interval());

        Ok(())
    }

    #[tokio::test]
    async fn test_draining_until_rebuilt() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = fetcher_dir();
        let factory = Arc::new(MockCloudProviderFactory::default());
        let mut autoscaler = dynamic_autoscaler(&dir, &factory)?;

        autoscaler.drain(Config::build(CONFIG_A.as_bytes(), false)?);
        assert_eq!(ReloadState::Draining, autoscaler.state());
        assert_eq!(BuilderState::Configured, autoscaler.builder().state());
        assert_eq!(1, factory.builds().len());
        // the drained autoscaler is cleaned up and refuses to run
        assert!(autoscaler.autoscaler.run_once(Utc::now()).await.is_err());

        factory.set_fail(true);
        assert!(autoscaler.rebuild().is_err());
        assert_eq!(ReloadState::Failed, autoscaler.state());

        autoscaler.drain(Config::build(CONFIG_B.as_bytes(), false)?);
        assert_eq!(ReloadState::Draining, autoscaler.state());

        factory.set_fail(false);
        autoscaler.rebuild()?;
        assert_eq!(ReloadState::Running, autoscaler.state());
        assert_eq!(
            vec!["1:20:Delete:pool-a:{}|".to_owned()],
            factory.last_build().map(|o| o.node_groups).unwrap_or_default()
        );

        // running: nothing to rebuild
        autoscaler.rebuild()?;
        assert_eq!(2, factory.builds().len());

        Ok(())
    }

    #[test]
    fn test_only_start_errors_are_fatal() {
        let error = || AutoscalerError::configuration("boom");

        assert!(TickError::Start(error()).is_fatal());
        assert!(!TickError::Rebuild(error()).is_fatal());
        assert!(!TickError::Iteration(error()).is_fatal());
    }
}
