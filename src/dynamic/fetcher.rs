use crate::dynamic::{Config, Error};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ConfigFetcherOptions {
    pub config_path: PathBuf,
    pub support_scale_to_zero: bool,
}

/// Re-reads the dynamic config file on demand and reports it only when its
/// content differs from the last accepted one.
#[derive(Debug)]
pub struct ConfigFetcher {
    path: PathBuf,
    support_scale_to_zero: bool,
    previous_configuration: Config,
}

impl ConfigFetcher {
    pub fn new(options: ConfigFetcherOptions) -> Self {
        Self {
            path: options.config_path,
            support_scale_to_zero: options.support_scale_to_zero,
            previous_configuration: Config::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[tracing::instrument(
        name = "ConfigFetcher::fetch_config_if_updated",
        skip(self),
        fields(path = %self.path.display())
    )]
    pub async fn fetch_config_if_updated(&mut self) -> Result<Option<Config>, Error> {
        let content = tokio::fs::read(&self.path)
            .await
            .map_err(|source| Error::Io {
                path: self.path.clone(),
                source,
            })?;
        let config = Config::build(&content, self.support_scale_to_zero)?;

        if config == self.previous_configuration {
            debug!("Config matches previous one - no need to update");
            return Ok(None);
        }

        self.previous_configuration = config.clone();

        Ok(Some(config))
    }
}
