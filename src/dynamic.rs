mod config;
mod fetcher;
mod node_group_spec;

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

pub use config::{AutoScalerProfile, Config};
pub use fetcher::{ConfigFetcher, ConfigFetcherOptions};
pub use node_group_spec::{NodeGroupSpec, ParseError, ParseErrorKind, ScaleDownPolicy};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to open config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode autoscaler config: {0}")]
    Decode(#[from] DecodeError),
    #[error("error while validating config: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A node group entry that violates its size or naming constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub group_name: String,
    pub reason: String,
}

impl ValidationError {
    pub(crate) fn new(group_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.group_name.is_empty() {
            write!(f, "invalid nodeGroup: {}", self.reason)
        } else {
            write!(f, "invalid nodeGroup: {}, {}", self.group_name, self.reason)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Treats an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
