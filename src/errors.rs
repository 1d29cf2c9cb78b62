/// Failure raised while constructing or running autoscaler components.
#[derive(thiserror::Error, Debug)]
pub enum AutoscalerError {
    #[error("cloud provider error ({reason}): {message}")]
    CloudProvider { reason: String, message: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AutoscalerError {
    pub fn cloud_provider(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CloudProvider {
            reason: reason.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AutoscalerError>;
