use crate::errors::AutoscalerError;
use http::StatusCode;
use serde::Deserialize;

pub const UNKNOWN: &str = "Unknown";
pub const QUOTA_EXCEEDED: &str = "QuotaExceeded";
pub const OPERATION_NOT_ALLOWED: &str = "OperationNotAllowed";

/// Failed call against the scale set API, carrying the HTTP status and the
/// raw response body if there was one.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("scale set request failed with status {http_status}")]
pub struct RetryError {
    pub http_status: StatusCode,
    pub raw: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ServiceRawError {
    error: Option<ServiceError>,
}

#[derive(Deserialize, Debug)]
struct ServiceError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl RetryError {
    pub fn new(http_status: StatusCode, raw: Option<String>) -> Self {
        Self {
            http_status,
            raw,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.http_status == StatusCode::TOO_MANY_REQUESTS
    }

    pub fn to_autoscaler_error(&self) -> AutoscalerError {
        let service_error = self
            .raw
            .as_deref()
            .and_then(|raw| serde_json::from_str::<ServiceRawError>(raw).ok())
            .and_then(|raw| raw.error);

        let service_error = match service_error {
            Some(e) => e,
            None => return AutoscalerError::cloud_provider(UNKNOWN, self.to_string()),
        };

        let reason = match service_error.code.as_str() {
            "" => UNKNOWN,
            OPERATION_NOT_ALLOWED if service_error.message.contains("Quota increase") => {
                QUOTA_EXCEEDED
            }
            code => code,
        };

        AutoscalerError::cloud_provider(reason, service_error.message)
    }
}

impl From<RetryError> for AutoscalerError {
    fn from(e: RetryError) -> Self {
        e.to_autoscaler_error()
    }
}
