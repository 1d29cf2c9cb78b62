use crate::cloud_provider::azure::RetryError;
use crate::cloud_provider::{Instance, InstanceState};
use crate::utils::path_append;
use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::error;

pub const AZURE_PREFIX: &str = "azure://";

const POWER_STATE_DEALLOCATED: &str = "PowerState/deallocated";
const POWER_STATE_DEALLOCATING: &str = "PowerState/deallocating";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSetVm {
    pub id: String,
    #[serde(default)]
    pub provisioning_state: String,
    #[serde(default)]
    pub power_state: Option<String>,
}

impl ScaleSetVm {
    pub fn provider_id(&self) -> String {
        format!("{}{}", AZURE_PREFIX, self.id)
    }

    pub fn instance_state(&self) -> InstanceState {
        let provisioning_state = self.provisioning_state.as_str();

        if provisioning_state.eq_ignore_ascii_case("Failed") {
            return InstanceState::Failed;
        }
        if provisioning_state.eq_ignore_ascii_case("Deleting") {
            return InstanceState::Deleting;
        }
        if provisioning_state.eq_ignore_ascii_case("Creating") {
            return InstanceState::Creating;
        }

        match self.power_state.as_deref() {
            Some(POWER_STATE_DEALLOCATED) => InstanceState::Deallocated,
            Some(POWER_STATE_DEALLOCATING) => InstanceState::Deallocating,
            _ => InstanceState::Running,
        }
    }

    pub fn to_instance(&self) -> Instance {
        Instance {
            id: self.provider_id(),
            state: self.instance_state(),
        }
    }
}

/// Lists the virtual machines of a scale set.
#[async_trait]
pub trait ScaleSetVmClient: Send + Sync + fmt::Debug {
    async fn list(&self, resource_group: &str, scale_set: &str)
        -> Result<Vec<ScaleSetVm>, RetryError>;
}

#[derive(Deserialize, Debug)]
struct ScaleSetVmList {
    #[serde(default)]
    vms: Vec<ScaleSetVm>,
}

/// Serves VM lists from `<path>/<scale set>.yml`.
#[derive(Debug, Clone)]
pub struct FileScaleSetVmClient {
    path: PathBuf,
}

impl FileScaleSetVmClient {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl ScaleSetVmClient for FileScaleSetVmClient {
    #[tracing::instrument(name = "FileScaleSetVmClient::list", skip(self))]
    async fn list(
        &self,
        resource_group: &str,
        scale_set: &str,
    ) -> Result<Vec<ScaleSetVm>, RetryError> {
        let file_path = path_append(self.path.join(scale_set), ".yml");

        let content = match tokio::fs::read(&file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let body = serde_json::json!({
                    "error": {
                        "code": "ResourceNotFound",
                        "message": format!(
                            "The Resource 'Microsoft.Compute/virtualMachineScaleSets/{}' under resource group '{}' was not found.",
                            scale_set, resource_group
                        ),
                    }
                });

                return Err(RetryError::new(StatusCode::NOT_FOUND, Some(body.to_string())));
            }
            Err(e) => {
                error!(path = %file_path.display(), "Failed to read vm list: {}", e);
                return Err(RetryError::new(StatusCode::INTERNAL_SERVER_ERROR, None));
            }
        };

        serde_yaml::from_slice::<ScaleSetVmList>(&content)
            .map(|list| list.vms)
            .map_err(|e| {
                error!(path = %file_path.display(), "Failed to parse vm list: {}", e);
                RetryError::new(StatusCode::INTERNAL_SERVER_ERROR, None)
            })
    }
}
