pub mod azure;
#[cfg(test)]
pub(crate) mod mock;
pub mod taints;

pub use taints::{parse_taints, Taint, TaintEffect, Toleration, TolerationOperator};

use crate::config;
use crate::dynamic::ScaleDownPolicy;
use crate::errors::Result;
use crate::options::AutoscalingOptions;
use crate::AppConfig;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InstanceState {
    Running,
    Creating,
    Deleting,
    Deallocating,
    Deallocated,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Provider ID, e.g. `azure:///subscriptions/...`.
    pub id: String,
    pub state: InstanceState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeGroupStatus {
    pub id: String,
    pub min_size: i32,
    pub max_size: i32,
    pub scale_down_policy: ScaleDownPolicy,
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<Taint>,
    pub instances: Vec<Instance>,
}

impl NodeGroupStatus {
    /// Instances that count towards the group size.
    pub fn active_size(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| {
                !matches!(
                    i.state,
                    InstanceState::Deleting
                        | InstanceState::Deallocating
                        | InstanceState::Deallocated
                )
            })
            .count()
    }

    /// Number of nodes the group can still grow by.
    pub fn head_room(&self) -> usize {
        (self.max_size.max(0) as usize).saturating_sub(self.active_size())
    }
}

#[async_trait]
pub trait CloudProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
    async fn refresh(&self) -> Result<()>;
    async fn node_groups(&self) -> Result<Vec<NodeGroupStatus>>;
}

/// Creates cloud providers for a given set of options. Called on every rebuild.
pub trait CloudProviderFactory: Send + Sync + fmt::Debug {
    fn build(&self, options: &AutoscalingOptions) -> Result<Arc<dyn CloudProvider>>;
}

pub fn build_from_config(config: AppConfig) -> anyhow::Result<Arc<dyn CloudProviderFactory>> {
    Ok(match &config.cloud_provider {
        config::CloudProvider::Azure {
            resource_group,
            vm_client,
        } => {
            let client: Arc<dyn azure::ScaleSetVmClient> = match vm_client {
                config::VmClient::File { path } => Arc::new(azure::FileScaleSetVmClient::new(path)),
            };

            Arc::new(azure::AzureCloudProviderFactory::new(
                resource_group.clone(),
                client,
                config.dynamic_config.support_scale_to_zero,
            ))
        }
    })
}
