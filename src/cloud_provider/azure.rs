mod error;
mod instance_cache;
mod scale_set;
mod vm_client;

pub use error::RetryError;
pub use instance_cache::InstanceCache;
pub use scale_set::ScaleSet;
pub use vm_client::{FileScaleSetVmClient, ScaleSetVm, ScaleSetVmClient, AZURE_PREFIX};

use crate::cloud_provider::{CloudProvider, CloudProviderFactory, NodeGroupStatus};
use crate::dynamic::NodeGroupSpec;
use crate::errors::{AutoscalerError, Result};
use crate::options::AutoscalingOptions;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

pub const PROVIDER_NAME: &str = "azure";

#[derive(Debug)]
pub struct AzureCloudProvider {
    scale_sets: Vec<ScaleSet>,
}

impl AzureCloudProvider {
    pub fn scale_sets(&self) -> &[ScaleSet] {
        &self.scale_sets
    }
}

#[async_trait]
impl CloudProvider for AzureCloudProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    #[tracing::instrument(name = "AzureCloudProvider::refresh", skip(self))]
    async fn refresh(&self) -> Result<()> {
        try_join_all(
            self.scale_sets
                .iter()
                .map(|scale_set| scale_set.instance_cache().validate()),
        )
        .await?;

        Ok(())
    }

    async fn node_groups(&self) -> Result<Vec<NodeGroupStatus>> {
        try_join_all(self.scale_sets.iter().map(|scale_set| scale_set.status())).await
    }
}

/// Creates an [`AzureCloudProvider`] with one scale set per node group option.
#[derive(Debug)]
pub struct AzureCloudProviderFactory {
    resource_group: String,
    client: Arc<dyn ScaleSetVmClient>,
    support_scale_to_zero: bool,
}

impl AzureCloudProviderFactory {
    pub fn new(
        resource_group: impl Into<String>,
        client: Arc<dyn ScaleSetVmClient>,
        support_scale_to_zero: bool,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            client,
            support_scale_to_zero,
        }
    }
}

impl CloudProviderFactory for AzureCloudProviderFactory {
    #[tracing::instrument(name = "AzureCloudProviderFactory::build", skip(self, options))]
    fn build(&self, options: &AutoscalingOptions) -> Result<Arc<dyn CloudProvider>> {
        if options.cloud_provider_name != PROVIDER_NAME {
            return Err(AutoscalerError::configuration(format!(
                "cloud provider {} is not supported",
                options.cloud_provider_name
            )));
        }

        let mut names = HashSet::new();
        let mut scale_sets = Vec::with_capacity(options.node_groups.len());

        for value in &options.node_groups {
            let spec = NodeGroupSpec::parse(value, self.support_scale_to_zero)
                .map_err(|e| AutoscalerError::configuration(e.to_string()))?;

            if !names.insert(spec.name.clone()) {
                return Err(AutoscalerError::configuration(format!(
                    "node group {} is specified more than once",
                    spec.name
                )));
            }

            scale_sets.push(ScaleSet::new(
                spec,
                &self.resource_group,
                options.vmss_instances_refresh_period,
                Arc::clone(&self.client),
            ));
        }

        info!(
            resource_group = %self.resource_group,
            scale_sets = scale_sets.len(),
            "Built azure cloud provider"
        );

        Ok(Arc::new(AzureCloudProvider { scale_sets }))
    }
}
