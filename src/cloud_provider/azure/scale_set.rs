use crate::cloud_provider::azure::{InstanceCache, ScaleSetVmClient};
use crate::cloud_provider::{parse_taints, NodeGroupStatus, Taint};
use crate::dynamic::{NodeGroupSpec, ScaleDownPolicy};
use crate::errors::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A node group backed by a virtual machine scale set.
#[derive(Debug)]
pub struct ScaleSet {
    spec: NodeGroupSpec,
    taints: Vec<Taint>,
    instance_cache: InstanceCache,
}

impl ScaleSet {
    pub fn new(
        spec: NodeGroupSpec,
        resource_group: &str,
        refresh_period: Duration,
        client: Arc<dyn ScaleSetVmClient>,
    ) -> Self {
        Self {
            taints: parse_taints(&spec.taints),
            instance_cache: InstanceCache::new(resource_group, &spec.name, refresh_period, client),
            spec,
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.name
    }

    pub fn min_size(&self) -> i32 {
        self.spec.min_size
    }

    pub fn max_size(&self) -> i32 {
        self.spec.max_size
    }

    pub fn scale_down_policy(&self) -> ScaleDownPolicy {
        self.spec.effective_scale_down_policy()
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.spec.labels
    }

    pub fn taints(&self) -> &[Taint] {
        &self.taints
    }

    pub fn instance_cache(&self) -> &InstanceCache {
        &self.instance_cache
    }

    pub async fn status(&self) -> Result<NodeGroupStatus> {
        Ok(NodeGroupStatus {
            id: self.id().to_owned(),
            min_size: self.min_size(),
            max_size: self.max_size(),
            scale_down_policy: self.scale_down_policy(),
            labels: self.labels().clone(),
            taints: self.taints.clone(),
            instances: self.instance_cache.instances().await?,
        })
    }
}
