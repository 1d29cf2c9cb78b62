use crate::cloud_provider::{parse_taints, CloudProvider, CloudProviderFactory, NodeGroupStatus};
use crate::dynamic::NodeGroupSpec;
use crate::errors::{AutoscalerError, Result};
use crate::options::AutoscalingOptions;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Serves node groups straight from the options it was built with.
#[derive(Debug)]
pub struct MockCloudProvider {
    node_groups: Vec<NodeGroupStatus>,
}

#[async_trait]
impl CloudProvider for MockCloudProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    async fn node_groups(&self) -> Result<Vec<NodeGroupStatus>> {
        Ok(self.node_groups.clone())
    }
}

/// Records every set of options it is asked to build with and fails on demand.
#[derive(Debug, Default)]
pub struct MockCloudProviderFactory {
    fail: AtomicBool,
    builds: Mutex<Vec<AutoscalingOptions>>,
}

impl MockCloudProviderFactory {
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn builds(&self) -> Vec<AutoscalingOptions> {
        self.builds.lock().unwrap().clone()
    }

    pub fn last_build(&self) -> Option<AutoscalingOptions> {
        self.builds.lock().unwrap().last().cloned()
    }
}

impl CloudProviderFactory for MockCloudProviderFactory {
    fn build(&self, options: &AutoscalingOptions) -> Result<Arc<dyn CloudProvider>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AutoscalerError::cloud_provider(
                "Unknown",
                "mock cloud provider unavailable",
            ));
        }

        self.builds.lock().unwrap().push(options.clone());

        let node_groups = options
            .node_groups
            .iter()
            .map(|value| {
                let spec = NodeGroupSpec::parse(value, true)
                    .map_err(|e| AutoscalerError::configuration(e.to_string()))?;

                Ok(NodeGroupStatus {
                    id: spec.name.clone(),
                    min_size: spec.min_size,
                    max_size: spec.max_size,
                    scale_down_policy: spec.effective_scale_down_policy(),
                    taints: parse_taints(&spec.taints),
                    labels: spec.labels,
                    instances: vec![],
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Arc::new(MockCloudProvider { node_groups }))
    }
}
