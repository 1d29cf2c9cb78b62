use crate::autoscaler::Autoscaler;
use crate::cloud_provider::{CloudProvider, NodeGroupStatus};
use crate::errors::{AutoscalerError, Result};
use crate::expander::{ExpansionOption, Strategy};
use crate::options::AutoscalingOptions;
use crate::pods::{Pod, PodLister};
use crate::processors::PodListProcessor;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use strum_macros::Display;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum Lifecycle {
    Created,
    Started,
    Stopped,
}

/// Autoscaler for a fixed set of options and collaborators.
#[derive(Debug)]
pub struct StaticAutoscaler {
    options: AutoscalingOptions,
    cloud_provider: Arc<dyn CloudProvider>,
    expander: Arc<Strategy>,
    pod_lister: Arc<dyn PodLister>,
    pod_list_processor: Box<dyn PodListProcessor>,
    lifecycle: Lifecycle,
    last_scale_up: Option<ExpansionOption>,
    last_run: Option<DateTime<Utc>>,
}

impl StaticAutoscaler {
    pub fn new(
        options: AutoscalingOptions,
        cloud_provider: Arc<dyn CloudProvider>,
        expander: Arc<Strategy>,
        pod_lister: Arc<dyn PodLister>,
        pod_list_processor: Box<dyn PodListProcessor>,
    ) -> Self {
        Self {
            options,
            cloud_provider,
            expander,
            pod_lister,
            pod_list_processor,
            lifecycle: Lifecycle::Created,
            last_scale_up: None,
            last_run: None,
        }
    }

    pub fn options(&self) -> &AutoscalingOptions {
        &self.options
    }

    /// Scale-up picked by the most recent iteration.
    pub fn last_scale_up(&self) -> Option<&ExpansionOption> {
        self.last_scale_up.as_ref()
    }

    /// Start time of the most recent iteration that reached the cloud provider.
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }
}

/// One new node per pod; pods only fit groups carrying all their selected labels
/// and whose hard taints they tolerate. Waste is the share of fitting pods the group has no room for.
fn expansion_option(node_group: &NodeGroupStatus, pods: &[Pod]) -> Option<ExpansionOption> {
    let head_room = node_group.head_room();
    let fitting = pods
        .iter()
        .filter(|pod| pod.fits(&node_group.labels, &node_group.taints))
        .count();

    if head_room == 0 || fitting == 0 {
        return None;
    }

    let node_count = fitting.min(head_room);

    Some(ExpansionOption {
        node_group: node_group.id.clone(),
        node_count,
        pod_count: node_count,
        waste: 1.0 - node_count as f64 / fitting as f64,
    })
}

#[async_trait]
impl Autoscaler for StaticAutoscaler {
    fn start(&mut self) -> Result<()> {
        if self.lifecycle == Lifecycle::Stopped {
            return Err(AutoscalerError::Internal(anyhow!(
                "autoscaler can not be started after cleanup"
            )));
        }

        info!(
            cloud_provider = self.cloud_provider.name(),
            expanders = ?self.expander.names(),
            node_groups = self.options.node_groups.len(),
            "Started autoscaler"
        );
        self.lifecycle = Lifecycle::Started;

        Ok(())
    }

    #[tracing::instrument(name = "StaticAutoscaler::run_once", skip(self))]
    async fn run_once(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.lifecycle != Lifecycle::Started {
            return Err(AutoscalerError::Internal(anyhow!(
                "autoscaler is {}, not running",
                self.lifecycle
            )));
        }

        if let Some(last_run) = self.last_run {
            debug!(since_last_run = %(now - last_run), "Running iteration");
        }
        self.last_run = Some(now);

        self.cloud_provider.refresh().await?;
        let node_groups = self.cloud_provider.node_groups().await?;

        let pods = self.pod_lister.unschedulable_pods().await?;
        let pods = self.pod_list_processor.process(pods);

        if pods.is_empty() {
            debug!("No unschedulable pods");
            self.last_scale_up = None;
            return Ok(());
        }

        let options = node_groups
            .iter()
            .filter_map(|node_group| expansion_option(node_group, &pods))
            .collect::<Vec<_>>();

        self.last_scale_up = self.expander.best_option(options);

        match &self.last_scale_up {
            Some(best) => info!(
                node_group = best.node_group.as_str(),
                node_count = best.node_count,
                pod_count = best.pod_count,
                "Selected node group for scale-up"
            ),
            None => info!(
                unschedulable_pods = pods.len(),
                "No node group can fit the unschedulable pods"
            ),
        }

        Ok(())
    }

    fn exit_cleanup(&mut self) {
        info!("Cleaning up autoscaler");

        self.lifecycle = Lifecycle::Stopped;
        self.last_scale_up = None;
    }
}
