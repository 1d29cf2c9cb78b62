use crate::pods::{EventRecorder, EventType, Pod};
use crate::processors::PodListProcessor;
use std::sync::Arc;
use tracing::debug;

pub const PROVISIONING_REQUEST_POD_ANNOTATION_KEY: &str =
    "cluster-autoscaler.kubernetes.io/consume-provisioning-request";
pub const DEFAULT_MAX_EVENTS: usize = 50;

const EVENT_REASON: &str = "ProvisioningRequestConsumer";

/// Caps the number of events emitted per processing round.
#[derive(Debug)]
pub struct EventManager {
    limit: usize,
    logged_events: usize,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS)
    }
}

impl EventManager {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            logged_events: 0,
        }
    }

    pub fn logged_events(&self) -> usize {
        self.logged_events
    }

    fn log_ignored_in_scale_up_event(
        &mut self,
        recorder: &dyn EventRecorder,
        pod: &Pod,
        provisioning_request: &str,
    ) {
        if self.logged_events >= self.limit {
            return;
        }

        let message = format!(
            "Unschedulable pod didn't trigger scale-up, because it's consuming ProvisioningRequest {}/{}",
            pod.namespace, provisioning_request
        );
        recorder.event(pod, EventType::Normal, EVENT_REASON, &message);

        self.logged_events += 1;
    }

    fn reset(&mut self) {
        self.logged_events = 0;
    }
}

/// Drops pods that wait on a provisioning request; they must not trigger a regular scale-up.
#[derive(Debug)]
pub struct ProvisioningRequestPodsFilter {
    event_manager: EventManager,
    event_recorder: Arc<dyn EventRecorder>,
}

impl ProvisioningRequestPodsFilter {
    pub fn new(event_manager: EventManager, event_recorder: Arc<dyn EventRecorder>) -> Self {
        Self {
            event_manager,
            event_recorder,
        }
    }

    pub fn event_manager(&self) -> &EventManager {
        &self.event_manager
    }
}

impl PodListProcessor for ProvisioningRequestPodsFilter {
    fn process(&mut self, unschedulable_pods: Vec<Pod>) -> Vec<Pod> {
        self.event_manager.reset();

        let mut pods = Vec::with_capacity(unschedulable_pods.len());

        for pod in unschedulable_pods {
            match pod.annotations.get(PROVISIONING_REQUEST_POD_ANNOTATION_KEY) {
                Some(provisioning_request) => {
                    debug!(pod = %pod, %provisioning_request, "Ignoring provisioning request consumer");

                    self.event_manager.log_ignored_in_scale_up_event(
                        self.event_recorder.as_ref(),
                        &pod,
                        provisioning_request,
                    );
                }
                None => pods.push(pod),
            }
        }

        pods
    }
}
