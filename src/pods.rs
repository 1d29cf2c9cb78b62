use crate::cloud_provider::{Taint, Toleration};
use crate::config;
use crate::errors::Result;
use crate::AppConfig;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strum_macros::Display;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Pod {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default)]
    pub tolerations: Vec<Toleration>,
}

fn default_namespace() -> String {
    "default".into()
}

impl Pod {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            annotations: Default::default(),
            node_selector: Default::default(),
            tolerations: vec![],
        }
    }

    /// A pod fits a node group when the group carries every label the pod selects on
    /// and the pod tolerates each of its `NoSchedule` and `NoExecute` taints.
    pub fn fits(&self, labels: &BTreeMap<String, String>, taints: &[Taint]) -> bool {
        self.node_selector
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
            && taints
                .iter()
                .filter(|taint| taint.effect.is_hard())
                .all(|taint| self.tolerations.iter().any(|t| t.tolerates(taint)))
    }
}

impl fmt::Display for Pod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[async_trait]
pub trait PodLister: Send + Sync + fmt::Debug {
    async fn unschedulable_pods(&self) -> Result<Vec<Pod>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPodLister;

#[async_trait]
impl PodLister for NoPodLister {
    async fn unschedulable_pods(&self) -> Result<Vec<Pod>> {
        Ok(vec![])
    }
}

#[derive(Deserialize, Debug)]
struct PodList {
    #[serde(default)]
    pods: Vec<Pod>,
}

/// Reads the unschedulable pods from a YAML file on every call.
#[derive(Debug, Clone)]
pub struct FilePodLister {
    path: PathBuf,
}

impl FilePodLister {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl PodLister for FilePodLister {
    #[tracing::instrument(name = "FilePodLister::unschedulable_pods", skip(self))]
    async fn unschedulable_pods(&self) -> Result<Vec<Pod>> {
        let content = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read pod list {}", self.path.display()))?;

        let list: PodList = serde_yaml::from_slice(&content)
            .with_context(|| format!("Failed to parse pod list {}", self.path.display()))?;

        Ok(list.pods)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EventType {
    Normal,
    Warning,
}

/// Publishes events about pods.
pub trait EventRecorder: Send + Sync + fmt::Debug {
    fn event(&self, pod: &Pod, event_type: EventType, reason: &str, message: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventRecorder;

impl EventRecorder for LoggingEventRecorder {
    fn event(&self, pod: &Pod, event_type: EventType, reason: &str, message: &str) {
        info!(pod = %pod, %event_type, reason, "{}", message);
    }
}

pub fn build_from_config(config: AppConfig) -> Arc<dyn PodLister> {
    match &config.pods {
        config::Pods::None => Arc::new(NoPodLister),
        config::Pods::File { path } => Arc::new(FilePodLister::new(path)),
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Keeps events as `<type> <reason> <message>` strings.
    #[derive(Debug, Default)]
    pub struct RecordingEventRecorder {
        events: Mutex<Vec<String>>,
    }

    impl RecordingEventRecorder {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventRecorder for RecordingEventRecorder {
        fn event(&self, _pod: &Pod, event_type: EventType, reason: &str, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{} {} {}", event_type, reason, message));
        }
    }
}
