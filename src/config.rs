use crate::options::AutoscalingOptions;
use crate::processors::provreq::DEFAULT_MAX_EVENTS;
use crate::AppConfig;
use anyhow::Context;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Deserialize, Debug)]
pub struct Config {
    pub dynamic_config: DynamicConfig,
    #[serde(default)]
    pub autoscaling: AutoscalingOptions,
    pub cloud_provider: CloudProvider,
    #[serde(default)]
    pub pods: Pods,
    #[serde(default = "default_max_provisioning_request_events")]
    pub max_provisioning_request_events: usize,
}

fn default_max_provisioning_request_events() -> usize {
    DEFAULT_MAX_EVENTS
}

#[derive(Deserialize, Debug, Clone)]
pub struct DynamicConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub support_scale_to_zero: bool,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CloudProvider {
    Azure {
        resource_group: String,
        vm_client: VmClient,
    },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VmClient {
    File { path: PathBuf },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Pods {
    None,
    File { path: PathBuf },
}

impl Default for Pods {
    fn default() -> Self {
        Pods::None
    }
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    let config_path = get_config_path()?;
    let file = File::open(&config_path)
        .with_context(|| format!("Failed to open config file {}", &config_path))?;

    let config = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config file {}", &config_path))?;

    Ok(Arc::new(config))
}

fn get_config_path() -> anyhow::Result<String> {
    use std::env;
    use tracing::info;

    env::var("APP_CONFIG").or_else(|e| {
        info!(
            error = format!("{:?}", e).as_str(),
            "Missing or invalid APP_CONFIG env var, fallback to config.yml"
        );
        Ok("config.yml".to_string())
    })
}
