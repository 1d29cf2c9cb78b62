use crate::dynamic::{null_as_default, DecodeError, Error, NodeGroupSpec, ValidationError};
use serde::Deserialize;
use tracing::debug;

/// Runtime-overridable tunables, kept in their string form until merged into
/// [`crate::options::AutoscalingOptions`]. An empty string means "not set".
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AutoScalerProfile {
    pub scan_interval: String,
    pub scale_down_delay_after_add: String,
    pub scale_down_delay_after_delete: String,
    pub scale_down_delay_after_failure: String,
    pub scale_down_unneeded_time: String,
    pub scale_down_unready_time: String,
    pub scale_down_utilization_threshold: String,
    pub max_graceful_termination_sec: String,
    pub balance_similar_node_groups: String,
    pub expander: String,
    pub new_pod_scale_up_delay: String,
    pub max_empty_bulk_delete: String,
    pub skip_nodes_with_local_storage: String,
    pub skip_nodes_with_system_pods: String,
    pub max_cloud_provider_node_deletion_time: String,
    pub max_node_provision_time: String,
    pub enable_get_vmss: String,
    pub get_vmss_size_refresh_period: String,
    pub enable_force_delete: String,
    pub enable_detailed_cse_message: String,
    pub enable_dynamic_instance_list: String,
    pub min_cpu: String,
    pub max_cpu: String,
    pub min_memory: String,
    pub max_memory: String,
    pub ok_total_unready_count: String,
    pub max_total_unready_percentage: String,
    pub daemonset_eviction_for_empty_nodes: String,
    pub daemonset_eviction_for_occupied_nodes: String,
    pub enable_qos_logging: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, deserialize_with = "null_as_default")]
    pub node_groups: Vec<NodeGroupSpec>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub auto_scaler_profile: AutoScalerProfile,
}

impl Config {
    /// Decodes and validates a YAML or JSON document.
    pub fn build(content: &[u8], support_scale_to_zero: bool) -> Result<Self, Error> {
        let mut config = Self::decode(content)?;

        for node_group in config.node_groups.iter_mut() {
            node_group.support_scale_to_zero = support_scale_to_zero;
        }

        debug!(
            node_groups = ?config.node_groups,
            auto_scaler_profile = ?config.auto_scaler_profile,
            "Decoded dynamic config"
        );

        config.validate()?;

        Ok(config)
    }

    pub fn decode(content: &[u8]) -> Result<Self, DecodeError> {
        let looks_like_json = content
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .map_or(false, |b| *b == b'{');

        Ok(if looks_like_json {
            serde_json::from_slice(content)?
        } else {
            serde_yaml::from_slice(content)?
        })
    }

    /// Stops at the first invalid node group, in input order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for node_group in &self.node_groups {
            if node_group.name.is_empty() {
                return Err(ValidationError::new("", "name must not be blank"));
            }

            node_group.validate()?;
        }

        Ok(())
    }

    pub fn node_group_spec_strings(&self) -> Vec<String> {
        self.node_groups
            .iter()
            .map(NodeGroupSpec::to_compact_string)
            .collect()
    }
}
