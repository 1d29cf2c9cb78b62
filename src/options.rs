use serde::Deserialize;
use std::time::Duration;

pub const GIB: i64 = 1024 * 1024 * 1024;

const fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// Typed operational parameters of a single autoscaler instance.
///
/// The static part is read from the application config at startup; the
/// dynamic config's profile is overlaid on top of it on every rebuild.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutoscalingOptions {
    #[serde(with = "humantime_serde")]
    pub scan_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub scale_down_delay_after_add: Duration,
    #[serde(with = "humantime_serde")]
    pub scale_down_delay_after_delete: Duration,
    #[serde(with = "humantime_serde")]
    pub scale_down_delay_after_failure: Duration,
    pub node_group_defaults: NodeGroupAutoscalingOptions,
    #[serde(with = "humantime_serde")]
    pub max_cloud_provider_node_deletion_time: Duration,
    #[serde(with = "humantime_serde")]
    pub max_node_provision_time: Duration,
    pub enable_get_vmss: bool,
    #[serde(with = "humantime_serde")]
    pub get_vmss_size_refresh_period: Duration,
    pub enable_force_delete: bool,
    pub enable_detailed_cse_message: bool,
    pub enable_dynamic_instance_list: bool,
    pub min_cores_total: i64,
    pub max_cores_total: i64,
    /// Bytes.
    pub min_memory_total: i64,
    /// Bytes.
    pub max_memory_total: i64,
    pub max_graceful_termination_sec: i32,
    pub balance_similar_node_groups: bool,
    /// Comma separated list of expander names.
    pub expander_names: String,
    #[serde(with = "humantime_serde")]
    pub new_pod_scale_up_delay: Duration,
    pub max_empty_bulk_delete: i32,
    pub max_scale_down_parallelism: i32,
    pub ok_total_unready_count: i32,
    pub max_total_unready_percentage: f64,
    pub daemonset_eviction_for_empty_nodes: bool,
    pub daemonset_eviction_for_occupied_nodes: bool,
    pub enable_qos_logging: bool,
    pub skip_nodes_with_local_storage: bool,
    pub skip_nodes_with_system_pods: bool,
    /// Compact node group specs, `<min>:<max>:<policy>:<name>:<labels>|<taints>`.
    pub node_groups: Vec<String>,
    pub cloud_provider_name: String,
    #[serde(with = "humantime_serde")]
    pub vmss_instances_refresh_period: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeGroupAutoscalingOptions {
    #[serde(with = "humantime_serde")]
    pub scale_down_unneeded_time: Duration,
    #[serde(with = "humantime_serde")]
    pub scale_down_unready_time: Duration,
    pub scale_down_utilization_threshold: f64,
}

impl Default for NodeGroupAutoscalingOptions {
    fn default() -> Self {
        Self {
            scale_down_unneeded_time: minutes(10),
            scale_down_unready_time: minutes(20),
            scale_down_utilization_threshold: 0.5,
        }
    }
}

impl Default for AutoscalingOptions {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(10),
            scale_down_delay_after_add: minutes(10),
            scale_down_delay_after_delete: Duration::from_secs(0),
            scale_down_delay_after_failure: minutes(3),
            node_group_defaults: Default::default(),
            max_cloud_provider_node_deletion_time: minutes(5),
            max_node_provision_time: minutes(15),
            enable_get_vmss: false,
            get_vmss_size_refresh_period: Duration::from_secs(0),
            enable_force_delete: false,
            enable_detailed_cse_message: false,
            enable_dynamic_instance_list: false,
            min_cores_total: 0,
            max_cores_total: 320_000,
            min_memory_total: 0,
            max_memory_total: 6_400_000 * GIB,
            max_graceful_termination_sec: 600,
            balance_similar_node_groups: false,
            expander_names: "random".into(),
            new_pod_scale_up_delay: Duration::from_secs(0),
            max_empty_bulk_delete: 10,
            max_scale_down_parallelism: 10,
            ok_total_unready_count: 3,
            max_total_unready_percentage: 45.0,
            daemonset_eviction_for_empty_nodes: false,
            daemonset_eviction_for_occupied_nodes: true,
            enable_qos_logging: false,
            skip_nodes_with_local_storage: true,
            skip_nodes_with_system_pods: true,
            node_groups: vec![],
            cloud_provider_name: "azure".into(),
            vmss_instances_refresh_period: minutes(5),
        }
    }
}

impl AutoscalingOptions {
    pub fn expander_name_list(&self) -> Vec<&str> {
        self.expander_names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let options: AutoscalingOptions = serde_yaml::from_str(
            "scan_interval: 30s\nnode_group_defaults:\n  scale_down_unneeded_time: 1m\nexpander_names: least-waste\n",
        )?;

        assert_eq!(Duration::from_secs(30), options.scan_interval);
        assert_eq!(
            Duration::from_secs(60),
            options.node_group_defaults.scale_down_unneeded_time
        );
        assert_eq!(0.5, options.node_group_defaults.scale_down_utilization_threshold);
        assert_eq!(minutes(10), options.scale_down_delay_after_add);
        assert_eq!(vec!["least-waste"], options.expander_name_list());

        Ok(())
    }

    #[test]
    fn test_expander_name_list() {
        let options = AutoscalingOptions {
            expander_names: "least-waste, most-pods,,random".into(),
            ..Default::default()
        };

        assert_eq!(
            vec!["least-waste", "most-pods", "random"],
            options.expander_name_list()
        );
    }
}
