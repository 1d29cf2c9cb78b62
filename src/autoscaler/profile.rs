use crate::dynamic::AutoScalerProfile;
use crate::options::{AutoscalingOptions, GIB};
use std::str::FromStr;
use std::time::Duration;

/// Result of overlaying a profile onto a set of options.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOverlay {
    pub options: AutoscalingOptions,
    /// Profile keys whose values could not be converted; the options kept their prior values.
    pub rejected: Vec<&'static str>,
}

/// Overlays every non-empty profile field onto a copy of `base`.
pub fn apply_profile(base: &AutoscalingOptions, profile: &AutoScalerProfile) -> ProfileOverlay {
    let mut o = base.clone();
    let mut overlay = Overlay::default();
    let p = profile;

    overlay.set(
        "scan-interval",
        &p.scan_interval,
        &mut o.scan_interval,
        parse_positive_duration,
    );
    overlay.set(
        "scale-down-delay-after-add",
        &p.scale_down_delay_after_add,
        &mut o.scale_down_delay_after_add,
        parse_duration,
    );
    overlay.set(
        "scale-down-delay-after-delete",
        &p.scale_down_delay_after_delete,
        &mut o.scale_down_delay_after_delete,
        parse_duration,
    );
    overlay.set(
        "scale-down-delay-after-failure",
        &p.scale_down_delay_after_failure,
        &mut o.scale_down_delay_after_failure,
        parse_duration,
    );
    overlay.set(
        "scale-down-unneeded-time",
        &p.scale_down_unneeded_time,
        &mut o.node_group_defaults.scale_down_unneeded_time,
        parse_duration,
    );
    overlay.set(
        "scale-down-unready-time",
        &p.scale_down_unready_time,
        &mut o.node_group_defaults.scale_down_unready_time,
        parse_duration,
    );
    overlay.set(
        "scale-down-utilization-threshold",
        &p.scale_down_utilization_threshold,
        &mut o.node_group_defaults.scale_down_utilization_threshold,
        parse_number,
    );
    overlay.set(
        "max-cloud-provider-node-deletion-time",
        &p.max_cloud_provider_node_deletion_time,
        &mut o.max_cloud_provider_node_deletion_time,
        parse_duration,
    );
    overlay.set(
        "max-node-provision-time",
        &p.max_node_provision_time,
        &mut o.max_node_provision_time,
        parse_duration,
    );
    overlay.set("enable-get-vmss", &p.enable_get_vmss, &mut o.enable_get_vmss, parse_bool);
    overlay.set(
        "get-vmss-size-refresh-period",
        &p.get_vmss_size_refresh_period,
        &mut o.get_vmss_size_refresh_period,
        parse_duration,
    );
    overlay.set(
        "enable-force-delete",
        &p.enable_force_delete,
        &mut o.enable_force_delete,
        parse_bool,
    );
    overlay.set(
        "enable-detailed-cse-message",
        &p.enable_detailed_cse_message,
        &mut o.enable_detailed_cse_message,
        parse_bool,
    );
    overlay.set(
        "enable-dynamic-instance-list",
        &p.enable_dynamic_instance_list,
        &mut o.enable_dynamic_instance_list,
        parse_bool,
    );
    overlay.set("min-cpu", &p.min_cpu, &mut o.min_cores_total, parse_number);
    overlay.set("max-cpu", &p.max_cpu, &mut o.max_cores_total, parse_number);
    overlay.set("min-memory", &p.min_memory, &mut o.min_memory_total, parse_gib);
    overlay.set("max-memory", &p.max_memory, &mut o.max_memory_total, parse_gib);
    overlay.set(
        "max-graceful-termination-sec",
        &p.max_graceful_termination_sec,
        &mut o.max_graceful_termination_sec,
        parse_number,
    );
    overlay.set(
        "balance-similar-node-groups",
        &p.balance_similar_node_groups,
        &mut o.balance_similar_node_groups,
        parse_bool,
    );
    overlay.set("expander", &p.expander, &mut o.expander_names, |v| {
        Some(v.to_owned())
    });
    overlay.set(
        "new-pod-scale-up-delay",
        &p.new_pod_scale_up_delay,
        &mut o.new_pod_scale_up_delay,
        parse_duration,
    );
    if overlay.set(
        "max-empty-bulk-delete",
        &p.max_empty_bulk_delete,
        &mut o.max_empty_bulk_delete,
        parse_number,
    ) {
        o.max_scale_down_parallelism = o.max_empty_bulk_delete;
    }
    overlay.set(
        "ok-total-unready-count",
        &p.ok_total_unready_count,
        &mut o.ok_total_unready_count,
        parse_number,
    );
    overlay.set(
        "max-total-unready-percentage",
        &p.max_total_unready_percentage,
        &mut o.max_total_unready_percentage,
        parse_number,
    );
    overlay.set(
        "daemonset-eviction-for-empty-nodes",
        &p.daemonset_eviction_for_empty_nodes,
        &mut o.daemonset_eviction_for_empty_nodes,
        parse_bool,
    );
    overlay.set(
        "daemonset-eviction-for-occupied-nodes",
        &p.daemonset_eviction_for_occupied_nodes,
        &mut o.daemonset_eviction_for_occupied_nodes,
        parse_bool,
    );
    overlay.set(
        "enable-qos-logging",
        &p.enable_qos_logging,
        &mut o.enable_qos_logging,
        parse_bool,
    );
    overlay.set(
        "skip-nodes-with-local-storage",
        &p.skip_nodes_with_local_storage,
        &mut o.skip_nodes_with_local_storage,
        parse_bool,
    );
    overlay.set(
        "skip-nodes-with-system-pods",
        &p.skip_nodes_with_system_pods,
        &mut o.skip_nodes_with_system_pods,
        parse_bool,
    );

    ProfileOverlay {
        options: o,
        rejected: overlay.rejected,
    }
}

#[derive(Default)]
struct Overlay {
    rejected: Vec<&'static str>,
}

impl Overlay {
    /// Returns whether `target` was overwritten.
    fn set<T>(
        &mut self,
        field: &'static str,
        raw: &str,
        target: &mut T,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> bool {
        if raw.is_empty() {
            return false;
        }

        match parse(raw) {
            Some(value) => {
                *target = value;
                true
            }
            None => {
                self.rejected.push(field);
                false
            }
        }
    }
}

const DURATION_UNITS: &[&str] = &["ns", "us", "µs", "μs", "ms", "s", "m", "h"];

/// Accepts unit-suffixed spans such as `90s`, `5m` or `1h30m`, and a bare `0`.
/// Only integer amounts with `ns`, `us`, `ms`, `s`, `m` or `h` units are valid.
fn parse_duration(raw: &str) -> Option<Duration> {
    if raw == "0" {
        return Some(Duration::from_secs(0));
    }

    let mut normalized = String::with_capacity(raw.len());
    let mut rest = raw;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or_else(|| rest.len());
        if digits == 0 {
            return None;
        }

        let (amount, tail) = rest.split_at(digits);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or_else(|| tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        if !DURATION_UNITS.contains(&unit) {
            return None;
        }

        normalized.push_str(amount);
        normalized.push_str(match unit {
            "µs" | "μs" => "us",
            unit => unit,
        });
        rest = tail;
    }

    humantime::parse_duration(&normalized).ok()
}

/// Zero would make the control loop tick without pause.
fn parse_positive_duration(raw: &str) -> Option<Duration> {
    parse_duration(raw).filter(|d| *d > Duration::from_secs(0))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn parse_number<T: FromStr>(raw: &str) -> Option<T> {
    raw.parse().ok()
}

fn parse_gib(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok()?.checked_mul(GIB)
}
