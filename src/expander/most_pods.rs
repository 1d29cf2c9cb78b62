use crate::expander::{ExpansionOption, Filter};

pub const NAME: &str = "most-pods";

/// Prefers options that schedule the most pods.
#[derive(Debug, Clone, Copy)]
pub struct MostPods;

impl Filter for MostPods {
    fn name(&self) -> &'static str {
        NAME
    }

    fn best_options(&self, options: Vec<ExpansionOption>) -> Vec<ExpansionOption> {
        let most = options.iter().map(|o| o.pod_count).max().unwrap_or_default();

        options.into_iter().filter(|o| o.pod_count == most).collect()
    }
}
