use crate::expander::{ExpansionOption, Filter};

pub const NAME: &str = "least-waste";

/// Prefers options that leave the least capacity idle.
#[derive(Debug, Clone, Copy)]
pub struct LeastWaste;

impl Filter for LeastWaste {
    fn name(&self) -> &'static str {
        NAME
    }

    fn best_options(&self, options: Vec<ExpansionOption>) -> Vec<ExpansionOption> {
        let least = options
            .iter()
            .map(|o| o.waste)
            .fold(f64::INFINITY, f64::min);

        options.into_iter().filter(|o| o.waste <= least).collect()
    }
}
