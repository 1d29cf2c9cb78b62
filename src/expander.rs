mod least_waste;
mod most_pods;
mod random;

use crate::errors::{AutoscalerError, Result};
use std::collections::HashSet;
use std::fmt;

/// A candidate scale-up: grow `node_group` by `node_count` nodes to fit `pod_count` pods.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpansionOption {
    pub node_group: String,
    pub node_count: usize,
    pub pod_count: usize,
    /// Lower is better, in `0.0..=1.0`.
    pub waste: f64,
}

/// Narrows a set of expansion options down to the preferred ones.
pub trait Filter: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;
    fn best_options(&self, options: Vec<ExpansionOption>) -> Vec<ExpansionOption>;
}

/// Applies filters in order and breaks remaining ties at random.
#[derive(Debug)]
pub struct Strategy {
    filters: Vec<Box<dyn Filter>>,
    fallback: random::Random,
}

impl Strategy {
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn best_option(&self, options: Vec<ExpansionOption>) -> Option<ExpansionOption> {
        let mut candidates = options;

        for filter in &self.filters {
            candidates = filter.best_options(candidates);

            if candidates.len() <= 1 {
                break;
            }
        }

        self.fallback.best_options(candidates).into_iter().next()
    }
}

/// Builds a strategy from expander names such as `least-waste` or `random`.
pub fn build(names: &[&str]) -> Result<Strategy> {
    let mut seen = HashSet::new();
    let mut filters: Vec<Box<dyn Filter>> = vec![];

    for name in names {
        if !seen.insert(*name) {
            return Err(AutoscalerError::configuration(format!(
                "Expander {} was specified multiple times, each expander must not be specified more than once",
                name
            )));
        }

        filters.push(match *name {
            random::NAME => Box::new(random::Random),
            most_pods::NAME => Box::new(most_pods::MostPods),
            least_waste::NAME => Box::new(least_waste::LeastWaste),
            other => {
                return Err(AutoscalerError::configuration(format!(
                    "Expander {} not supported",
                    other
                )))
            }
        });
    }

    Ok(Strategy {
        filters,
        fallback: random::Random,
    })
}

#[cfg(test)]
pub(crate) fn option(node_group: &str, pod_count: usize, waste: f64) -> ExpansionOption {
    ExpansionOption {
        node_group: node_group.into(),
        node_count: 1,
        pod_count,
        waste,
    }
}
