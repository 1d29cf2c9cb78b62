use crate::expander::{ExpansionOption, Filter};
use rand::seq::SliceRandom;

pub const NAME: &str = "random";

#[derive(Debug, Clone, Copy)]
pub struct Random;

impl Filter for Random {
    fn name(&self) -> &'static str {
        NAME
    }

    fn best_options(&self, options: Vec<ExpansionOption>) -> Vec<ExpansionOption> {
        let mut rng = rand::thread_rng();

        options.choose(&mut rng).cloned().into_iter().collect()
    }
}
