pub mod provreq;

use crate::pods::Pod;
use std::fmt;

/// Rewrites the list of unschedulable pods before scale-up is considered.
pub trait PodListProcessor: Send + fmt::Debug {
    fn process(&mut self, unschedulable_pods: Vec<Pod>) -> Vec<Pod>;
}
