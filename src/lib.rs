use std::sync::Arc;

pub mod actor;
pub mod autoscaler;
pub mod cloud_provider;
pub mod config;
pub mod control_loop;
pub mod dynamic;
pub mod errors;
pub mod expander;
pub mod options;
pub mod pods;
pub mod processors;
mod utils;

pub type AppConfig = Arc<config::Config>;
