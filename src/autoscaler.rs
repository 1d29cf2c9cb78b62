mod builder;
mod dynamic_autoscaler;
mod profile;
mod static_autoscaler;

pub use builder::{AutoscalerBuilder, BuilderState};
pub use dynamic_autoscaler::{DynamicAutoscaler, ReloadState, TickError};
pub use profile::{apply_profile, ProfileOverlay};
pub use static_autoscaler::StaticAutoscaler;

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

#[async_trait]
pub trait Autoscaler: Send + fmt::Debug {
    fn start(&mut self) -> Result<()>;
    async fn run_once(&mut self, now: DateTime<Utc>) -> Result<()>;
    /// Releases everything the autoscaler holds. It must not run afterwards.
    fn exit_cleanup(&mut self);
}
