use crate::cloud_provider::azure::{ScaleSetVm, ScaleSetVmClient};
use crate::cloud_provider::{Instance, InstanceState};
use crate::errors::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Cached instance list of a single scale set, refreshed at most once per
/// refresh period.
///
/// The instance list and the refresh timestamp are guarded by the same lock
/// and always change together.
#[derive(Debug)]
pub struct InstanceCache {
    resource_group: String,
    scale_set: String,
    refresh_period: Duration,
    client: Arc<dyn ScaleSetVmClient>,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    instances: Vec<Instance>,
    last_refresh: Option<DateTime<Utc>>,
}

impl InstanceCache {
    pub fn new(
        resource_group: impl Into<String>,
        scale_set: impl Into<String>,
        refresh_period: Duration,
        client: Arc<dyn ScaleSetVmClient>,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            scale_set: scale_set.into(),
            refresh_period,
            client,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Refreshes the instance list when it is older than the refresh period.
    ///
    /// A throttled list call still counts as a refresh, the cached instances stay as they were.
    pub async fn validate(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;

        self.validate_locked(&mut inner).await
    }

    #[tracing::instrument(
        name = "InstanceCache::validate",
        skip(self, inner),
        fields(scale_set = %self.scale_set)
    )]
    async fn validate_locked(&self, inner: &mut Inner) -> Result<()> {
        let now = Utc::now();

        let fresh = inner
            .last_refresh
            .map_or(false, |last_refresh| {
                // a refresh stamped in the future is still fresh
                (now - last_refresh)
                    .to_std()
                    .map_or(true, |age| age < self.refresh_period)
            });
        if fresh {
            return Ok(());
        }

        debug!("Instance cache expired, listing scale set vms");

        match self.client.list(&self.resource_group, &self.scale_set).await {
            Ok(vms) => {
                inner.instances = vms.iter().map(ScaleSetVm::to_instance).collect();
                inner.last_refresh = Some(now);

                info!(instances = inner.instances.len(), "Refreshed instance cache");
            }
            Err(e) if e.is_throttled() => {
                inner.last_refresh = Some(now);

                warn!("Listing scale set vms got throttled, keeping cached instances");
            }
            Err(e) => {
                error!("Failed to list scale set vms: {}", e);

                return Err(e.to_autoscaler_error());
            }
        }

        Ok(())
    }

    pub async fn get_by_provider_id(&self, provider_id: &str) -> Result<Option<Instance>> {
        let mut inner = self.inner.lock().await;
        self.validate_locked(&mut inner).await?;

        Ok(inner
            .instances
            .iter()
            .find(|instance| instance.id == provider_id)
            .cloned())
    }

    pub async fn get_by_state(&self, state: InstanceState) -> Result<Vec<Instance>> {
        let mut inner = self.inner.lock().await;
        self.validate_locked(&mut inner).await?;

        Ok(inner
            .instances
            .iter()
            .filter(|instance| instance.state == state)
            .cloned()
            .collect())
    }

    pub async fn instances(&self) -> Result<Vec<Instance>> {
        let mut inner = self.inner.lock().await;
        self.validate_locked(&mut inner).await?;

        Ok(inner.instances.clone())
    }

    pub async fn size(&self) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        self.validate_locked(&mut inner).await?;

        Ok(inner.instances.len())
    }

    /// Updates a cached instance in place. Unknown ids are ignored.
    pub async fn set_status_by_provider_id(&self, provider_id: &str, state: InstanceState) {
        let mut inner = self.inner.lock().await;

        if let Some(instance) = inner
            .instances
            .iter_mut()
            .find(|instance| instance.id == provider_id)
        {
            instance.state = state;
        }
    }

    pub async fn invalidate(&self) {
        let mut inner = self.inner.lock().await;
        let refresh_period = chrono::Duration::from_std(self.refresh_period).ok();

        // a period too long to subtract leaves the cache unrefreshed
        inner.last_refresh = inner
            .last_refresh
            .zip(refresh_period)
            .and_then(|(last_refresh, period)| last_refresh.checked_sub_signed(period));
    }

    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().await.last_refresh
    }
}
