use crate::cloud_provider::CloudProviderFactory;
use crate::autoscaler::profile::apply_profile;
use crate::autoscaler::{Autoscaler, StaticAutoscaler};
use crate::dynamic::Config;
use crate::errors::{AutoscalerError, Result};
use crate::expander::{self, Strategy};
use crate::options::AutoscalingOptions;
use crate::pods::{EventRecorder, PodLister};
use crate::processors::provreq::{EventManager, ProvisioningRequestPodsFilter};
use std::sync::Arc;
use strum_macros::Display;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BuilderState {
    /// Only the static startup options are in effect.
    Unconfigured,
    /// The latest accepted dynamic config is overlaid on the static options.
    Configured,
}

/// Assembles autoscalers from the static options, the latest dynamic config
/// and the long-lived collaborators.
#[derive(Debug)]
pub struct AutoscalerBuilder {
    static_options: AutoscalingOptions,
    dynamic_config: Option<Config>,
    options: AutoscalingOptions,
    expander: Arc<Strategy>,
    cloud_provider_factory: Arc<dyn CloudProviderFactory>,
    pod_lister: Arc<dyn PodLister>,
    event_recorder: Arc<dyn EventRecorder>,
    max_provisioning_request_events: usize,
}

impl AutoscalerBuilder {
    pub fn new(
        options: AutoscalingOptions,
        cloud_provider_factory: Arc<dyn CloudProviderFactory>,
        pod_lister: Arc<dyn PodLister>,
        event_recorder: Arc<dyn EventRecorder>,
        max_provisioning_request_events: usize,
    ) -> Result<Self> {
        if options.scan_interval.as_nanos() == 0 {
            return Err(AutoscalerError::configuration("scan interval must be positive"));
        }

        let expander = Arc::new(expander::build(&options.expander_name_list())?);

        Ok(Self {
            static_options: options.clone(),
            dynamic_config: None,
            options,
            expander,
            cloud_provider_factory,
            pod_lister,
            event_recorder,
            max_provisioning_request_events,
        })
    }

    pub fn state(&self) -> BuilderState {
        match self.dynamic_config {
            Some(_) => BuilderState::Configured,
            None => BuilderState::Unconfigured,
        }
    }

    /// Options used by the most recent successful build.
    pub fn options(&self) -> &AutoscalingOptions {
        &self.options
    }

    pub fn dynamic_config(&self) -> Option<&Config> {
        self.dynamic_config.as_ref()
    }

    /// Stores the config for the next [`Self::build`]. Nothing is rebuilt here.
    pub fn set_dynamic_config(&mut self, config: Config) -> &mut Self {
        self.dynamic_config = Some(config);
        self
    }

    /// Builds a new autoscaler. On error nothing the builder holds changes.
    #[tracing::instrument(name = "AutoscalerBuilder::build", skip(self), fields(state = %self.state()))]
    pub fn build(&mut self) -> Result<Box<dyn Autoscaler>> {
        let mut options = self.static_options.clone();
        let mut expander_selected = false;

        if let Some(config) = &self.dynamic_config {
            options.node_groups = config.node_group_spec_strings();

            let overlay = apply_profile(&options, &config.auto_scaler_profile);
            if !overlay.rejected.is_empty() {
                warn!(
                    rejected = ?overlay.rejected,
                    "Ignoring malformed autoscaler profile values"
                );
            }

            options = overlay.options;
            expander_selected = !config.auto_scaler_profile.expander.is_empty();
        }

        let cloud_provider = self.cloud_provider_factory.build(&options)?;
        let expander = if expander_selected {
            Arc::new(expander::build(&options.expander_name_list())?)
        } else {
            Arc::clone(&self.expander)
        };

        let pod_list_processor = ProvisioningRequestPodsFilter::new(
            EventManager::new(self.max_provisioning_request_events),
            Arc::clone(&self.event_recorder),
        );

        info!(
            node_groups = ?options.node_groups,
            expanders = ?expander.names(),
            scan_interval = ?options.scan_interval,
            "Built autoscaler"
        );

        self.options = options.clone();
        self.expander = Arc::clone(&expander);

        Ok(Box::new(StaticAutoscaler::new(
            options,
            cloud_provider,
            expander,
            Arc::clone(&self.pod_lister),
            Box::new(pod_list_processor),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud_provider::mock::MockCloudProviderFactory;
    use crate::dynamic::AutoScalerProfile;
    use crate::pods::recording::RecordingEventRecorder;
    use crate::pods::NoPodLister;
    use std::time::Duration;

    fn builder(factory: &Arc<MockCloudProviderFactory>) -> AutoscalerBuilder {
        AutoscalerBuilder::new(
            AutoscalingOptions {
                node_groups: vec!["1:3:static-pool".into()],
                ..Default::default()
            },
            factory.clone(),
            Arc::new(NoPodLister),
            Arc::new(RecordingEventRecorder::default()),
            50,
        )
        .expect("default expander")
    }

    fn config(yaml: &str) -> Config {
        Config::build(yaml.as_bytes(), false).expect("valid config")
    }

    #[test]
    fn test_rejects_zero_static_scan_interval() {
        let result = AutoscalerBuilder::new(
            AutoscalingOptions {
                scan_interval: Duration::from_secs(0),
                ..Default::default()
            },
            Arc::new(MockCloudProviderFactory::default()),
            Arc::new(NoPodLister),
            Arc::new(RecordingEventRecorder::default()),
            50,
        );

        assert!(matches!(result, Err(AutoscalerError::Configuration(_))));
    }

    #[test]
    fn test_unconfigured_build_uses_static_options() -> Result<()> {
        let factory = Arc::new(MockCloudProviderFactory::default());
        let mut builder = builder(&factory);

        assert_eq!(BuilderState::Unconfigured, builder.state());
        builder.build()?;

        assert_eq!(
            vec!["1:3:static-pool".to_owned()],
            factory.last_build().map(|o| o.node_groups).unwrap_or_default()
        );

        Ok(())
    }

    #[test]
    fn test_configured_build_overlays_dynamic_config() -> Result<()> {
        let factory = Arc::new(MockCloudProviderFactory::default());
        let mut builder = builder(&factory);

        builder.set_dynamic_config(config(
            "nodeGroups:\n  - {name: pool-a, minSize: 1, maxSize: 10}\nautoScalerProfile:\n  scan-interval: 30s\n  expander: least-waste\n  max-cpu: lots\n",
        ));
        assert_eq!(BuilderState::Configured, builder.state());
        // nothing is rebuilt until build is called
        assert!(factory.builds().is_empty());

        builder.build()?;

        let options = factory.last_build().expect("cloud provider was built");
        assert_eq!(vec!["1:10:Delete:pool-a:{}|".to_owned()], options.node_groups);
        assert_eq!(Duration::from_secs(30), options.scan_interval);
        assert_eq!(AutoscalingOptions::default().max_cores_total, options.max_cores_total);
        assert_eq!(&options, builder.options());
        assert_eq!(vec!["least-waste"], builder.expander.names());

        Ok(())
    }

    #[test]
    fn test_failed_build_commits_nothing() -> Result<()> {
        let factory = Arc::new(MockCloudProviderFactory::default());
        let mut builder = builder(&factory);
        builder.build()?;
        let options = builder.options().clone();

        builder.set_dynamic_config(Config {
            auto_scaler_profile: AutoScalerProfile {
                scan_interval: "1m".into(),
                expander: "price".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        let err = builder.build().unwrap_err();
        assert_eq!("configuration error: Expander price not supported", err.to_string());
        assert_eq!(&options, builder.options());
        assert_eq!(vec!["random"], builder.expander.names());

        factory.set_fail(true);
        builder.set_dynamic_config(config("autoScalerProfile:\n  scan-interval: 1m\n"));
        assert!(builder.build().is_err());
        assert_eq!(&options, builder.options());

        Ok(())
    }

    #[test]
    fn test_expander_kept_without_profile_selection() -> Result<()> {
        let factory = Arc::new(MockCloudProviderFactory::default());
        let mut builder = builder(&factory);

        builder.set_dynamic_config(config("autoScalerProfile:\n  expander: most-pods\n"));
        builder.build()?;
        assert_eq!(vec!["most-pods"], builder.expander.names());

        builder.set_dynamic_config(config("autoScalerProfile:\n  scan-interval: 20s\n"));
        builder.build()?;
        assert_eq!(vec!["most-pods"], builder.expander.names());
        assert_eq!("random", builder.options().expander_names);

        Ok(())
    }

    #[test]
    fn test_new_rejects_unknown_expander() {
        let result = AutoscalerBuilder::new(
            AutoscalingOptions {
                expander_names: "random,random".into(),
                ..Default::default()
            },
            Arc::new(MockCloudProviderFactory::default()),
            Arc::new(NoPodLister),
            Arc::new(RecordingEventRecorder::default()),
            50,
        );

        assert!(result.is_err());
    }
}
