use act_zero::runtimes::tokio::spawn_actor;
use act_zero::AddrLike;
use dynamic_auto_scaler::autoscaler::{AutoscalerBuilder, DynamicAutoscaler};
use dynamic_auto_scaler::config::load_config;
use dynamic_auto_scaler::control_loop::ControlLoop;
use dynamic_auto_scaler::dynamic::{ConfigFetcher, ConfigFetcherOptions};
use dynamic_auto_scaler::pods::LoggingEventRecorder;
use dynamic_auto_scaler::{cloud_provider, pods};
use std::sync::Arc;
use tracing::info;
use tracing::subscriber::set_global_default;
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(ErrorLayer::default());

    set_global_default(subscriber)?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;
    let config = load_config()?;

    let cloud_provider_factory = cloud_provider::build_from_config(Arc::clone(&config))?;
    let pod_lister = pods::build_from_config(Arc::clone(&config));

    let builder = AutoscalerBuilder::new(
        config.autoscaling.clone(),
        cloud_provider_factory,
        pod_lister,
        Arc::new(LoggingEventRecorder),
        config.max_provisioning_request_events,
    )?;

    let fetcher = ConfigFetcher::new(ConfigFetcherOptions {
        config_path: config.dynamic_config.path.clone(),
        support_scale_to_zero: config.dynamic_config.support_scale_to_zero,
    });

    let autoscaler = DynamicAutoscaler::new(builder, fetcher)?;
    let control_loop = spawn_actor(ControlLoop::new(autoscaler));

    control_loop.termination().await;
    info!("Control loop stopped");

    Err("control loop stopped after a fatal error".into())
}
