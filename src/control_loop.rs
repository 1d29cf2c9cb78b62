use crate::actor;
use crate::autoscaler::DynamicAutoscaler;
use act_zero::runtimes::tokio::Timer;
use act_zero::timer::Tick;
use act_zero::{send, Actor, ActorError, ActorResult, Addr, Produces, WeakAddr};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Drives the dynamic autoscaler once per scan interval.
pub struct ControlLoop {
    autoscaler: DynamicAutoscaler,
    scan_interval: Duration,
    timer: Timer,
    addr: WeakAddr<Self>,
}

impl ControlLoop {
    pub fn new(autoscaler: DynamicAutoscaler) -> Self {
        Self {
            scan_interval: autoscaler.scan_interval(),
            autoscaler,
            timer: Default::default(),
            addr: Default::default(),
        }
    }
}

impl fmt::Display for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControlLoop ({:?})", self.scan_interval)
    }
}

impl fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[async_trait]
impl Actor for ControlLoop {
    #[tracing::instrument(name = "ControlLoop::started", skip(self, addr))]
    async fn started(&mut self, addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        info!("Started {}", self);
        self.addr = addr.downgrade();

        self.autoscaler.start().map_err(actor::Error::fatal)?;

        self.timer
            .set_interval_weak(self.addr.clone(), self.scan_interval);

        Produces::ok(())
    }

    async fn error(&mut self, error: ActorError) -> bool {
        let stop = actor::handle_error(error);

        if stop {
            self.autoscaler.exit_cleanup();
        }

        stop
    }
}

#[async_trait]
impl Tick for ControlLoop {
    async fn tick(&mut self) -> ActorResult<()> {
        if self.timer.tick() {
            send!(self.addr.run_once());
        }

        Produces::ok(())
    }
}

impl ControlLoop {
    #[tracing::instrument(name = "ControlLoop::run_once", skip(self))]
    async fn run_once(&mut self) -> ActorResult<()> {
        let result = self.autoscaler.run_once(Utc::now()).await;

        let scan_interval = self.autoscaler.scan_interval();
        if scan_interval != self.scan_interval {
            info!(from = ?self.scan_interval, to = ?scan_interval, "Scan interval changed");

            self.scan_interval = scan_interval;
            self.timer
                .set_interval_weak(self.addr.clone(), scan_interval);
        }

        result.map_err(actor::Error::from)?;

        Produces::ok(())
    }
}
