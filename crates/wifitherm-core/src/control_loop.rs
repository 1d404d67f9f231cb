//! The operational control loop
//!
//! Every tick runs the same fixed sequence on a single thread of control:
//!
//! 1. check the provisioning trigger (and whether a host is configured);
//!    if provisioning is needed, run the captive portal first, and end the
//!    tick there if it still left no host
//! 2. sample the sensor
//! 3. derive the heat index, or stop here while the reading is invalid
//! 4. report, if a minute has passed since the last report
//! 5. update the display, if any value changed
//!
//! and then sleeps for the sensor's minimum sampling interval. Every failure
//! is logged here, at the call site, and only skips the affected step.

use core::convert::Infallible;

use embassy_time::Instant;
use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info};

use crate::app_state::{AppError, RunState};
use crate::config::{ConfigStorage, ConfigStore, DeviceConfig};
use crate::display::{DisplayPresenter, TextSurface};
use crate::metrics::Reading;
use crate::provisioning::{CaptivePortal, ProvisioningFlow, ProvisioningTrigger};
use crate::reporter::{Connector, ReportError, ReportOutcome, Reporter};
use crate::sensors::{ClimateSensor, SampleReport, SensorSampler};

/// Source of monotonic time for the loop.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Everything the loop drives, handed over once at boot.
pub struct Devices<T, P, S, C, D, N> {
    pub trigger: T,
    pub portal: P,
    pub storage: S,
    pub sensor: C,
    pub display: DisplayPresenter<D>,
    pub connector: N,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// State the tick ran in
    pub state: RunState,
    /// Per-field sampling result, `None` when provisioning left no host
    pub sample: Option<SampleReport>,
    /// Whether the reading was valid after sampling
    pub reading_valid: bool,
    /// Reporter result, `None` when the reading was invalid
    pub report: Option<Result<ReportOutcome, ReportError>>,
    /// Whether the display was redrawn
    pub redrawn: bool,
}

impl TickReport {
    fn new(state: RunState) -> Self {
        Self {
            state,
            sample: None,
            reading_valid: false,
            report: None,
            redrawn: false,
        }
    }
}

/// Owns the reading, the report timer, the display state and every boundary.
pub struct ControlLoop<T, P, S, C, D, N> {
    trigger: T,
    provisioning: ProvisioningFlow<P>,
    store: ConfigStore<S>,
    sampler: SensorSampler<C>,
    presenter: DisplayPresenter<D>,
    connector: N,
    reporter: Reporter,
    reading: Reading,
    state: RunState,
}

impl<T, P, S, C, D, N> ControlLoop<T, P, S, C, D, N>
where
    T: ProvisioningTrigger,
    P: CaptivePortal,
    S: ConfigStorage,
    C: ClimateSensor,
    D: TextSurface,
    N: Connector,
{
    /// Load the stored configuration, prepare the display and pick the
    /// initial state. The report timer starts at `now`.
    pub fn boot(devices: Devices<T, P, S, C, D, N>, now: Instant) -> Self {
        let Devices {
            mut trigger,
            portal,
            storage,
            sensor,
            display: mut presenter,
            connector,
        } = devices;

        let mut store = ConfigStore::new(storage);
        let config = store.load().unwrap_or_else(DeviceConfig::empty);
        info!("Host is: {}", config.host);

        if let Err(e) = presenter.start() {
            error!("{}", AppError::from(e));
        }

        let state = RunState::select(trigger.is_asserted(), &config.host);
        info!("Initial state: {}", state.label());

        Self {
            trigger,
            provisioning: ProvisioningFlow::new(portal),
            store,
            sampler: SensorSampler::new(sensor),
            presenter,
            connector,
            reporter: Reporter::new(config, now),
            reading: Reading::new(),
            state,
        }
    }

    /// Run one iteration of the loop body at time `now`.
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let state = RunState::select(self.trigger.is_asserted(), &self.reporter.config().host);
        self.state = state;

        if state == RunState::Provisioning {
            self.provision().await;
            if !self.reporter.config().is_provisioned() {
                debug!("No host after provisioning, skipping the rest of the tick");
                return TickReport::new(state);
            }
        }

        let mut report = TickReport::new(state);
        report.sample = Some(self.sampler.sample(&mut self.reading, now).await);

        if !self.reading.derive() {
            debug!("Reading not valid yet, skipping report and display");
            return report;
        }
        report.reading_valid = true;
        debug!(
            "Heat index {:.2} from {:.2}F {:.2}%",
            self.reading.heat_index, self.reading.temperature, self.reading.humidity
        );

        let outcome = self
            .reporter
            .maybe_report(&mut self.connector, &self.reading, now)
            .await;
        if let Err(e) = &outcome {
            error!("{}", AppError::from(e.clone()));
        }
        report.report = Some(outcome);

        match self.presenter.update(&self.reading) {
            Ok(redrawn) => report.redrawn = redrawn,
            Err(e) => error!("{}", AppError::from(e)),
        }

        report
    }

    /// Hand the device to the captive portal until it completes.
    async fn provision(&mut self) {
        match self.provisioning.run(&mut self.store).await {
            Ok(config) => {
                info!("Provisioned host {}:{}", config.host, config.port);
                self.reporter.set_config(config);
            }
            Err(e) => error!("Check wifi config: {}", AppError::from(e)),
        }
        self.state = RunState::Sampling;
    }

    /// Tick forever, sleeping the sensor's minimum delay between ticks.
    pub async fn run<K: Clock, W: DelayNs>(&mut self, clock: &K, delay: &mut W) -> Infallible {
        let pause = self.sampler.sensor().min_delay();
        let pause_ms = u32::try_from(pause.as_millis()).unwrap_or(u32::MAX);
        info!("Control loop running, tick every {} ms", pause_ms);

        loop {
            self.tick(clock.now()).await;
            delay.delay_ms(pause_ms).await;
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn config(&self) -> &DeviceConfig {
        self.reporter.config()
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn presenter(&self) -> &DisplayPresenter<D> {
        &self.presenter
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    pub fn sampler_mut(&mut self) -> &mut SensorSampler<C> {
        &mut self.sampler
    }

    pub fn trigger_mut(&mut self) -> &mut T {
        &mut self.trigger
    }

    pub fn connector_mut(&mut self) -> &mut N {
        &mut self.connector
    }

    pub fn portal_mut(&mut self) -> &mut P {
        self.provisioning.portal_mut()
    }
}
