//! The two periodic control loops: cooling stage and over-temperature
//! alarm.
//!
//! Each loop owns its sensor, its indicator and its state machine, and
//! runs on its own tokio interval. They never share the parameter store:
//! the cooler reads it directly and republishes the limit over a watch
//! channel after each actuation pass, and the alarm compares against
//! whatever value that channel holds at its own tick. A missed sensor
//! reading skips the whole tick, so the previous actuation state simply
//! carries over.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tstat_core::{
    Action, AlarmStateMachine, CoolerStateMachine, Indicator, ParameterStore, TemperatureSensor,
};

/// Most recent temperature observed by the cooler loop, shared with the
/// monitor server for `? t` queries. Starts at 0 until the first sample
/// lands.
pub type SharedTemperature = Arc<AtomicI64>;

// ============================================================================
// Cooler Loop
// ============================================================================

/// State owned by the cooling loop.
pub struct CoolerContext<S, I> {
    sensor: S,
    indicator: I,
    store: Arc<ParameterStore>,
    temperature: SharedTemperature,
    limit_tx: watch::Sender<i64>,
    machine: CoolerStateMachine,
    samples: u64,
}

impl<S: TemperatureSensor, I: Indicator> CoolerContext<S, I> {
    pub fn new(
        sensor: S,
        indicator: I,
        store: Arc<ParameterStore>,
        temperature: SharedTemperature,
        limit_tx: watch::Sender<i64>,
    ) -> Self {
        Self {
            sensor,
            indicator,
            store,
            temperature,
            limit_tx,
            machine: CoolerStateMachine::new(),
            samples: 0,
        }
    }

    /// Number of samples successfully taken so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Runs one sampling pass: read the sensor, drive the cooling stage,
    /// then republish the alarm limit.
    pub fn tick(&mut self) {
        let Some(value) = self.sensor.sample() else {
            debug!("Cooler sample unavailable, tick skipped");
            return;
        };

        self.samples += 1;
        self.temperature.store(value, Ordering::Relaxed);
        debug!(sample = self.samples, temperature = value, "Cooler sample");

        let params = self.store.get();
        match self.machine.tick(value, &params) {
            Action::TurnOn => {
                self.indicator.set(true);
                info!(
                    temperature = value,
                    setpoint = params.setpoint,
                    "Cooling on"
                );
            }
            Action::TurnOff => {
                self.indicator.set(false);
                info!(
                    temperature = value,
                    setpoint = params.setpoint,
                    "Cooling off"
                );
            }
            Action::None => {}
        }

        // The limit snapshot taken for this pass goes out after actuation;
        // the alarm loop picks it up on its next tick. A closed channel
        // just means the alarm loop is gone.
        let _ = self.limit_tx.send(params.limit);
    }
}

/// Spawns the cooling loop task.
///
/// Samples on `period`, with the first pass running immediately. Uses
/// cooperative shutdown via CancellationToken.
pub fn spawn_cooler_task<S, I>(
    mut context: CoolerContext<S, I>,
    period: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()>
where
    S: TemperatureSensor + Send + 'static,
    I: Indicator + Send + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval(period);

        info!(interval_secs = period.as_secs(), "Cooler loop started");

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    info!("Cooler loop shutting down");
                    break;
                }

                _ = tick.tick() => {
                    context.tick();
                }
            }
        }

        debug!("Cooler loop task completed");
    })
}

// ============================================================================
// Alarm Loop
// ============================================================================

/// State owned by the alarm loop.
///
/// The alarm indicator blinks while the temperature sits above the limit:
/// the state machine reports `TurnOn` on every tick it spends at the
/// limit, and each observation toggles the indicator. Only the ticks that
/// switch it on log "Alarm on". `TurnOff` always forces the indicator off
/// and always logs, whichever blink phase it interrupts.
pub struct AlarmContext<S, I> {
    sensor: S,
    indicator: I,
    limit_rx: watch::Receiver<i64>,
    machine: AlarmStateMachine,
    lit: bool,
}

impl<S: TemperatureSensor, I: Indicator> AlarmContext<S, I> {
    pub fn new(sensor: S, indicator: I, limit_rx: watch::Receiver<i64>) -> Self {
        Self {
            sensor,
            indicator,
            limit_rx,
            machine: AlarmStateMachine::new(),
            lit: false,
        }
    }

    /// Whether the indicator is currently lit.
    pub fn lit(&self) -> bool {
        self.lit
    }

    /// Runs one sampling pass against the most recently published limit.
    pub fn tick(&mut self) {
        let limit = *self.limit_rx.borrow();

        let Some(value) = self.sensor.sample() else {
            debug!("Alarm sample unavailable, tick skipped");
            return;
        };

        match self.machine.tick(value, limit) {
            Action::TurnOn => {
                if self.lit {
                    self.indicator.set(false);
                    self.lit = false;
                } else {
                    self.indicator.set(true);
                    self.lit = true;
                    info!(temperature = value, limit, "Alarm on");
                }
            }
            Action::TurnOff => {
                self.indicator.set(false);
                self.lit = false;
                info!(temperature = value, limit, "Alarm off");
            }
            Action::None => {}
        }
    }
}

/// Spawns the alarm loop task.
pub fn spawn_alarm_task<S, I>(
    mut context: AlarmContext<S, I>,
    period: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()>
where
    S: TemperatureSensor + Send + 'static,
    I: Indicator + Send + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval(period);

        info!(interval_secs = period.as_secs(), "Alarm loop started");

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    info!("Alarm loop shutting down");
                    break;
                }

                _ = tick.tick() => {
                    context.tick();
                }
            }
        }

        debug!("Alarm loop task completed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tstat_core::Parameters;

    struct ScriptedSensor {
        samples: VecDeque<Option<i64>>,
    }

    impl ScriptedSensor {
        fn new(samples: &[Option<i64>]) -> Self {
            Self {
                samples: samples.iter().copied().collect(),
            }
        }
    }

    impl TemperatureSensor for ScriptedSensor {
        fn sample(&mut self) -> Option<i64> {
            self.samples.pop_front().flatten()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingIndicator {
        calls: Arc<Mutex<Vec<bool>>>,
    }

    impl RecordingIndicator {
        fn calls(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Indicator for RecordingIndicator {
        fn set(&mut self, on: bool) {
            self.calls.lock().unwrap().push(on);
        }
    }

    fn cooler_fixture(
        samples: &[Option<i64>],
    ) -> (
        CoolerContext<ScriptedSensor, RecordingIndicator>,
        RecordingIndicator,
        SharedTemperature,
        watch::Receiver<i64>,
    ) {
        let indicator = RecordingIndicator::default();
        let temperature = SharedTemperature::default();
        let store = Arc::new(ParameterStore::new(Parameters::default()));
        let (limit_tx, limit_rx) = watch::channel(Parameters::DEFAULT_LIMIT);
        let context = CoolerContext::new(
            ScriptedSensor::new(samples),
            indicator.clone(),
            store,
            Arc::clone(&temperature),
            limit_tx,
        );
        (context, indicator, temperature, limit_rx)
    }

    // ------------------------------------------------------------------
    // Cooler
    // ------------------------------------------------------------------

    #[test]
    fn test_cooler_actuates_on_thresholds() {
        let (mut context, indicator, _, _rx) =
            cooler_fixture(&[Some(64), Some(67), Some(63)]);

        context.tick();
        context.tick();
        context.tick();

        // 64 holds, 67 engages, 63 releases.
        assert_eq!(indicator.calls(), vec![true, false]);
        assert_eq!(context.samples(), 3);
    }

    #[test]
    fn test_cooler_records_latest_sample() {
        let (mut context, _, temperature, _rx) = cooler_fixture(&[Some(64), Some(67)]);

        context.tick();
        assert_eq!(temperature.load(Ordering::Relaxed), 64);

        context.tick();
        assert_eq!(temperature.load(Ordering::Relaxed), 67);
    }

    #[test]
    fn test_cooler_skips_missing_sample() {
        let (mut context, indicator, temperature, mut limit_rx) =
            cooler_fixture(&[None, Some(70)]);

        context.tick();
        assert_eq!(context.samples(), 0);
        assert_eq!(temperature.load(Ordering::Relaxed), 0);
        assert!(indicator.calls().is_empty());
        // Nothing sampled, nothing published.
        assert!(!limit_rx.has_changed().unwrap());

        context.tick();
        assert_eq!(context.samples(), 1);
        assert_eq!(indicator.calls(), vec![true]);
        assert!(limit_rx.has_changed().unwrap());
    }

    #[test]
    fn test_cooler_publishes_limit_each_pass() {
        let (mut context, _, _, limit_rx) = cooler_fixture(&[Some(64), Some(64)]);
        let store = Arc::clone(&context.store);

        context.tick();
        assert_eq!(*limit_rx.borrow(), 95);

        // An operator write shows up with the following pass.
        store.set_limit(90);
        context.tick();
        assert_eq!(*limit_rx.borrow(), 90);
    }

    // ------------------------------------------------------------------
    // Alarm
    // ------------------------------------------------------------------

    fn alarm_fixture(
        samples: &[Option<i64>],
        limit: i64,
    ) -> (
        AlarmContext<ScriptedSensor, RecordingIndicator>,
        RecordingIndicator,
        watch::Sender<i64>,
    ) {
        let indicator = RecordingIndicator::default();
        let (limit_tx, limit_rx) = watch::channel(limit);
        let context = AlarmContext::new(ScriptedSensor::new(samples), indicator.clone(), limit_rx);
        (context, indicator, limit_tx)
    }

    #[test]
    fn test_alarm_blink_and_release() {
        let (mut context, indicator, _tx) =
            alarm_fixture(&[Some(90), Some(96), Some(96), Some(94)], 95);

        for _ in 0..4 {
            context.tick();
        }

        // 90 holds, 96 lights, the second 96 toggles off, 94 forces off.
        assert_eq!(indicator.calls(), vec![true, false, false]);
        assert!(!context.lit());
    }

    #[test]
    fn test_alarm_blinks_while_tripped() {
        let samples: Vec<Option<i64>> = std::iter::repeat(Some(100)).take(6).collect();
        let (mut context, indicator, _tx) = alarm_fixture(&samples, 95);

        for _ in 0..6 {
            context.tick();
        }

        assert_eq!(indicator.calls(), vec![true, false, true, false, true, false]);
    }

    #[test]
    fn test_alarm_release_lands_in_either_phase() {
        // Release arrives while the blink is in its off phase; the
        // indicator is still driven off again.
        let (mut context, indicator, _tx) = alarm_fixture(&[Some(96), Some(96), Some(94)], 95);

        for _ in 0..3 {
            context.tick();
        }

        assert_eq!(indicator.calls(), vec![true, false, false]);
    }

    #[test]
    fn test_alarm_skips_missing_sample() {
        let (mut context, indicator, _tx) = alarm_fixture(&[Some(96), None, Some(96)], 95);

        context.tick();
        assert!(context.lit());

        // The outage leaves the blink phase where it was.
        context.tick();
        assert!(context.lit());

        context.tick();
        assert_eq!(indicator.calls(), vec![true, false]);
    }

    #[test]
    fn test_alarm_follows_limit_updates() {
        let (mut context, indicator, limit_tx) = alarm_fixture(&[Some(90), Some(90)], 95);

        context.tick();
        assert!(indicator.calls().is_empty());

        // A lower limit published by the cooler loop trips the alarm on
        // the same temperature.
        limit_tx.send(85).unwrap();
        context.tick();
        assert_eq!(indicator.calls(), vec![true]);
        assert!(context.lit());
    }
}
