//! Hardware capability seams for the control loops.
//!
//! The loops are written against these traits; concrete backends live with
//! their runtime (the daemon crate ships a simulated ADC, a file-backed
//! sensor, and a logging indicator).

/// A temperature source sampled once per control tick.
pub trait TemperatureSensor {
    /// Takes one reading. `None` means the sample could not be taken this
    /// tick; callers skip the tick and keep their previous state and
    /// action.
    fn sample(&mut self) -> Option<i64>;
}

/// A binary actuator (cooling stage relay, alarm lamp).
pub trait Indicator {
    /// Drives the actuator fully on or off. The control loop never checks
    /// or retries a drive; failure handling is the backend's business.
    fn set(&mut self, on: bool);
}

impl<S: TemperatureSensor + ?Sized> TemperatureSensor for Box<S> {
    fn sample(&mut self) -> Option<i64> {
        (**self).sample()
    }
}

impl<I: Indicator + ?Sized> Indicator for Box<I> {
    fn set(&mut self, on: bool) {
        (**self).set(on)
    }
}
