//! Hysteretic decision logic for the cooling stage and the over-temperature
//! alarm.
//!
//! Both controllers share the same state and action vocabulary but apply
//! different transition tables. Two properties matter to callers: the
//! cooler never reaches [`ControlState::AtLimit`], and the alarm makes no
//! action assignment while it sits at the limit, so the previous `TurnOn`
//! keeps being observed tick after tick. The daemon's alarm loop turns that
//! repeated observation into an indicator blink.

use crate::Parameters;

/// Controller position in the hysteresis cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Temperature considered in range.
    Normal,

    /// Actuation engaged, waiting for the release condition.
    Elevated,

    /// Threshold crossed. Only the alarm controller ever enters this state.
    AtLimit,
}

impl ControlState {
    /// Lower-case state name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::AtLimit => "at-limit",
        }
    }
}

/// Actuation request produced by a controller tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// No actuator call this tick.
    #[default]
    None,

    /// Engage the actuator.
    TurnOn,

    /// Release the actuator.
    TurnOff,
}

// ============================================================================
// Cooler
// ============================================================================

/// Cooling stage controller.
///
/// Engages when the temperature climbs past `setpoint + deadband`, releases
/// once it falls below `setpoint - deadband`. The gap of `2 * deadband`
/// keeps the stage from short-cycling around the setpoint.
#[derive(Debug)]
pub struct CoolerStateMachine {
    state: ControlState,
    action: Action,
}

impl CoolerStateMachine {
    pub fn new() -> Self {
        Self {
            state: ControlState::Normal,
            action: Action::None,
        }
    }

    /// Current controller state.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Action decided by the most recent tick.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Advances the controller by one sample and returns the action to
    /// apply this tick.
    pub fn tick(&mut self, temperature: i64, params: &Parameters) -> Action {
        match self.state {
            ControlState::Normal => {
                if temperature > params.setpoint + params.deadband {
                    self.action = Action::TurnOn;
                    self.state = ControlState::Elevated;
                } else {
                    self.action = Action::None;
                }
            }
            // Nothing above transitions into AtLimit; if a caller ever
            // forces the state, the same release check applies.
            ControlState::Elevated | ControlState::AtLimit => {
                if temperature < params.setpoint - params.deadband {
                    self.action = Action::TurnOff;
                    self.state = ControlState::Normal;
                } else {
                    self.action = Action::None;
                }
            }
        }
        self.action
    }
}

impl Default for CoolerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Alarm
// ============================================================================

/// Over-temperature alarm controller.
///
/// Trips when the temperature exceeds the limit, releases once it drops
/// back below. While tripped with the release condition false, `tick`
/// assigns nothing, so the caller sees the previous action again (normally
/// `TurnOn`); the daemon's indicator driver builds its blink on that
/// repeated observation.
#[derive(Debug)]
pub struct AlarmStateMachine {
    state: ControlState,
    action: Action,
}

impl AlarmStateMachine {
    pub fn new() -> Self {
        Self {
            state: ControlState::Normal,
            action: Action::None,
        }
    }

    /// Current controller state.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// Action decided by (or retained through) the most recent tick.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Advances the controller by one sample against the most recently
    /// published limit and returns the action observed this tick.
    pub fn tick(&mut self, temperature: i64, limit: i64) -> Action {
        match self.state {
            // Elevated checks the same trip condition as Normal; it only
            // exists as the release target of AtLimit.
            ControlState::Normal | ControlState::Elevated => {
                if temperature > limit {
                    self.action = Action::TurnOn;
                    self.state = ControlState::AtLimit;
                } else {
                    self.action = Action::None;
                }
            }
            ControlState::AtLimit => {
                if temperature < limit {
                    self.action = Action::TurnOff;
                    self.state = ControlState::Elevated;
                }
                // Release condition false: no assignment, the previous
                // action stays observable.
            }
        }
        self.action
    }
}

impl Default for AlarmStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_params() -> Parameters {
        Parameters::new(65, 95, 1)
    }

    // ------------------------------------------------------------------
    // Cooler
    // ------------------------------------------------------------------

    #[test]
    fn test_cooler_engage_release_sequence() {
        let params = default_params();
        let mut cooler = CoolerStateMachine::new();

        // 64: within band, nothing happens.
        assert_eq!(cooler.tick(64, &params), Action::None);
        assert_eq!(cooler.state(), ControlState::Normal);

        // 67: above setpoint + deadband, engage.
        assert_eq!(cooler.tick(67, &params), Action::TurnOn);
        assert_eq!(cooler.state(), ControlState::Elevated);

        // 63: below setpoint - deadband, release.
        assert_eq!(cooler.tick(63, &params), Action::TurnOff);
        assert_eq!(cooler.state(), ControlState::Normal);
    }

    #[test]
    fn test_cooler_engage_threshold_is_strict() {
        let params = default_params();
        let mut cooler = CoolerStateMachine::new();

        // setpoint + deadband exactly: not above, stays Normal.
        assert_eq!(cooler.tick(66, &params), Action::None);
        assert_eq!(cooler.state(), ControlState::Normal);

        assert_eq!(cooler.tick(67, &params), Action::TurnOn);
    }

    #[test]
    fn test_cooler_holds_inside_hysteresis_gap() {
        let params = default_params();
        let mut cooler = CoolerStateMachine::new();

        assert_eq!(cooler.tick(70, &params), Action::TurnOn);

        // Anything in [setpoint - deadband, setpoint + deadband] keeps the
        // stage engaged and emits no fresh action.
        for sample in [66, 65, 64] {
            assert_eq!(cooler.tick(sample, &params), Action::None);
            assert_eq!(cooler.state(), ControlState::Elevated);
        }

        assert_eq!(cooler.tick(63, &params), Action::TurnOff);
    }

    #[test]
    fn test_cooler_emits_none_every_held_tick() {
        // Unlike the alarm, the cooler assigns None explicitly while
        // holding, so repeated held ticks never replay the TurnOn.
        let params = default_params();
        let mut cooler = CoolerStateMachine::new();

        assert_eq!(cooler.tick(80, &params), Action::TurnOn);
        assert_eq!(cooler.tick(80, &params), Action::None);
        assert_eq!(cooler.tick(80, &params), Action::None);
        assert_eq!(cooler.action(), Action::None);
    }

    #[test]
    fn test_cooler_at_limit_behaves_like_elevated() {
        let params = default_params();
        let mut cooler = CoolerStateMachine {
            state: ControlState::AtLimit,
            action: Action::None,
        };

        assert_eq!(cooler.tick(70, &params), Action::None);
        assert_eq!(cooler.state(), ControlState::AtLimit);

        assert_eq!(cooler.tick(63, &params), Action::TurnOff);
        assert_eq!(cooler.state(), ControlState::Normal);
    }

    #[test]
    fn test_cooler_never_reaches_at_limit() {
        let params = default_params();
        let mut cooler = CoolerStateMachine::new();

        for sample in [60, 70, 80, 90, 100, 64, 50, 120, 63, 200] {
            let _ = cooler.tick(sample, &params);
            assert_ne!(cooler.state(), ControlState::AtLimit);
        }
    }

    #[test]
    fn test_cooler_respects_live_parameter_changes() {
        let mut cooler = CoolerStateMachine::new();

        assert_eq!(cooler.tick(70, &Parameters::new(65, 95, 1)), Action::TurnOn);

        // Raising the setpoint mid-flight moves the release threshold.
        let raised = Parameters::new(80, 95, 1);
        assert_eq!(cooler.tick(78, &raised), Action::TurnOff);
        assert_eq!(cooler.state(), ControlState::Normal);
    }

    // ------------------------------------------------------------------
    // Alarm
    // ------------------------------------------------------------------

    #[test]
    fn test_alarm_trip_retain_release_sequence() {
        let mut alarm = AlarmStateMachine::new();

        assert_eq!(alarm.tick(90, 95), Action::None);
        assert_eq!(alarm.state(), ControlState::Normal);

        assert_eq!(alarm.tick(96, 95), Action::TurnOn);
        assert_eq!(alarm.state(), ControlState::AtLimit);

        // Still at limit: no assignment, the TurnOn is observed again.
        assert_eq!(alarm.tick(96, 95), Action::TurnOn);
        assert_eq!(alarm.state(), ControlState::AtLimit);

        assert_eq!(alarm.tick(94, 95), Action::TurnOff);
        assert_eq!(alarm.state(), ControlState::Elevated);
    }

    #[test]
    fn test_alarm_retains_action_indefinitely_at_limit() {
        let mut alarm = AlarmStateMachine::new();
        assert_eq!(alarm.tick(100, 95), Action::TurnOn);

        for _ in 0..10 {
            assert_eq!(alarm.tick(100, 95), Action::TurnOn);
        }
    }

    #[test]
    fn test_alarm_boundary_holds_at_exact_limit() {
        let mut alarm = AlarmStateMachine::new();

        // Trip requires strictly above the limit.
        assert_eq!(alarm.tick(95, 95), Action::None);
        assert_eq!(alarm.state(), ControlState::Normal);

        assert_eq!(alarm.tick(96, 95), Action::TurnOn);

        // Release requires strictly below; an exact hit retains TurnOn.
        assert_eq!(alarm.tick(95, 95), Action::TurnOn);
        assert_eq!(alarm.state(), ControlState::AtLimit);
    }

    #[test]
    fn test_alarm_retrips_from_elevated() {
        let mut alarm = AlarmStateMachine::new();

        assert_eq!(alarm.tick(96, 95), Action::TurnOn);
        assert_eq!(alarm.tick(94, 95), Action::TurnOff);
        assert_eq!(alarm.state(), ControlState::Elevated);

        // Elevated trips on the same condition Normal does.
        assert_eq!(alarm.tick(97, 95), Action::TurnOn);
        assert_eq!(alarm.state(), ControlState::AtLimit);
    }

    #[test]
    fn test_alarm_elevated_below_limit_emits_none() {
        let mut alarm = AlarmStateMachine::new();
        assert_eq!(alarm.tick(96, 95), Action::TurnOn);
        assert_eq!(alarm.tick(94, 95), Action::TurnOff);

        assert_eq!(alarm.tick(90, 95), Action::None);
        assert_eq!(alarm.state(), ControlState::Elevated);
    }

    #[test]
    fn test_alarm_follows_published_limit_changes() {
        let mut alarm = AlarmStateMachine::new();

        assert_eq!(alarm.tick(90, 95), Action::None);

        // The limit the operator lowered arrives with the next handoff.
        assert_eq!(alarm.tick(90, 85), Action::TurnOn);
        assert_eq!(alarm.state(), ControlState::AtLimit);

        assert_eq!(alarm.tick(80, 85), Action::TurnOff);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ControlState::Normal.name(), "normal");
        assert_eq!(ControlState::Elevated.name(), "elevated");
        assert_eq!(ControlState::AtLimit.name(), "at-limit");
    }
}
