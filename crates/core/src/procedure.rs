//! Test procedure state machine.
//!
//! One generic procedure runs every model; the per-model differences live in
//! a [`TestPlan`]. The procedure stops at the first mismatch.
//!
//! ```text
//! Init → Configuring → [PresenceCheck] → Applying(i) → Settling → Sampling → Comparing
//!             ↑                               ↑                                  │
//!             └──── (reconfigure every step) ─┴──────────── next step ───────────┤
//!                                                                  mismatch → Fail
//!                                                                 exhausted → Pass
//! ```

use crate::expected;
use crate::hal::{Delay, GpioBank};
use crate::model::ChipModel;
use crate::pinmap::PinRoleMap;
use crate::stimulus::{Step, StimulusSequence};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// Result of one model's test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestOutcome {
    Match,
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureState {
    Init,
    Configuring,
    PresenceCheck,
    Applying(usize),
    Settling,
    Sampling,
    Comparing,
    Pass,
    Fail,
}

impl ProcedureState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcedureState::Pass | ProcedureState::Fail)
    }
}

/// When the pin map is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurePolicy {
    /// Before every step
    EveryStep,
    /// Once, before the presence check
    Once,
}

/// Everything model-specific about a test
#[derive(Debug, Clone)]
pub struct TestPlan {
    pub model: ChipModel,
    pub pins: PinRoleMap,
    pub stimuli: StimulusSequence,
    pub policy: ConfigurePolicy,
    /// Response required before the first step
    pub presence: Option<u16>,
}

impl TestPlan {
    pub fn for_model(model: ChipModel) -> Self {
        let policy = match model {
            ChipModel::Sn74s138n | ChipModel::Sn74260 => ConfigurePolicy::EveryStep,
            ChipModel::Sn74s133 => ConfigurePolicy::Once,
        };
        TestPlan {
            model,
            pins: PinRoleMap::for_model(model),
            stimuli: StimulusSequence::for_model(model),
            policy,
            presence: expected::presence(model),
        }
    }

    pub fn expected(&self, index: usize, step: Step) -> u16 {
        expected::expected(self.model, &self.pins, index, step)
    }

    /// Enable-line levels for a step, `None` to leave them at idle.
    fn enables(&self, step: Step) -> Option<u8> {
        match (self.model, step) {
            (ChipModel::Sn74s133, Step::Stimulate(_)) => Some(0x01),
            (ChipModel::Sn74s133, Step::ResetAndVerify) => Some(0x00),
            _ => None,
        }
    }
}

/// Where a test failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailPoint {
    Presence,
    Step(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub at: FailPoint,
    pub expected: u16,
    pub actual: u16,
}

/// Summary of a finished procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureReport {
    pub model: ChipModel,
    pub outcome: TestOutcome,
    /// Number of steps driven onto the pins
    pub applied: usize,
    pub mismatch: Option<Mismatch>,
}

pub struct TestProcedure<'a, G: GpioBank + ?Sized, D: Delay + ?Sized> {
    plan: TestPlan,
    gpio: &'a mut G,
    delay: &'a mut D,
    settle: Duration,
    state: ProcedureState,
    current: Option<(usize, Step)>,
    next_index: usize,
    presence_done: bool,
    actual: u16,
    applied: usize,
    mismatch: Option<Mismatch>,
}

impl<'a, G: GpioBank + ?Sized, D: Delay + ?Sized> TestProcedure<'a, G, D> {
    pub fn new(plan: TestPlan, gpio: &'a mut G, delay: &'a mut D, settle: Duration) -> Self {
        TestProcedure {
            plan,
            gpio,
            delay,
            settle,
            state: ProcedureState::Init,
            current: None,
            next_index: 0,
            presence_done: false,
            actual: 0,
            applied: 0,
            mismatch: None,
        }
    }

    pub fn state(&self) -> ProcedureState {
        self.state
    }

    fn pull_step(&mut self) -> Option<(usize, Step)> {
        let step = self.plan.stimuli.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some((index, step))
    }

    /// State to go to once `current` holds the step to run next.
    fn after_step_selected(&self) -> ProcedureState {
        match self.current {
            None => ProcedureState::Pass,
            Some((i, _)) => match self.plan.policy {
                ConfigurePolicy::EveryStep => ProcedureState::Configuring,
                ConfigurePolicy::Once => ProcedureState::Applying(i),
            },
        }
    }

    /// Perform one transition and return the new state.
    pub fn step(&mut self) -> ProcedureState {
        let next = match self.state {
            ProcedureState::Init => {
                self.plan.stimuli.restart();
                self.current = self.pull_step();
                ProcedureState::Configuring
            }
            ProcedureState::Configuring => {
                self.plan.pins.configure(&mut *self.gpio);
                if self.plan.presence.is_some() && !self.presence_done {
                    ProcedureState::PresenceCheck
                } else {
                    match self.current {
                        Some((i, _)) => ProcedureState::Applying(i),
                        None => ProcedureState::Pass,
                    }
                }
            }
            ProcedureState::PresenceCheck => {
                self.presence_done = true;
                self.delay.wait(self.settle);
                let actual = self.plan.pins.sample(&mut *self.gpio);
                let expected = self.plan.presence.unwrap_or(actual);
                if actual != expected {
                    self.mismatch = Some(Mismatch { at: FailPoint::Presence, expected, actual });
                    ProcedureState::Fail
                } else {
                    match self.current {
                        Some((i, _)) => ProcedureState::Applying(i),
                        None => ProcedureState::Pass,
                    }
                }
            }
            ProcedureState::Applying(i) => {
                if let Some((_, step)) = self.current {
                    let pattern = step.pattern(self.plan.pins.input_width());
                    self.plan.pins.drive(&mut *self.gpio, pattern, self.plan.enables(step));
                    self.applied += 1;
                    trace!(model = %self.plan.model, index = i, ?step, "applied");
                }
                ProcedureState::Settling
            }
            ProcedureState::Settling => {
                self.delay.wait(self.settle);
                ProcedureState::Sampling
            }
            ProcedureState::Sampling => {
                self.actual = self.plan.pins.sample(&mut *self.gpio);
                ProcedureState::Comparing
            }
            ProcedureState::Comparing => match self.current {
                Some((i, step)) => {
                    let expected = self.plan.expected(i, step);
                    if self.actual != expected {
                        self.mismatch = Some(Mismatch {
                            at: FailPoint::Step(i),
                            expected,
                            actual: self.actual,
                        });
                        ProcedureState::Fail
                    } else {
                        self.current = self.pull_step();
                        self.after_step_selected()
                    }
                }
                None => ProcedureState::Pass,
            },
            terminal @ (ProcedureState::Pass | ProcedureState::Fail) => terminal,
        };
        if next != self.state {
            trace!(model = %self.plan.model, from = ?self.state, to = ?next, "transition");
        }
        self.state = next;
        next
    }

    /// Run to a terminal state.
    pub fn run(mut self) -> ProcedureReport {
        while !self.step().is_terminal() {}
        let outcome = if self.state == ProcedureState::Pass {
            TestOutcome::Match
        } else {
            TestOutcome::NoMatch
        };
        match &self.mismatch {
            Some(m) => debug!(
                model = %self.plan.model,
                at = ?m.at,
                expected = m.expected,
                actual = m.actual,
                "no match"
            ),
            None => debug!(model = %self.plan.model, steps = self.applied, "match"),
        }
        ProcedureReport {
            model: self.plan.model,
            outcome,
            applied: self.applied,
            mismatch: self.mismatch,
        }
    }
}

/// Run the full test for `model`.
pub fn run_test<G: GpioBank + ?Sized, D: Delay + ?Sized>(
    model: ChipModel,
    gpio: &mut G,
    delay: &mut D,
    settle: Duration,
) -> ProcedureReport {
    TestProcedure::new(TestPlan::for_model(model), gpio, delay, settle).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::{Sn74ls260, Sn74s133, Sn74s138};
    use crate::hal::{Level, PhysicalPin, Port};
    use crate::socket::{ChipPins, SocketDevice, ZifSocket};

    /// Delay that only accumulates the requested time
    #[derive(Default)]
    struct NoDelay {
        total: Duration,
        calls: usize,
    }

    impl Delay for NoDelay {
        fn wait(&mut self, d: Duration) {
            self.total += d;
            self.calls += 1;
        }
    }

    const SETTLE: Duration = Duration::from_millis(20);

    /// Socket that inverts every sampled port from the `corrupt_at`-th sample on.
    struct Faulty {
        inner: ZifSocket,
        reads: usize,
        reads_per_sample: usize,
        corrupt_at: usize,
    }

    impl GpioBank for Faulty {
        fn set_direction(&mut self, port: Port, mask: u8) {
            self.inner.set_direction(port, mask)
        }
        fn write(&mut self, pin: PhysicalPin, level: Level) {
            self.inner.write(pin, level)
        }
        fn write_port(&mut self, port: Port, value: u8) {
            self.inner.write_port(port, value)
        }
        fn read_port(&mut self, port: Port) -> u8 {
            let sample = self.reads / self.reads_per_sample;
            self.reads += 1;
            let v = self.inner.read_port(port);
            if sample >= self.corrupt_at { !v } else { v }
        }
    }

    /// Holds its only output low whenever powered
    struct StuckLow;

    impl SocketDevice for StuckLow {
        fn part_number(&self) -> &'static str {
            "STUCK"
        }

        fn pin_count(&self) -> u8 {
            16
        }

        fn output_pins(&self) -> &'static [u8] {
            &[9]
        }

        fn evaluate(&self, _pins: &ChipPins) -> Vec<Level> {
            vec![Level::Low]
        }
    }

    #[test]
    fn test_138_passes_with_good_chip() {
        let mut socket = ZifSocket::with_device(Box::new(Sn74s138), Level::High);
        let mut delay = NoDelay::default();
        let r = run_test(ChipModel::Sn74s138n, &mut socket, &mut delay, SETTLE);
        assert_eq!(r.outcome, TestOutcome::Match);
        assert_eq!(r.applied, 8);
        assert_eq!(delay.total, SETTLE * 8);
    }

    #[test]
    fn test_260_passes_with_good_chip() {
        let mut socket = ZifSocket::with_device(Box::new(Sn74ls260), Level::High);
        let mut delay = NoDelay::default();
        let r = run_test(ChipModel::Sn74260, &mut socket, &mut delay, SETTLE);
        assert_eq!(r.outcome, TestOutcome::Match);
        assert_eq!(r.applied, 32);
    }

    #[test]
    fn test_133_passes_with_good_chip() {
        let mut socket = ZifSocket::with_device(Box::new(Sn74s133), Level::High);
        let mut delay = NoDelay::default();
        let r = run_test(ChipModel::Sn74s133, &mut socket, &mut delay, SETTLE);
        assert_eq!(r.outcome, TestOutcome::Match, "{:?}", r.mismatch);
        assert_eq!(r.applied, 14);
        // Presence settle plus one per step
        assert_eq!(delay.calls, 15);
    }

    #[test]
    fn test_133_final_forced_state_must_go_low() {
        // Empty socket passes the presence check and every single-line step
        // but never pulls the output low
        let mut socket = ZifSocket::new(Level::High);
        let mut delay = NoDelay::default();
        let r = run_test(ChipModel::Sn74s133, &mut socket, &mut delay, SETTLE);
        assert_eq!(r.outcome, TestOutcome::NoMatch);
        assert_eq!(r.applied, 14);
        assert_eq!(r.mismatch.map(|m| m.at), Some(FailPoint::Step(13)));
    }

    #[test]
    fn test_133_presence_failure_applies_nothing() {
        let mut socket = ZifSocket::with_device(Box::new(StuckLow), Level::High);
        let mut delay = NoDelay::default();
        let r = run_test(ChipModel::Sn74s133, &mut socket, &mut delay, SETTLE);
        assert_eq!(r.outcome, TestOutcome::NoMatch);
        assert_eq!(r.applied, 0);
        assert_eq!(r.mismatch, Some(Mismatch { at: FailPoint::Presence, expected: 1, actual: 0 }));
    }

    #[test]
    fn test_short_circuit_after_injected_mismatch() {
        // Each 138 sample reads port C (Y7) and port A (Y0..Y6)
        for k in 0..8 {
            let mut gpio = Faulty {
                inner: ZifSocket::with_device(Box::new(Sn74s138), Level::High),
                reads: 0,
                reads_per_sample: 2,
                corrupt_at: k,
            };
            let mut delay = NoDelay::default();
            let r = run_test(ChipModel::Sn74s138n, &mut gpio, &mut delay, SETTLE);
            assert_eq!(r.outcome, TestOutcome::NoMatch);
            assert_eq!(r.applied, k + 1, "mismatch injected at step {}", k);
            assert_eq!(r.mismatch.map(|m| m.at), Some(FailPoint::Step(k)));
        }
    }

    #[test]
    fn test_state_sequence_for_first_step() {
        let mut socket = ZifSocket::with_device(Box::new(Sn74s138), Level::High);
        let mut delay = NoDelay::default();
        let plan = TestPlan::for_model(ChipModel::Sn74s138n);
        let mut p = TestProcedure::new(plan, &mut socket, &mut delay, SETTLE);
        assert_eq!(p.state(), ProcedureState::Init);
        let seen: Vec<ProcedureState> = (0..7).map(|_| p.step()).collect();
        assert_eq!(
            seen,
            vec![
                ProcedureState::Configuring,
                ProcedureState::Applying(0),
                ProcedureState::Settling,
                ProcedureState::Sampling,
                ProcedureState::Comparing,
                ProcedureState::Configuring,
                ProcedureState::Applying(1),
            ]
        );
    }

    #[test]
    fn test_133_configures_once() {
        let mut socket = ZifSocket::with_device(Box::new(Sn74s133), Level::High);
        let mut delay = NoDelay::default();
        let plan = TestPlan::for_model(ChipModel::Sn74s133);
        let mut p = TestProcedure::new(plan, &mut socket, &mut delay, SETTLE);
        let mut configuring = 0;
        loop {
            let s = p.step();
            if s == ProcedureState::Configuring {
                configuring += 1;
            }
            if s.is_terminal() {
                assert_eq!(s, ProcedureState::Pass);
                break;
            }
        }
        assert_eq!(configuring, 1);
    }
}
