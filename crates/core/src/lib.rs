//! # ic-tester-core
//!
//! Logic-IC identification engine for a button-triggered ATmega32 tester.
//!
//! A chip sits in a 16-pin ZIF socket wired to ports A and C. Pressing the
//! button tries each supported model in turn: configure the pins, drive a
//! stimulus sequence, wait for the outputs to settle, compare against the
//! model's truth function. The first model that matches every step is shown
//! on the 16×2 LCD; if none does the LCD shows `NO MATCH`.
//!
//! | Model     | Pins | Stimuli                          | Pass condition                    |
//! |-----------|------|----------------------------------|-----------------------------------|
//! | SN74S138N | 16   | 3-bit count 0..8                 | one low output at the address     |
//! | SN74LS260 | 14   | 5-bit count 0..32 on both gates  | both outputs high only for 0      |
//! | SN74S133  | 16   | presence, line walk, all-high    | output high until all inputs high |
//!
//! ## Architecture
//!
//! - [`hal`]: GPIO bank, delay, display and trigger capabilities
//! - [`pinmap`]: Declarative pin-role table per [`ChipModel`]
//! - [`stimulus`] / [`expected`]: Stimulus sequences and truth functions
//! - [`procedure`]: Generic test state machine driven by a [`TestPlan`]
//! - [`dispatcher`]: Priority-ordered model search
//! - [`tester`]: Button debounce and the main loop
//! - [`ports`] / [`socket`] / [`chips`]: Emulated ATmega32 ports, test socket and chips
//! - [`lcd`]: 16×2 character LCD with a pixel framebuffer
//! - [`trace`]: GPIO access recording and trace files

pub mod hal;
pub mod ports;
pub mod socket;
pub mod chips;
pub mod model;
pub mod pinmap;
pub mod stimulus;
pub mod expected;
pub mod procedure;
pub mod dispatcher;
pub mod config;
pub mod tester;
pub mod lcd;
pub mod trace;

pub use config::TesterConfig;
pub use dispatcher::{DispatchReport, Dispatcher, Identification, NO_MATCH_TEXT};
pub use hal::{
    ButtonLine, Delay, GpioBank, Level, PhysicalPin, Port, StdDelay, TextDisplay, Trigger,
};
pub use lcd::CharLcd;
pub use model::ChipModel;
pub use pinmap::PinRoleMap;
pub use procedure::{run_test, ProcedureReport, TestOutcome, TestPlan, TestProcedure};
pub use socket::{SocketDevice, ZifSocket};
pub use tester::Tester;
pub use trace::{GpioOp, RecordingBank, RunTrace, TraceError};

/// Wait between driving a stimulus and sampling, in ms
pub const SETTLE_MS: u32 = 20;
/// Gap between the two button samples, in ms
pub const DEBOUNCE_MS: u32 = 50;
/// Main loop idle interval, in ms
pub const POLL_MS: u32 = 10;
