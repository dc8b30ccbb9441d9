//! Hardware capabilities the engine is written against.
//!
//! The tester firmware talks to four things outside the test logic: an 8-bit
//! port-style GPIO bank, a text display, a push button and a millisecond delay.
//! Each one is a trait here so the engine can run on the emulated
//! [`ZifSocket`](crate::socket::ZifSocket), a recording wrapper, or test doubles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 8-bit I/O port of the ATmega32
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Port {
    A,
    B,
    C,
    D,
}

impl Port {
    pub const ALL: [Port; 4] = [Port::A, Port::B, Port::C, Port::D];

    pub fn index(self) -> usize {
        match self {
            Port::A => 0,
            Port::B => 1,
            Port::C => 2,
            Port::D => 3,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Port::A => 'A',
            Port::B => 'B',
            Port::C => 'C',
            Port::D => 'D',
        }
    }
}

/// Logic level on a single pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }

    /// Level as a 0/1 bit
    pub fn bit(self) -> u8 {
        self.is_high() as u8
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// One physical pin: port letter plus bit index 0–7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalPin {
    pub port: Port,
    pub bit: u8,
}

impl PhysicalPin {
    pub const fn new(port: Port, bit: u8) -> Self {
        PhysicalPin { port, bit }
    }

    pub fn mask(self) -> u8 {
        1 << self.bit
    }
}

impl fmt::Display for PhysicalPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}{}", self.port.letter(), self.bit)
    }
}

/// Whether the tester drives a pin or senses it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// DDR bit set: the tester drives the pin
    Drive,
    /// DDR bit clear: the tester reads the pin
    Sense,
}

/// Byte-oriented GPIO bank (DDRx / PORTx / PINx).
pub trait GpioBank {
    /// Program a data direction register. Set bits drive, clear bits sense.
    fn set_direction(&mut self, port: Port, output_mask: u8);

    /// Set one bit of a PORT register.
    fn write(&mut self, pin: PhysicalPin, level: Level);

    /// Overwrite a whole PORT register.
    fn write_port(&mut self, port: Port, value: u8);

    /// Read a whole PIN register.
    fn read_port(&mut self, port: Port) -> u8;

    /// Read one bit of a PIN register.
    fn read(&mut self, pin: PhysicalPin) -> Level {
        Level::from(self.read_port(pin.port) & pin.mask() != 0)
    }
}

impl<G: GpioBank + ?Sized> GpioBank for &mut G {
    fn set_direction(&mut self, port: Port, output_mask: u8) {
        (**self).set_direction(port, output_mask)
    }
    fn write(&mut self, pin: PhysicalPin, level: Level) {
        (**self).write(pin, level)
    }
    fn write_port(&mut self, port: Port, value: u8) {
        (**self).write_port(port, value)
    }
    fn read_port(&mut self, port: Port) -> u8 {
        (**self).read_port(port)
    }
    fn read(&mut self, pin: PhysicalPin) -> Level {
        (**self).read(pin)
    }
}

/// Blocking millisecond delay
pub trait Delay {
    fn wait(&mut self, duration: Duration);
}

/// [`Delay`] backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn wait(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Two-line text display (16x2 LCD on the real board)
pub trait TextDisplay {
    fn clear(&mut self);
    fn write(&mut self, text: &str);
}

/// The test button. Returns the raw (undebounced) state, true = pressed.
pub trait Trigger {
    fn is_active(&mut self) -> bool;
}

/// Trigger whose level is set from outside (keyboard, gamepad, script).
#[derive(Debug, Default, Clone, Copy)]
pub struct ButtonLine {
    pressed: bool,
}

impl ButtonLine {
    pub fn new() -> Self {
        ButtonLine { pressed: false }
    }

    pub fn set(&mut self, pressed: bool) {
        self.pressed = pressed;
    }
}

impl Trigger for ButtonLine {
    fn is_active(&mut self) -> bool {
        self.pressed
    }
}
