//! ATmega32 I/O port register file.
//!
//! Each of the four ports has a data direction latch (DDRx) and an output
//! latch (PORTx); the PINx value is computed on read.
//!
//! A PIN read merges the tester's own output latches with whatever the
//! outside world presents on the input pins.

use crate::hal::{Level, PhysicalPin, Port};

/// DDR and PORT latches for ports A–D
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atmega32Ports {
    ddr: [u8; 4],
    port: [u8; 4],
}

impl Atmega32Ports {
    /// All pins tri-stated (DDR = 0, PORT = 0), as after reset.
    pub fn new() -> Self {
        Atmega32Ports { ddr: [0; 4], port: [0; 4] }
    }

    pub fn ddr(&self, port: Port) -> u8 {
        self.ddr[port.index()]
    }

    pub fn port(&self, port: Port) -> u8 {
        self.port[port.index()]
    }

    pub fn set_ddr(&mut self, port: Port, value: u8) {
        self.ddr[port.index()] = value;
    }

    pub fn set_port(&mut self, port: Port, value: u8) {
        self.port[port.index()] = value;
    }

    /// Write a bit in PORTx
    pub fn write_bit(&mut self, pin: PhysicalPin, level: Level) {
        let val = self.port(pin.port);
        let new_val = if level.is_high() {
            val | pin.mask()
        } else {
            val & !pin.mask()
        };
        self.set_port(pin.port, new_val);
    }

    /// PINx value: output pins (DDRx bit = 1) return PORTx,
    /// input pins (DDRx bit = 0) return `external`.
    pub fn pin(&self, port: Port, external: u8) -> u8 {
        let ddr = self.ddr(port);
        (self.port(port) & ddr) | (external & !ddr)
    }

    /// Level the tester is driving onto `pin`, or `None` when it is an input.
    pub fn driven_level(&self, pin: PhysicalPin) -> Option<Level> {
        if self.ddr(pin.port) & pin.mask() != 0 {
            Some(Level::from(self.port(pin.port) & pin.mask() != 0))
        } else {
            None
        }
    }

    /// True when `pin` is an input with its internal pull-up enabled.
    pub fn pull_up(&self, pin: PhysicalPin) -> bool {
        let m = pin.mask();
        self.ddr(pin.port) & m == 0 && self.port(pin.port) & m != 0
    }

    /// One-line register dump for diagnostics
    pub fn dump_io(&self) -> String {
        Port::ALL
            .iter()
            .map(|&p| {
                format!("DDR{0}={1:02X} PORT{0}={2:02X}", p.letter(), self.ddr(p), self.port(p))
            })
            .collect::<Vec<_>>()
            .join("  ")
    }
}

impl Default for Atmega32Ports {
    fn default() -> Self {
        Self::new()
    }
}
