//! 16-pin ZIF test socket wired to ports A and C.
//!
//! Socket pins 1–8 (left row, top to bottom) go to PC0–PC7 and socket pins
//! 9–16 (right row, bottom to top) go to PA7–PA0, so a 16-pin chip has its
//! GND on PC7 and VCC on PA0. 14-pin chips are seated with pin 1 in socket
//! pin 1; their upper row lands on socket pins 10–16 and socket pins 8 and 9
//! stay empty.
//!
//! The socket implements [`GpioBank`]: every PIN read evaluates the inserted
//! device from the levels the tester currently drives onto its pins.

use crate::hal::{GpioBank, Level, PhysicalPin, Port};
use crate::ports::Atmega32Ports;

/// Number of contacts on the socket
pub const SOCKET_PINS: u8 = 16;

/// Physical port pin behind a socket contact (1-based).
pub fn socket_pin(n: u8) -> Option<PhysicalPin> {
    match n {
        1..=8 => Some(PhysicalPin::new(Port::C, n - 1)),
        9..=16 => Some(PhysicalPin::new(Port::A, 16 - n)),
        _ => None,
    }
}

/// Socket contact that a chip pin sits in, for a chip of `pin_count` pins.
pub fn chip_to_socket(chip_pin: u8, pin_count: u8) -> Option<u8> {
    if chip_pin == 0 || chip_pin > pin_count || pin_count > SOCKET_PINS || pin_count % 2 != 0 {
        return None;
    }
    if chip_pin <= pin_count / 2 {
        Some(chip_pin)
    } else {
        Some(chip_pin + (SOCKET_PINS - pin_count))
    }
}

/// Levels seen at every pin of an inserted chip, indexed by chip pin number.
#[derive(Debug, Clone)]
pub struct ChipPins {
    levels: [Level; SOCKET_PINS as usize + 1],
}

impl ChipPins {
    pub fn get(&self, chip_pin: u8) -> Level {
        self.levels.get(chip_pin as usize).copied().unwrap_or(Level::High)
    }

    pub fn is_high(&self, chip_pin: u8) -> bool {
        self.get(chip_pin).is_high()
    }

    /// Build from a closure giving the level at each chip pin.
    pub fn from_fn(pin_count: u8, f: impl Fn(u8) -> Level) -> Self {
        let mut levels = [Level::High; SOCKET_PINS as usize + 1];
        for n in 1..=pin_count.min(SOCKET_PINS) {
            levels[n as usize] = f(n);
        }
        ChipPins { levels }
    }
}

/// A chip that can be dropped into the socket.
pub trait SocketDevice {
    /// Marking printed on the package
    fn part_number(&self) -> &'static str;

    /// 14 or 16
    fn pin_count(&self) -> u8;

    /// Chip pins that the device drives, in the order [`evaluate`](Self::evaluate) returns them
    fn output_pins(&self) -> &'static [u8];

    fn vcc_pin(&self) -> u8 {
        self.pin_count()
    }

    fn gnd_pin(&self) -> u8 {
        self.pin_count() / 2
    }

    /// Output levels for the current pin levels. Only called while powered.
    fn evaluate(&self, pins: &ChipPins) -> Vec<Level>;
}

/// Test socket on the ATmega32 ports with an optional inserted device
pub struct ZifSocket {
    ports: Atmega32Ports,
    device: Option<Box<dyn SocketDevice>>,
    /// Level an undriven, un-pulled-up input floats to
    idle_level: Level,
}

impl ZifSocket {
    pub fn new(idle_level: Level) -> Self {
        ZifSocket { ports: Atmega32Ports::new(), device: None, idle_level }
    }

    pub fn with_device(device: Box<dyn SocketDevice>, idle_level: Level) -> Self {
        let mut socket = ZifSocket::new(idle_level);
        socket.insert(device);
        socket
    }

    /// Insert a chip, returning whatever was in the socket before.
    pub fn insert(&mut self, device: Box<dyn SocketDevice>) -> Option<Box<dyn SocketDevice>> {
        self.device.replace(device)
    }

    pub fn remove(&mut self) -> Option<Box<dyn SocketDevice>> {
        self.device.take()
    }

    pub fn device(&self) -> Option<&dyn SocketDevice> {
        self.device.as_deref()
    }

    pub fn ports(&self) -> &Atmega32Ports {
        &self.ports
    }

    pub fn idle_level(&self) -> Level {
        self.idle_level
    }

    pub fn set_idle_level(&mut self, level: Level) {
        self.idle_level = level;
    }

    /// Level the tester drives at the socket contact a chip pin sits in.
    fn driven_at(&self, chip_pin: u8, pin_count: u8) -> Option<Level> {
        chip_to_socket(chip_pin, pin_count)
            .and_then(socket_pin)
            .and_then(|p| self.ports.driven_level(p))
    }

    /// Levels presented to the input side of every port pin.
    fn external_levels(&self) -> [u8; 4] {
        let mut ext = [0u8; 4];
        for port in Port::ALL {
            for bit in 0..8 {
                let pin = PhysicalPin::new(port, bit);
                let high = self.ports.pull_up(pin) || self.idle_level.is_high();
                if high {
                    ext[port.index()] |= pin.mask();
                }
            }
        }

        let dev = match self.device.as_deref() {
            Some(d) => d,
            None => return ext,
        };
        let count = dev.pin_count();
        let powered = self.driven_at(dev.vcc_pin(), count) == Some(Level::High)
            && self.driven_at(dev.gnd_pin(), count) == Some(Level::Low);
        if !powered {
            return ext;
        }

        // Undriven TTL inputs float high
        let pins = ChipPins::from_fn(count, |n| self.driven_at(n, count).unwrap_or(Level::High));
        let outputs = dev.evaluate(&pins);
        for (&chip_pin, &level) in dev.output_pins().iter().zip(outputs.iter()) {
            if let Some(pin) = chip_to_socket(chip_pin, count).and_then(socket_pin) {
                let byte = &mut ext[pin.port.index()];
                if level.is_high() {
                    *byte |= pin.mask();
                } else {
                    *byte &= !pin.mask();
                }
            }
        }
        ext
    }
}

impl GpioBank for ZifSocket {
    fn set_direction(&mut self, port: Port, output_mask: u8) {
        self.ports.set_ddr(port, output_mask);
    }

    fn write(&mut self, pin: PhysicalPin, level: Level) {
        self.ports.write_bit(pin, level);
    }

    fn write_port(&mut self, port: Port, value: u8) {
        self.ports.set_port(port, value);
    }

    fn read_port(&mut self, port: Port) -> u8 {
        let ext = self.external_levels();
        self.ports.pin(port, ext[port.index()])
    }
}
