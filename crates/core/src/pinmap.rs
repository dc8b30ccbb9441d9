//! Per-model pin-role maps.
//!
//! Each supported chip has a fixed wiring in the socket. The map records
//! which port pin carries which logical role; the engine never refers to a
//! port bit directly.
//!
//! | Model     | DDRC | DDRA | Outputs sensed        |
//! |-----------|------|------|-----------------------|
//! | SN74S138N | 0xBF | 0x01 | PA1–PA7 (Y0–Y6), PC6 (Y7) |
//! | SN74260   | 0x4F | 0x7F | PC4 (1Y), PC5 (2Y)    |
//! | SN74S133  | 0xFF | 0x7F | PA7 (Y)               |

use crate::hal::{Direction, GpioBank, Level, PhysicalPin, Port};
use crate::model::ChipModel;
use serde::{Deserialize, Serialize};

/// Logical function of a socket pin for one model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinRole {
    /// Stimulus bit `n`
    Input(u8),
    /// Response bit `n`
    Output(u8),
    Power,
    Ground,
    /// Enable/control line `line`, held at `idle` by configuration
    Enable { line: u8, idle: Level },
}

impl PinRole {
    pub fn direction(self) -> Direction {
        match self {
            PinRole::Output(_) => Direction::Sense,
            _ => Direction::Drive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    pub pin: PhysicalPin,
    pub role: PinRole,
}

const fn assign(port: Port, bit: u8, role: PinRole) -> PinAssignment {
    PinAssignment { pin: PhysicalPin::new(port, bit), role }
}

/// Reorders a logical truth-table value into response-bit order.
///
/// Entry `b` is the response bit that logical bit `b` lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitPermutation(&'static [u8]);

impl BitPermutation {
    /// Bit `b` of 8 goes to bit `7 - b`
    pub const REVERSE8: BitPermutation = BitPermutation(&[7, 6, 5, 4, 3, 2, 1, 0]);

    pub fn apply(&self, logical: u16) -> u16 {
        self.0
            .iter()
            .enumerate()
            .filter(|&(b, _)| logical & (1 << b) != 0)
            .fold(0, |acc, (_, &to)| acc | (1 << to))
    }
}

/// Static wiring of one chip model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinRoleMap {
    assignments: &'static [PinAssignment],
    permutation: Option<BitPermutation>,
}

const SN74S138N_PINS: &[PinAssignment] = &[
    assign(Port::C, 0, PinRole::Input(0)),
    assign(Port::C, 1, PinRole::Input(1)),
    assign(Port::C, 2, PinRole::Input(2)),
    assign(Port::C, 3, PinRole::Enable { line: 0, idle: Level::Low }),
    assign(Port::C, 4, PinRole::Enable { line: 1, idle: Level::Low }),
    assign(Port::C, 5, PinRole::Enable { line: 2, idle: Level::High }),
    assign(Port::C, 6, PinRole::Output(7)),
    assign(Port::C, 7, PinRole::Ground),
    assign(Port::A, 0, PinRole::Power),
    assign(Port::A, 1, PinRole::Output(0)),
    assign(Port::A, 2, PinRole::Output(1)),
    assign(Port::A, 3, PinRole::Output(2)),
    assign(Port::A, 4, PinRole::Output(3)),
    assign(Port::A, 5, PinRole::Output(4)),
    assign(Port::A, 6, PinRole::Output(5)),
    assign(Port::A, 7, PinRole::Output(6)),
];

// Both NOR gates see the same 5-bit pattern
const SN74260_PINS: &[PinAssignment] = &[
    assign(Port::C, 0, PinRole::Input(0)),
    assign(Port::C, 1, PinRole::Input(1)),
    assign(Port::C, 2, PinRole::Input(2)),
    assign(Port::A, 2, PinRole::Input(3)),
    assign(Port::A, 1, PinRole::Input(4)),
    assign(Port::C, 3, PinRole::Input(0)),
    assign(Port::A, 6, PinRole::Input(1)),
    assign(Port::A, 5, PinRole::Input(2)),
    assign(Port::A, 4, PinRole::Input(3)),
    assign(Port::A, 3, PinRole::Input(4)),
    assign(Port::C, 4, PinRole::Output(0)),
    assign(Port::C, 5, PinRole::Output(1)),
    assign(Port::C, 6, PinRole::Ground),
    assign(Port::A, 0, PinRole::Power),
];

const SN74S133_PINS: &[PinAssignment] = &[
    assign(Port::C, 0, PinRole::Input(0)),
    assign(Port::C, 1, PinRole::Input(1)),
    assign(Port::C, 2, PinRole::Input(2)),
    assign(Port::C, 3, PinRole::Input(3)),
    assign(Port::C, 4, PinRole::Input(4)),
    assign(Port::C, 5, PinRole::Input(5)),
    assign(Port::C, 6, PinRole::Input(6)),
    // Chip GND (pin 8): driving it high unpowers the chip and the output floats
    assign(Port::C, 7, PinRole::Enable { line: 0, idle: Level::Low }),
    assign(Port::A, 0, PinRole::Power),
    assign(Port::A, 1, PinRole::Input(7)),
    assign(Port::A, 2, PinRole::Input(8)),
    assign(Port::A, 3, PinRole::Input(9)),
    assign(Port::A, 4, PinRole::Input(10)),
    assign(Port::A, 5, PinRole::Input(11)),
    assign(Port::A, 6, PinRole::Input(12)),
    assign(Port::A, 7, PinRole::Output(0)),
];

impl PinRoleMap {
    pub fn for_model(model: ChipModel) -> PinRoleMap {
        match model {
            ChipModel::Sn74s138n => PinRoleMap {
                assignments: SN74S138N_PINS,
                permutation: Some(BitPermutation::REVERSE8),
            },
            ChipModel::Sn74260 => PinRoleMap { assignments: SN74260_PINS, permutation: None },
            ChipModel::Sn74s133 => PinRoleMap { assignments: SN74S133_PINS, permutation: None },
        }
    }

    pub fn permutation(&self) -> Option<BitPermutation> {
        self.permutation
    }

    /// Sense pins carrying the response bits set in `mask`, in table order
    pub fn output_pins(&self, mask: u16) -> Vec<PhysicalPin> {
        self.assignments
            .iter()
            .filter_map(|a| match a.role {
                PinRole::Output(n) if mask & (1 << n) != 0 => Some(a.pin),
                _ => None,
            })
            .collect()
    }

    /// Number of distinct stimulus bits
    pub fn input_width(&self) -> u8 {
        self.assignments
            .iter()
            .filter_map(|a| match a.role {
                PinRole::Input(n) => Some(n + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Number of response bits
    pub fn output_width(&self) -> u8 {
        self.assignments
            .iter()
            .filter_map(|a| match a.role {
                PinRole::Output(n) => Some(n + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// DDR value for `port`, or `None` when the model leaves the port alone.
    pub fn direction_mask(&self, port: Port) -> Option<u8> {
        let mut used = false;
        let mut mask = 0u8;
        for a in self.assignments.iter().filter(|a| a.pin.port == port) {
            used = true;
            if a.role.direction() == Direction::Drive {
                mask |= a.pin.mask();
            }
        }
        used.then_some(mask)
    }

    /// First physical pin that appears twice, if any.
    pub fn duplicate_pin(&self) -> Option<PhysicalPin> {
        self.assignments.iter().enumerate().find_map(|(i, a)| {
            self.assignments[i + 1..].iter().any(|b| b.pin == a.pin).then_some(a.pin)
        })
    }

    /// Program direction registers and static levels. Every stimulus pin is
    /// driven low and enable lines go to their idle level.
    pub fn configure<G: GpioBank + ?Sized>(&self, gpio: &mut G) {
        for port in Port::ALL {
            if let Some(mask) = self.direction_mask(port) {
                gpio.set_direction(port, mask);
            }
        }
        for a in self.assignments {
            match a.role {
                PinRole::Power => gpio.write(a.pin, Level::High),
                PinRole::Ground => gpio.write(a.pin, Level::Low),
                PinRole::Enable { idle, .. } => gpio.write(a.pin, idle),
                PinRole::Input(_) => gpio.write(a.pin, Level::Low),
                PinRole::Output(_) => {}
            }
        }
    }

    /// Drive the stimulus pins from `pattern`. When `enables` is given, bit
    /// `n` of it sets enable line `n`; otherwise enables keep their level.
    pub fn drive<G: GpioBank + ?Sized>(&self, gpio: &mut G, pattern: u16, enables: Option<u8>) {
        for a in self.assignments {
            match a.role {
                PinRole::Input(n) => gpio.write(a.pin, Level::from(pattern & (1 << n) != 0)),
                PinRole::Enable { line, .. } => {
                    if let Some(mask) = enables {
                        gpio.write(a.pin, Level::from(mask & (1 << line) != 0));
                    }
                }
                _ => {}
            }
        }
    }

    /// Read the response pins. Bit `n` of the result is `Output(n)`.
    pub fn sample<G: GpioBank + ?Sized>(&self, gpio: &mut G) -> u16 {
        let mut snapshot: [Option<u8>; 4] = [None; 4];
        let mut response = 0u16;
        for a in self.assignments {
            if let PinRole::Output(n) = a.role {
                let idx = a.pin.port.index();
                let value = match snapshot[idx] {
                    Some(v) => v,
                    None => {
                        let v = gpio.read_port(a.pin.port);
                        snapshot[idx] = Some(v);
                        v
                    }
                };
                if value & a.pin.mask() != 0 {
                    response |= 1 << n;
                }
            }
        }
        response
    }
}
