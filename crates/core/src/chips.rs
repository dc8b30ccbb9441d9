//! Behavioural models of the supported TTL parts.
//!
//! Pin numbers follow the datasheet DIP pinouts. The models are purely
//! combinational; propagation delay is well below the tester's settle time.

use crate::hal::Level;
use crate::socket::{ChipPins, SocketDevice};

/// SN74S138N 3-line to 8-line decoder/demultiplexer, active-low outputs.
///
/// ```text
///   A  1 ┌──┐ 16 VCC
///   B  2 │  │ 15 Y0
///   C  3 │  │ 14 Y1
/// G2A  4 │  │ 13 Y2
/// G2B  5 │  │ 12 Y3
///  G1  6 │  │ 11 Y4
///  Y7  7 │  │ 10 Y5
/// GND  8 └──┘  9 Y6
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Sn74s138;

impl SocketDevice for Sn74s138 {
    fn part_number(&self) -> &'static str {
        "SN74S138N"
    }

    fn pin_count(&self) -> u8 {
        16
    }

    fn output_pins(&self) -> &'static [u8] {
        // Y0..Y7
        &[15, 14, 13, 12, 11, 10, 9, 7]
    }

    fn evaluate(&self, pins: &ChipPins) -> Vec<Level> {
        let enabled = pins.is_high(6) && !pins.is_high(4) && !pins.is_high(5);
        let addr = pins.get(1).bit() | (pins.get(2).bit() << 1) | (pins.get(3).bit() << 2);
        (0..8u8).map(|y| Level::from(!(enabled && y == addr))).collect()
    }
}

/// SN74LS260 dual 5-input positive-NOR gate.
///
/// ```text
///  1A  1 ┌──┐ 14 VCC
///  1B  2 │  │ 13 1E
///  1C  3 │  │ 12 1D
///  2A  4 │  │ 11 2E
///  1Y  5 │  │ 10 2D
///  2Y  6 │  │  9 2C
/// GND  7 └──┘  8 2B
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Sn74ls260;

impl SocketDevice for Sn74ls260 {
    fn part_number(&self) -> &'static str {
        "SN74LS260"
    }

    fn pin_count(&self) -> u8 {
        14
    }

    fn output_pins(&self) -> &'static [u8] {
        &[5, 6]
    }

    fn evaluate(&self, pins: &ChipPins) -> Vec<Level> {
        let nor = |inputs: [u8; 5]| Level::from(!inputs.iter().any(|&p| pins.is_high(p)));
        vec![nor([1, 2, 3, 12, 13]), nor([4, 8, 9, 10, 11])]
    }
}

/// SN74S133 13-input positive-NAND gate.
///
/// ```text
///   A  1 ┌──┐ 16 VCC
///   B  2 │  │ 15 M
///   C  3 │  │ 14 L
///   D  4 │  │ 13 K
///   E  5 │  │ 12 J
///   F  6 │  │ 11 I
///   G  7 │  │ 10 H
/// GND  8 └──┘  9 Y
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Sn74s133;

const S133_INPUTS: [u8; 13] = [1, 2, 3, 4, 5, 6, 7, 10, 11, 12, 13, 14, 15];

impl SocketDevice for Sn74s133 {
    fn part_number(&self) -> &'static str {
        "SN74S133"
    }

    fn pin_count(&self) -> u8 {
        16
    }

    fn output_pins(&self) -> &'static [u8] {
        &[9]
    }

    fn evaluate(&self, pins: &ChipPins) -> Vec<Level> {
        vec![Level::from(!S133_INPUTS.iter().all(|&p| pins.is_high(p)))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pins(count: u8, high: &[u8]) -> ChipPins {
        ChipPins::from_fn(count, |n| Level::from(high.contains(&n)))
    }

    #[test]
    fn test_138_decodes_address() {
        // G1 high, G2A/G2B low, address 5 = A + C
        let out = Sn74s138.evaluate(&pins(16, &[1, 3, 6, 16]));
        for (y, level) in out.iter().enumerate() {
            assert_eq!(*level, Level::from(y != 5), "Y{}", y);
        }
    }

    #[test]
    fn test_138_disabled_all_high() {
        // G1 low
        let out = Sn74s138.evaluate(&pins(16, &[16]));
        assert!(out.iter().all(|l| l.is_high()));
        // G2A high
        let out = Sn74s138.evaluate(&pins(16, &[4, 6, 16]));
        assert!(out.iter().all(|l| l.is_high()));
    }

    #[test]
    fn test_260_nor() {
        let out = Sn74ls260.evaluate(&pins(14, &[14]));
        assert_eq!(out, vec![Level::High, Level::High]);
        let out = Sn74ls260.evaluate(&pins(14, &[12, 14]));
        assert_eq!(out, vec![Level::Low, Level::High]);
        let out = Sn74ls260.evaluate(&pins(14, &[9, 14]));
        assert_eq!(out, vec![Level::High, Level::Low]);
    }

    #[test]
    fn test_133_nand() {
        let out = Sn74s133.evaluate(&pins(16, &[1, 16]));
        assert_eq!(out, vec![Level::High]);
        let mut all = S133_INPUTS.to_vec();
        all.push(16);
        let out = Sn74s133.evaluate(&pins(16, &all));
        assert_eq!(out, vec![Level::Low]);
    }
}
