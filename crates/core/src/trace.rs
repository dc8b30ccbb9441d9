//! GPIO trace recording and trace files.
//!
//! [`RecordingBank`] wraps any [`GpioBank`] and logs every register access.
//! A finished run is saved together with the config and the dispatch report.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "ICTR"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use crate::config::TesterConfig;
use crate::dispatcher::DispatchReport;
use crate::hal::{GpioBank, Level, PhysicalPin, Port};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::trace;

/// Magic bytes identifying a GPIO trace file.
const MAGIC: &[u8; 4] = b"ICTR";
/// Current trace format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Encode(bincode::Error),
    #[error("deserialize error: {0}")]
    Decode(bincode::Error),
    #[error("decompress error: {0}")]
    Decompress(String),
    #[error("file too small")]
    TooSmall,
    #[error("not a GPIO trace file (bad magic)")]
    BadMagic,
    #[error("unsupported trace version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

// ─── Recording ──────────────────────────────────────────────────────────────

/// One register access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpioOp {
    SetDirection { port: Port, mask: u8 },
    Write { pin: PhysicalPin, level: Level },
    WritePort { port: Port, value: u8 },
    Read { pin: PhysicalPin, level: Level },
    ReadPort { port: Port, value: u8 },
}

impl fmt::Display for GpioOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            GpioOp::SetDirection { port, mask } => {
                write!(f, "DDR{}  <- 0x{:02X}", port.letter(), mask)
            }
            GpioOp::Write { pin, level } => write!(f, "{}   <- {}", pin, level.bit()),
            GpioOp::WritePort { port, value } => {
                write!(f, "PORT{} <- 0x{:02X}", port.letter(), value)
            }
            GpioOp::Read { pin, level } => write!(f, "{}   -> {}", pin, level.bit()),
            GpioOp::ReadPort { port, value } => {
                write!(f, "PIN{}  -> 0x{:02X}", port.letter(), value)
            }
        }
    }
}

/// [`GpioBank`] wrapper that records every access
pub struct RecordingBank<G: GpioBank> {
    inner: G,
    ops: Vec<GpioOp>,
}

impl<G: GpioBank> RecordingBank<G> {
    pub fn new(inner: G) -> Self {
        RecordingBank { inner, ops: Vec::new() }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut G {
        &mut self.inner
    }

    pub fn ops(&self) -> &[GpioOp] {
        &self.ops
    }

    /// Take the recorded operations, leaving the log empty.
    pub fn take_ops(&mut self) -> Vec<GpioOp> {
        std::mem::take(&mut self.ops)
    }

    fn record(&mut self, op: GpioOp) {
        trace!(op = %op, "gpio");
        self.ops.push(op);
    }
}

impl<G: GpioBank> GpioBank for RecordingBank<G> {
    fn set_direction(&mut self, port: Port, output_mask: u8) {
        self.inner.set_direction(port, output_mask);
        self.record(GpioOp::SetDirection { port, mask: output_mask });
    }

    fn write(&mut self, pin: PhysicalPin, level: Level) {
        self.inner.write(pin, level);
        self.record(GpioOp::Write { pin, level });
    }

    fn write_port(&mut self, port: Port, value: u8) {
        self.inner.write_port(port, value);
        self.record(GpioOp::WritePort { port, value });
    }

    fn read_port(&mut self, port: Port) -> u8 {
        let value = self.inner.read_port(port);
        self.record(GpioOp::ReadPort { port, value });
        value
    }

    fn read(&mut self, pin: PhysicalPin) -> Level {
        let level = self.inner.read(pin);
        self.record(GpioOp::Read { pin, level });
        level
    }
}

// ─── Trace file ─────────────────────────────────────────────────────────────

/// Everything saved for one identification run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTrace {
    pub config: TesterConfig,
    pub result: DispatchReport,
    pub ops: Vec<GpioOp>,
}

impl RunTrace {
    /// Serialize with header and deflate compression.
    pub fn encode(&self) -> Result<Vec<u8>, TraceError> {
        let payload = bincode::serialize(self).map_err(TraceError::Encode)?;
        let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

        let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    /// Parse bytes produced by [`encode`](Self::encode), verifying magic and version.
    pub fn decode(data: &[u8]) -> Result<RunTrace, TraceError> {
        if data.len() < HEADER_LEN {
            return Err(TraceError::TooSmall);
        }
        if &data[0..4] != MAGIC {
            return Err(TraceError::BadMagic);
        }
        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != FORMAT_VERSION {
            return Err(TraceError::Version { found: version, expected: FORMAT_VERSION });
        }

        let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
            .map_err(|e| TraceError::Decompress(format!("{:?}", e)))?;
        bincode::deserialize(&decompressed).map_err(TraceError::Decode)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), TraceError> {
        let out = self.encode()?;
        std::fs::write(path, out)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<RunTrace, TraceError> {
        let data = std::fs::read(path)?;
        RunTrace::decode(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::{Sn74s133, Sn74s138};
    use crate::dispatcher::{Dispatcher, Identification};
    use crate::hal::StdDelay;
    use crate::model::ChipModel;
    use crate::procedure::{run_test, TestOutcome};
    use crate::socket::ZifSocket;
    use std::time::Duration;

    fn recorded_run() -> RunTrace {
        let mut bank = RecordingBank::new(ZifSocket::with_device(Box::new(Sn74s138), Level::High));
        let result = Dispatcher::new().run(&mut bank, &mut StdDelay, Duration::ZERO);
        RunTrace { config: TesterConfig::default(), result, ops: bank.take_ops() }
    }

    #[test]
    fn test_recording_captures_register_accesses() {
        let run = recorded_run();
        assert_eq!(run.result.result, Identification::Identified(ChipModel::Sn74s138n));
        assert_eq!(run.ops.first(), Some(&GpioOp::SetDirection { port: Port::A, mask: 0x01 }));
        assert!(run.ops.contains(&GpioOp::SetDirection { port: Port::C, mask: 0xBF }));
        let reads = run.ops.iter().filter(|op| matches!(op, GpioOp::ReadPort { .. })).count();
        assert_eq!(reads, 16);
    }

    #[test]
    fn test_encode_decode() {
        let run = recorded_run();
        let bytes = run.encode().unwrap();
        assert_eq!(&bytes[0..4], b"ICTR");
        assert_eq!(RunTrace::decode(&bytes).unwrap(), run);
    }

    #[test]
    fn test_save_and_load_file() {
        let run = recorded_run();
        let name = format!("ic-tester-trace-{}.ictr", std::process::id());
        let path = std::env::temp_dir().join(name);
        run.save_to_file(&path).unwrap();
        let loaded = RunTrace::load_from_file(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.unwrap(), run);
    }

    #[test]
    fn test_rejects_bad_header() {
        let mut bytes = recorded_run().encode().unwrap();
        assert!(matches!(RunTrace::decode(&bytes[..4]), Err(TraceError::TooSmall)));

        bytes[4] = 9;
        assert!(matches!(
            RunTrace::decode(&bytes),
            Err(TraceError::Version { found: 9, expected: 1 })
        ));

        bytes[0] = b'X';
        assert!(matches!(RunTrace::decode(&bytes), Err(TraceError::BadMagic)));
    }

    /// Latch images of (PORTC, PORTA) at every port read, rebuilt from the log
    fn port_images_at_reads(ops: &[GpioOp]) -> Vec<(u8, u8)> {
        let mut latch = [0u8; 4];
        let mut images = Vec::new();
        for op in ops {
            match *op {
                GpioOp::Write { pin, level } => {
                    let byte = &mut latch[pin.port.index()];
                    if level.is_high() {
                        *byte |= pin.mask();
                    } else {
                        *byte &= !pin.mask();
                    }
                }
                GpioOp::WritePort { port, value } => latch[port.index()] = value,
                GpioOp::ReadPort { .. } | GpioOp::Read { .. } => {
                    images.push((latch[Port::C.index()], latch[Port::A.index()]))
                }
                GpioOp::SetDirection { .. } => {}
            }
        }
        images
    }

    #[test]
    fn test_133_port_images_per_sample() {
        let mut bank = RecordingBank::new(ZifSocket::with_device(Box::new(Sn74s133), Level::High));
        let report = run_test(ChipModel::Sn74s133, &mut bank, &mut StdDelay, Duration::ZERO);
        assert_eq!(report.outcome, TestOutcome::Match);

        // Presence check, then the single-line walk, then everything high
        let mut expect = vec![(0x00, 0x01)];
        expect.extend((0..7).map(|i| ((1u8 << i) | 0x80, 0x01)));
        expect.extend((7..13).map(|i| (0x80, (1u8 << (i - 7)) | 0x01)));
        expect.push((0x7F, 0x7F));
        assert_eq!(port_images_at_reads(bank.ops()), expect);
    }

    #[test]
    fn test_op_display() {
        assert_eq!(GpioOp::SetDirection { port: Port::C, mask: 0xBF }.to_string(), "DDRC  <- 0xBF");
        assert_eq!(GpioOp::ReadPort { port: Port::A, value: 0x80 }.to_string(), "PINA  -> 0x80");
    }
}
