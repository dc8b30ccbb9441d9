//! Supported chip models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A chip the tester knows how to verify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChipModel {
    /// 3-to-8 line decoder, active-low outputs
    Sn74s138n,
    /// Dual 5-input NOR
    Sn74260,
    /// 13-input NAND
    Sn74s133,
}

impl ChipModel {
    /// All supported models in dispatch order.
    pub const ALL: [ChipModel; 3] = [ChipModel::Sn74s138n, ChipModel::Sn74260, ChipModel::Sn74s133];

    /// Text shown on the LCD when this model is identified
    pub fn display_name(self) -> &'static str {
        match self {
            ChipModel::Sn74s138n => "SN74S138N",
            ChipModel::Sn74260 => "SN74LS260",
            ChipModel::Sn74s133 => "SN74S133",
        }
    }
}

impl fmt::Display for ChipModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
