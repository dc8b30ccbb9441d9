//! Expected responses.
//!
//! All responses use the same convention as [`PinRoleMap::sample`]: bit `n`
//! is the level on the pin carrying `Output(n)`.

use crate::model::ChipModel;
use crate::pinmap::PinRoleMap;
use crate::stimulus::Step;

/// Both NOR outputs high
const NOR_ALL_LOW_INPUTS: u16 = 0b11;
/// Both NOR outputs low
const NOR_ANY_HIGH_INPUT: u16 = 0b00;

/// Active-low one-hot value for decoder address `index`, in truth-table
/// order (Y0 is the most significant bit).
pub fn decoder_truth_row(index: usize) -> u8 {
    !(1u8 << (7 - (index & 7)))
}

/// Response a good chip of `model` gives at step `index` of its sequence.
pub fn expected(model: ChipModel, map: &PinRoleMap, index: usize, step: Step) -> u16 {
    match model {
        // The count index is the address (exhaustive sequence)
        ChipModel::Sn74s138n => {
            let logical = decoder_truth_row(index) as u16;
            match map.permutation() {
                Some(p) => p.apply(logical),
                None => logical,
            }
        }
        ChipModel::Sn74260 => {
            if step.pattern(map.input_width()) == 0 {
                NOR_ALL_LOW_INPUTS
            } else {
                NOR_ANY_HIGH_INPUT
            }
        }
        // Output must stay asserted until the forced state
        ChipModel::Sn74s133 => match step {
            Step::Stimulate(_) => 1,
            Step::ResetAndVerify => 0,
        },
    }
}

/// Response required right after configuration, before any step is applied.
pub fn presence(model: ChipModel) -> Option<u16> {
    match model {
        ChipModel::Sn74s133 => Some(1),
        ChipModel::Sn74s138n | ChipModel::Sn74260 => None,
    }
}
