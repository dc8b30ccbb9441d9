//! Stimulus sequences.
//!
//! Exhaustive models count `0..2^width` in natural binary order; the
//! decoder's expected response is derived from the count index, so the order
//! matters. Literal models replay a fixed list of steps.

use crate::model::ChipModel;
use crate::pinmap::PinRoleMap;
use serde::{Deserialize, Serialize};

/// One step of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Drive this pattern onto the stimulus pins
    Stimulate(u16),
    /// Force every stimulus pin high with the enable lines deasserted
    ResetAndVerify,
}

impl Step {
    /// Pattern driven by this step for a model with `width` stimulus bits
    pub fn pattern(self, width: u8) -> u16 {
        match self {
            Step::Stimulate(p) => p,
            Step::ResetAndVerify => all_ones(width),
        }
    }
}

fn all_ones(width: u8) -> u16 {
    if width >= 16 { u16::MAX } else { (1u16 << width) - 1 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Count { len: usize },
    Literal(Vec<Step>),
}

/// Restartable, deterministic step sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusSequence {
    source: Source,
    pos: usize,
}

impl StimulusSequence {
    /// `0, 1, …, 2^width - 1`
    pub fn exhaustive(width: u8) -> Self {
        StimulusSequence { source: Source::Count { len: 1usize << width.min(16) }, pos: 0 }
    }

    pub fn literal(steps: Vec<Step>) -> Self {
        StimulusSequence { source: Source::Literal(steps), pos: 0 }
    }

    pub fn for_model(model: ChipModel) -> Self {
        match model {
            ChipModel::Sn74s138n | ChipModel::Sn74260 => {
                StimulusSequence::exhaustive(PinRoleMap::for_model(model).input_width())
            }
            // One high line at a time, then force them all. The port A half
            // lags one line: its first step drives nothing and PA6 is only
            // raised by the final step.
            ChipModel::Sn74s133 => StimulusSequence::literal(
                (0..7)
                    .map(|i| Step::Stimulate(1 << i))
                    .chain(std::iter::once(Step::Stimulate(0)))
                    .chain((7..12).map(|i| Step::Stimulate(1 << i)))
                    .chain(std::iter::once(Step::ResetAndVerify))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        match &self.source {
            Source::Count { len } => *len,
            Source::Literal(steps) => steps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn restart(&mut self) {
        self.pos = 0;
    }
}

impl Iterator for StimulusSequence {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        let step = match &self.source {
            Source::Count { len } => (self.pos < *len).then(|| Step::Stimulate(self.pos as u16)),
            Source::Literal(steps) => steps.get(self.pos).copied(),
        }?;
        self.pos += 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.len().saturating_sub(self.pos);
        (rest, Some(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhaustive_counts_in_order() {
        let steps: Vec<Step> = StimulusSequence::for_model(ChipModel::Sn74s138n).collect();
        let expect: Vec<Step> = (0..8).map(Step::Stimulate).collect();
        assert_eq!(steps, expect);
        assert_eq!(StimulusSequence::for_model(ChipModel::Sn74260).count(), 32);
    }

    #[test]
    fn test_133_literal_sequence() {
        let steps: Vec<Step> = StimulusSequence::for_model(ChipModel::Sn74s133).collect();
        let expect = vec![
            Step::Stimulate(0x0001),
            Step::Stimulate(0x0002),
            Step::Stimulate(0x0004),
            Step::Stimulate(0x0008),
            Step::Stimulate(0x0010),
            Step::Stimulate(0x0020),
            Step::Stimulate(0x0040),
            Step::Stimulate(0x0000),
            Step::Stimulate(0x0080),
            Step::Stimulate(0x0100),
            Step::Stimulate(0x0200),
            Step::Stimulate(0x0400),
            Step::Stimulate(0x0800),
            Step::ResetAndVerify,
        ];
        assert_eq!(steps, expect);
    }

    #[test]
    fn test_restart_replays_identically() {
        let mut seq = StimulusSequence::for_model(ChipModel::Sn74s133);
        let first: Vec<Step> = seq.by_ref().collect();
        assert_eq!(seq.next(), None);
        seq.restart();
        let second: Vec<Step> = seq.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_pattern_is_all_ones() {
        assert_eq!(Step::ResetAndVerify.pattern(13), 0x1FFF);
        assert_eq!(Step::Stimulate(5).pattern(13), 5);
    }
}
