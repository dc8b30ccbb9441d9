//! Model dispatcher: try each supported model in order, first match wins.

use crate::hal::{Delay, GpioBank};
use crate::model::ChipModel;
use crate::procedure::{run_test, ProcedureReport, TestOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// LCD text when no model matched
pub const NO_MATCH_TEXT: &str = "NO MATCH";

/// Final answer of one tester run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identification {
    Identified(ChipModel),
    Unidentified,
}

impl Identification {
    pub fn display_text(self) -> &'static str {
        match self {
            Identification::Identified(model) => model.display_name(),
            Identification::Unidentified => NO_MATCH_TEXT,
        }
    }
}

/// Identification plus the report of every procedure that ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub result: Identification,
    pub reports: Vec<ProcedureReport>,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    order: Vec<ChipModel>,
}

impl Dispatcher {
    /// Dispatcher over every supported model in their listed order
    pub fn new() -> Self {
        Dispatcher { order: ChipModel::ALL.to_vec() }
    }

    /// Run `test` for each model until one matches.
    pub fn identify_with(&self, mut test: impl FnMut(ChipModel) -> TestOutcome) -> Identification {
        self.order
            .iter()
            .copied()
            .find(|&model| test(model) == TestOutcome::Match)
            .map_or(Identification::Unidentified, Identification::Identified)
    }

    /// Test the chip in the socket against every model.
    pub fn run<G: GpioBank + ?Sized, D: Delay + ?Sized>(
        &self,
        gpio: &mut G,
        delay: &mut D,
        settle: Duration,
    ) -> DispatchReport {
        let mut reports = Vec::with_capacity(self.order.len());
        let result = self.identify_with(|model| {
            let report = run_test(model, &mut *gpio, &mut *delay, settle);
            let outcome = report.outcome;
            reports.push(report);
            outcome
        });
        info!(
            result = result.display_text(),
            models_tried = reports.len(),
            "identification finished"
        );
        DispatchReport { result, reports }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_passing_model_wins() {
        let d = Dispatcher::new();
        let mut tried = Vec::new();
        let result = d.identify_with(|m| {
            tried.push(m);
            if m == ChipModel::Sn74260 || m == ChipModel::Sn74s133 {
                TestOutcome::Match
            } else {
                TestOutcome::NoMatch
            }
        });
        assert_eq!(result, Identification::Identified(ChipModel::Sn74260));
        assert_eq!(tried, vec![ChipModel::Sn74s138n, ChipModel::Sn74260]);
    }

    #[test]
    fn test_priority_a_before_b_before_c() {
        let d = Dispatcher::new();
        assert_eq!(
            d.identify_with(|_| TestOutcome::Match),
            Identification::Identified(ChipModel::Sn74s138n)
        );
        let result = d.identify_with(|m| {
            if m == ChipModel::Sn74s138n { TestOutcome::NoMatch } else { TestOutcome::Match }
        });
        assert_eq!(result, Identification::Identified(ChipModel::Sn74260));
    }

    #[test]
    fn test_all_fail_is_unidentified() {
        let d = Dispatcher::new();
        let result = d.identify_with(|_| TestOutcome::NoMatch);
        assert_eq!(result, Identification::Unidentified);
        assert_eq!(result.display_text(), "NO MATCH");
    }

    #[test]
    fn test_display_literals() {
        assert_eq!(Identification::Identified(ChipModel::Sn74s138n).display_text(), "SN74S138N");
        assert_eq!(Identification::Identified(ChipModel::Sn74260).display_text(), "SN74LS260");
        assert_eq!(Identification::Identified(ChipModel::Sn74s133).display_text(), "SN74S133");
    }
}
