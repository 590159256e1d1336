//! Command handlers for the `reforge` binary.
//!
//! Each handler returns `Ok(true)` on success and `Ok(false)` for a handled
//! failure (nothing to apply, no matching opportunity); both map to exit
//! codes in `main`.

pub mod analyze;
pub mod apply;
pub mod backups;
pub mod chain;
pub mod preview;
pub mod rollback;

use crate::orchestrator::{Opportunity, RefactoringPlan};
use std::path::Path;

/// Pick the opportunity a preview or apply run should target: the first in
/// the named unit, or the highest-ranked overall.
pub(crate) fn select_opportunity<'a>(
    plan: &'a RefactoringPlan,
    unit: Option<&Path>,
) -> Option<&'a Opportunity> {
    match unit {
        Some(unit) => plan.opportunities.iter().find(|o| o.smell.file == unit),
        None => plan.opportunities.first(),
    }
}
