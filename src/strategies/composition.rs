//! Composition-order rules between strategy kinds.
//!
//! The rules form a strict partial order, not a total order: method-level
//! cleanups come before member-level extractions, which come before
//! interface extraction; conditional replacement composes in either
//! direction; a type never chains with itself.

use crate::core::RefactoringType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositionOrder {
    /// The first type must run before the second.
    Before,
    /// The first type must run after the second.
    After,
    /// No ordering constraint between the two.
    Either,
    /// The pair cannot appear in one chain.
    Incompatible,
}

/// Pipeline phase per type; `None` means order-independent.
fn phase(ty: RefactoringType) -> Option<u8> {
    match ty {
        RefactoringType::SimplifyMethod => Some(0),
        RefactoringType::ExtractMethod => Some(1),
        RefactoringType::ExtractClass | RefactoringType::SplitGodClass => Some(2),
        RefactoringType::ExtractInterface => Some(3),
        RefactoringType::ReplaceConditional => None,
    }
}

pub fn composition_order(a: RefactoringType, b: RefactoringType) -> CompositionOrder {
    if a == b {
        return CompositionOrder::Incompatible;
    }
    match (phase(a), phase(b)) {
        (Some(pa), Some(pb)) if pa < pb => CompositionOrder::Before,
        (Some(pa), Some(pb)) if pa > pb => CompositionOrder::After,
        _ => CompositionOrder::Either,
    }
}

pub fn can_compose_with(a: RefactoringType, b: RefactoringType) -> bool {
    composition_order(a, b) != CompositionOrder::Incompatible
}

/// A chain is valid iff every earlier step may precede every later step.
pub fn validate_chain(steps: &[RefactoringType]) -> Result<(), String> {
    for (i, &a) in steps.iter().enumerate() {
        for &b in &steps[i + 1..] {
            match composition_order(a, b) {
                CompositionOrder::Incompatible => {
                    return Err(format!("{a} cannot be chained with {b}"));
                }
                CompositionOrder::After => {
                    return Err(format!("{a} must run after {b}, not before"));
                }
                CompositionOrder::Before | CompositionOrder::Either => {}
            }
        }
    }
    Ok(())
}
