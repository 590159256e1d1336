//! Automated refactoring orchestration with multi-metric quality scoring.
//!
//! `reforge` parses a project into an immutable [`core::ProgramSnapshot`],
//! scans it for code smells, and evaluates refactoring strategies in a
//! branching [`workspace::VirtualWorkspace`] where each candidate rewrite is
//! scored on complexity, cohesion, and maintainability before anything
//! touches disk. The [`orchestrator::Orchestrator`] ties the pieces
//! together: ranked analysis plans, side-by-side strategy comparison, and
//! sequential strategy chains with automatic stop conditions.

pub mod backup;
pub mod cli;
pub mod cohesion;
pub mod commands;
pub mod complexity;
pub mod config;
pub mod core;
pub mod diff;
pub mod io;
pub mod orchestrator;
pub mod scoring;
pub mod smells;
pub mod strategies;
pub mod workspace;

pub use config::ReforgeConfig;
pub use core::{
    CodeSmell, CompilationUnit, ProgramSnapshot, RefactoringType, Severity, SmellType,
};
pub use orchestrator::{Orchestrator, RefactoringPlan, StrategyChain};
pub use workspace::VirtualWorkspace;
