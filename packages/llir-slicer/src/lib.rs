//! # llir-slicer
//!
//! Whole-program static dependence analyzer and program slicer for a typed,
//! SSA-based low-level intermediate representation (LLIR).
//!
//! Pipeline: `Program` → [`features::points_to`] → [`features::reaching_defs`]
//! → [`features::dependence`] (control deps via [`features::dominance`]) →
//! [`features::slicing`] → residual `Program`.
//!
//! ## Scope
//! This crate is the analysis core. It does not parse or print any concrete
//! textual IR; callers supply a [`shared::ir::Program`] built however they
//! like and get a residual `Program` back.

pub mod features;
pub mod shared;

pub use shared::config::{PtaOptions, RdOptions, SlicerOptions};
pub use shared::error::{AnalysisError, AnalysisResult, Diagnostic, ErrorKind};
pub use shared::ir::{NodeKind, Program};
