//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting, graph rows and verbosity handling
//!
//! # Design
//!
//! All CLI output goes through this module so quiet mode is honored in one
//! place. Diagnostics go through `tracing` instead.

pub mod output;
