//! File handler module for contemplative-md
//!
//! Handles file system access for the code viewer:
//! - Reading files with encoding detection
//! - Gating content by size and binary heuristics before highlighting

pub mod io;
pub mod viewer;

pub use io::*;
pub use viewer::*;
