//! Integration test suite for deft.
//!
//! These tests drive the engine end to end through its public API: units
//! are defined by the host or by fetched sources, fetches complete in
//! controlled orders, and the run report is checked once the engine is
//! idle.
//!
//! # Test Categories
//!
//! - `resolution`: dependency counting, export propagation, tasks
//! - `redefinition`: placeholders, in-place updates, rejected redefinitions
//! - `fetch_errors`: handled and fatal fetch failures
//! - `cycles`: cycle refusal and stalls with detection off
//! - `fs_loader`: module files on disk

mod fixtures;

mod redefinition;
mod cycles;
mod fs_loader;
