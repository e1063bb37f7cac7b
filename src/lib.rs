//! Capture named membership rosters, keep their history, report what changed.
//!
//! The core is the pair of `store` (versioned capture history) and `diff`
//! (pure capture comparison); `sync` wires them to the peripheral
//! collaborators: a `source` to fetch from, a `notify` sink to report to,
//! and `config` settings cells.

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod notify;
pub mod source;
pub mod store;
pub mod sync;
