//! Sync scheduling logic
//!
//! Everything here is pure: the state machine and classification rules are
//! plain functions over domain types, driven by the scheduler runtime in
//! the infra layer.

pub mod machine;
pub mod outcome;
pub mod ports;
