//! # Brigade Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the sync subsystem
//! - Outcome classification rules
//! - The per-key scheduling state machine
//!
//! ## Architecture Principles
//! - Only depends on `brigade-domain`
//! - No HTTP, storage, or runtime code
//! - All external dependencies via traits
//! - Pure, testable scheduling logic

pub mod sync;

// Re-export specific items to avoid ambiguity
pub use sync::machine::{CancelAction, CompletionAction, Generation, KeySlot, TriggerAction};
pub use sync::outcome::classify_failure;
pub use sync::ports::{CacheStore, ConnectivitySource, PendingQueue, SyncJob, TokenProvider};
