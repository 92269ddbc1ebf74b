//! # Bridge Module
//!
//! Internal implementation of the job scheduling bridge.
//!
//! This module contains all core building blocks:
//! - Combinable job handles and the dependency-aware runtime
//! - Pin tracking for column backing memory
//! - Per-chunk views with typed column access
//! - The N-ary query scheduler and aggregate completion handle
//! - Per-archetype hazard records
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod handle;
pub mod runtime;
pub mod pins;
pub mod store;
pub mod chunk;
pub mod hazards;
pub mod schedule;
pub mod gate;
