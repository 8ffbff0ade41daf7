//! Monthly incentive eligibility and payout engine.
//!
//! The library merges roster, attendance, AQL and 5PRS tables into one evaluation record per
//! employee, derives condition flags, resolves role archetypes and computes payouts bottom-up
//! over the reporting hierarchy. Each month's materialized result seeds the next month's
//! continuity lookups.

pub mod config;
pub mod error;
pub mod period;
pub mod telemetry;
pub mod workflows;
