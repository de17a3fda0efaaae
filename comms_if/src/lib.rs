//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the commands accepted by the
//! line executable, the telemetry it publishes and the traits its equipment drivers implement.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Interfaces to equipment (line sensors and drive motors)
pub mod eqpt;

/// Telemetry packet and sink interface
pub mod tm;
