//! Reflow oven firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod display;
pub mod error;
pub mod fsm;
pub mod ota;
pub mod pins;
pub mod safety;

// Hardware-facing layers; the ESP-IDF implementations are cfg-guarded
// inside, with simulation fallbacks on host targets.
pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;
