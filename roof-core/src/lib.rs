#![no_std]

// Shared logic for the observatory roof controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and reaching hardware only through the traits in `hw`.

pub mod config;
pub mod control;
pub mod hw;
pub mod protocol;
pub mod sampler;
pub mod scheduler;

pub use config::RoofConfig;
pub use control::{ControlState, RoofStatus, SharedControl, TickEvents, TickReport};
pub use protocol::Command;
pub use scheduler::{MainLoop, TickScheduler, TimerOutcome};
