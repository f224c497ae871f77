//! WaterStation irrigation library.
//!
//! Polls soil-moisture and reservoir sensors, opens per-port valves and the
//! shared pump when a plant is thirsty, and publishes station snapshots to
//! live observers.  Hardware, storage and settings are reached only through
//! the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod cancel;
pub mod config;
pub mod error;
pub mod model;
pub mod pins;
pub mod sensors;
pub mod task;
