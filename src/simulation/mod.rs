// src/simulation/mod.rs

//! Scripted simulation attempts: the run reducer and the live-session table.

pub mod registry;
pub mod runner;

pub use registry::{Session, SessionHandle, SessionRegistry};
pub use runner::{Advance, SimulationRun};
