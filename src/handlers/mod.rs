// src/handlers/mod.rs

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod scenario;
pub mod simulation;
pub mod submission;
pub mod task;
