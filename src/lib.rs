//! E-wange smart-home client
//!
//! Monitors and controls a home whose sensors and actuators are mirrored in
//! a Firebase-style realtime database, and talks to a conversational
//! assistant that can answer questions about the home and drive the same
//! actuators.
//!
//! # Features
//!
//! - Live whole-home snapshots over the store's event stream
//! - Dashboard tiles derived from a snapshot
//! - Local quick commands with a streaming assistant fallback
//! - Device registry, system settings and user administration
//! - Temperature/humidity history with CSV export

// Core modules
pub mod admin;
pub mod assistant;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod home;
pub mod logging;
pub mod store;
pub mod utils;

// Re-export main types for convenience
pub use auth::{Role, Session};
pub use config::DashboardConfig;
pub use error::{HomeError, Result};
pub use home::{Actuator, DeviceAction, HomeState};
pub use store::{HomeStore, MemoryStore, RealtimeDbClient};
