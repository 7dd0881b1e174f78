//! Real-time fleet tracking gateway.
//!
//! ARCHITECTURE
//! ============
//! Authenticated WebSocket connections subscribe to per-vehicle rooms and
//! publish location reports. Each accepted report is persisted through the
//! vehicle store, then fanned out to the vehicle's room and to every
//! connection. HTTP queries expose tracker counts and proximity rankings.
//!
//! - `services` owns the tracking logic and the store/auth seams.
//! - `routes` translates socket frames and HTTP requests into service calls.
//! - `state` wires both together for handlers and tests.

pub mod config;
pub mod db;
pub mod frame;
pub mod geo;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
