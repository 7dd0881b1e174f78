//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own tracking logic and the storage/auth seams so route
//! handlers can stay focused on protocol translation and credential
//! plumbing.

pub mod auth;
pub mod hub;
pub mod location;
pub mod proximity;
pub mod registry;
pub mod rooms;
pub mod store;
pub mod tracking;
