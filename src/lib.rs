//! Authgate - session-token authentication and role gating
//!
//! This library provides password-based login, opaque bearer sessions and
//! the HTTP gate that protects the user-management API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
