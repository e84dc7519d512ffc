//! SnapValue appraisal server library.
//!
//! Image intake and storage, the vision/market/price analysis pipeline,
//! persistence and the HTTP API. The `snapvalue` and `manage-users` binaries
//! are thin wrappers around this crate.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
