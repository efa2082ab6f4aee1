//! alertwatch: manage and watch stock price alerts against a REST backend.
//!
//! An alert is armed until the watched price crosses its limit in the chosen
//! direction, then stays notified until reset. [`app::App`] drives every
//! action through validation, the lifecycle rules and the store, and always
//! refetches the full list afterwards.

pub mod api;
pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod models;
pub mod reconcile;
pub mod store;
pub mod validator;
