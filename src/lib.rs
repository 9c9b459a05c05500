//! EcoSense client — session-scoped chat and survey flows over the EcoSense API.

pub mod backend;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;
pub mod survey;
