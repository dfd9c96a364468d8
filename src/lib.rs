pub mod api;
pub mod config;
pub mod error;
pub mod jitter;
pub mod persistence;
pub mod pipeline;
pub mod reference;
pub mod trace;
pub mod types;
