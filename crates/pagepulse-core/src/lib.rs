pub mod config;
pub mod dwell;
pub mod error;
pub mod event;
pub mod guard;
pub mod identity;
