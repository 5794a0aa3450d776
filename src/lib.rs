pub mod browser;
pub mod classify;
mod cmd;
pub mod config;
pub mod document;
pub mod download;
mod error;
pub mod extract;
pub mod fetch;
pub mod paths;

pub use error::{EngineError, Result};
