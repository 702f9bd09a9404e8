pub mod artifact;
pub mod composition;
pub mod config;
pub mod error;
pub mod notification;
pub mod presets;
pub mod source;
pub mod state;
