//! HTTP handlers for the video proxy.

pub mod generate;
pub mod health;

pub use generate::generate_video;
pub use health::{health_check, metrics, ping};
