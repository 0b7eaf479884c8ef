//! HTTP handlers.

pub mod crop;
pub mod detect;
pub mod health;

pub use crop::crop_video;
pub use detect::detect_crop;
pub use health::{health, ready};
