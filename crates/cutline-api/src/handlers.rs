//! Request handlers.

pub mod health;
pub mod silence;

pub use health::*;
pub use silence::*;
