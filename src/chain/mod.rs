//! Chain module - block admission and tip tracking

mod import;
mod tips;

pub use import::*;
pub use tips::*;
