//! Value types for light control parameters.

mod color;
mod mode;
mod xy;

pub use color::Color;
pub use mode::{Alert, ColorMode, Effect};
pub use xy::Xy;
