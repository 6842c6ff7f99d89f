//! Reference client: a line-fitting model trained on synthetic data.

mod line_fit;
mod synthetic;

pub use line_fit::*;
pub use synthetic::*;
