// Type definitions for the de-identification pipeline

pub mod color;
pub mod geometry;
pub mod span;

pub use color::*;
pub use geometry::*;
pub use span::*;
