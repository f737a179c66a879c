//! Core type definitions

mod geometry;
mod joint;
mod pose;

pub use geometry::*;
pub use joint::*;
pub use pose::*;
