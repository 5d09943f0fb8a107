//! This module contains the math utils that mainly comes from `cgmath`, plus
//! the 2x3 affine transform assigned to scene nodes.

pub use cgmath::*;

pub mod affine;
pub use self::affine::Affine;
