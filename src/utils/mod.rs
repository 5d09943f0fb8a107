//! Commonly used utilities like handles, pools, colors and rectangles.

#[macro_use]
pub mod handle;
pub mod handle_pool;
pub mod object_pool;

mod color;
mod rect;

pub mod prelude {
    pub use super::color::Color;
    pub use super::handle::{Handle, HandleIndex, HandleLike};
    pub use super::handle_pool::HandlePool;
    pub use super::object_pool::ObjectPool;
    pub use super::rect::Rect;
}

pub use self::prelude::*;
