//! The renderer contract shared by every sprite backend.
//!
//! A backend keeps its own per-node rendering attributes (transform and
//! sub-texture) keyed by `NodeHandle`, owns the textures it uploads, and walks a
//! `Scene` from a root node when asked to render, firing the arranger of every
//! node it visits.
//!
//! Two backends are shipped:
//!
//! 1. `HeadlessEngine` records everything and draws nothing, which makes it a
//! stand-in for an interactive hardware backend.
//! 2. `SoftwareEngine` rasterizes the scene into an `image::RgbaImage`.

pub mod headless;
pub mod software;

pub use self::headless::HeadlessEngine;
pub use self::software::SoftwareEngine;

use std::time::Duration;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::errors::*;
use crate::math::{Affine, Vector2};
use crate::scene::{NodeHandle, Scene};
use crate::utils::Rect;

impl_handle!(TextureHandle);

/// A rectangular region of a texture, assigned to a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubTex {
    pub texture: TextureHandle,
    pub region: Rect,
}

impl SubTex {
    #[inline]
    pub fn new(texture: TextureHandle, region: Rect) -> Self {
        SubTex { texture, region }
    }
}

/// Frame-clock time, in ticks of `1 / FRAMES_PER_SECOND` second.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(pub i32);

impl Time {
    pub const FRAMES_PER_SECOND: i32 = 60;

    /// Converts the time elapsed since the start of an animation into ticks.
    pub fn from_elapsed(elapsed: Duration) -> Self {
        let ticks = elapsed.as_millis() * Self::FRAMES_PER_SECOND as u128 / 1000;
        Time(ticks.min(i32::max_value() as u128) as i32)
    }

    /// Returns the number of whole seconds.
    #[inline]
    pub fn seconds(self) -> i32 {
        self.0 / Self::FRAMES_PER_SECOND
    }
}

/// The display that a render pass targets.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// The dimensions of the display in points.
    pub dimensions: Vector2<f32>,
    /// The number of pixels per point.
    pub pixels_per_pt: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            dimensions: Vector2::new(0.0, 0.0),
            pixels_per_pt: 1.0,
        }
    }
}

/// Rendering attributes a backend keeps for each registered node.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct NodeState {
    pub transform: Affine,
    pub sub_tex: Option<SubTex>,
}

/// The renderer contract.
pub trait Engine {
    /// Registers a node of `scene` with this backend.
    fn register(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()>;

    /// Drops every rendering attribute of the node.
    fn unregister(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()>;

    /// Uploads an image. Textures live as long as the backend.
    fn load_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle>;

    fn set_sub_tex(&mut self, node: NodeHandle, sub_tex: SubTex) -> Result<()>;

    fn set_transform(&mut self, node: NodeHandle, transform: Affine) -> Result<()>;

    /// Renders the tree under `root`, firing arrangers on the way.
    fn render(
        &mut self,
        scene: &mut Scene,
        root: NodeHandle,
        time: Time,
        config: &DisplayConfig,
    ) -> Result<()>;
}

/// A backend whose output could be drawn into a caller-owned buffer.
pub trait RasterEngine: Engine {
    fn render_into(
        &mut self,
        scene: &mut Scene,
        root: NodeHandle,
        time: Time,
        config: &DisplayConfig,
        dst: &mut RgbaImage,
    ) -> Result<()>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn register(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        (**self).register(scene, node)
    }

    fn unregister(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        (**self).unregister(scene, node)
    }

    fn load_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle> {
        (**self).load_texture(image)
    }

    fn set_sub_tex(&mut self, node: NodeHandle, sub_tex: SubTex) -> Result<()> {
        (**self).set_sub_tex(node, sub_tex)
    }

    fn set_transform(&mut self, node: NodeHandle, transform: Affine) -> Result<()> {
        (**self).set_transform(node, transform)
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        root: NodeHandle,
        time: Time,
        config: &DisplayConfig,
    ) -> Result<()> {
        (**self).render(scene, root, time, config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn time() {
        assert_eq!(Time::from_elapsed(Duration::from_millis(0)), Time(0));
        assert_eq!(Time::from_elapsed(Duration::from_millis(1000)), Time(60));
        assert_eq!(Time::from_elapsed(Duration::from_millis(2510)).seconds(), 2);
    }
}
