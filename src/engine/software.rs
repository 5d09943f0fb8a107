use std::collections::HashMap;
use std::mem;

use image::{Pixel, RgbaImage};
use smallvec::SmallVec;

use super::{DisplayConfig, Engine, NodeState, RasterEngine, SubTex, TextureHandle, Time};

use crate::errors::*;
use crate::math::{Affine, Point2};
use crate::scene::{NodeHandle, Scene};
use crate::utils::{ObjectPool, Rect};

/// A portable backend that rasterizes sprites on the CPU.
///
/// Every node maps the unit square onto its parent's space. A sub-texture of
/// any size is scaled to that unit square, and the whole scene is scaled by
/// `DisplayConfig::pixels_per_pt` at the root. Pixels are sampled at their
/// centres with nearest-neighbour filtering, and composited over the
/// destination.
#[derive(Default)]
pub struct SoftwareEngine {
    nodes: HashMap<NodeHandle, NodeState>,
    textures: ObjectPool<TextureHandle, RgbaImage>,
    canvas: RgbaImage,
    frames: u64,
}

impl SoftwareEngine {
    /// Creates a engine without a canvas of its own. It is meant to draw into
    /// buffers handed to `render_into`.
    pub fn new() -> Self {
        SoftwareEngine::default()
    }

    /// Creates a engine that `render`s into a canvas of `width` x `height`.
    pub fn with_canvas(width: u32, height: u32) -> Self {
        SoftwareEngine {
            canvas: RgbaImage::new(width, height),
            ..Default::default()
        }
    }

    #[inline]
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    #[inline]
    pub fn canvas_mut(&mut self) -> &mut RgbaImage {
        &mut self.canvas
    }

    #[inline]
    pub fn is_registered(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(&node)
    }

    #[inline]
    pub fn state(&self, node: NodeHandle) -> Option<&NodeState> {
        self.nodes.get(&node)
    }

    #[inline]
    pub fn texture(&self, texture: TextureHandle) -> Option<&RgbaImage> {
        self.textures.get(texture)
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn state_mut(&mut self, node: NodeHandle) -> Result<&mut NodeState> {
        self.nodes
            .get_mut(&node)
            .ok_or(Error::NodeNotRegistered(node))
    }

    fn draw(&self, sub_tex: SubTex, transform: Affine, dst: &mut RgbaImage) {
        let texture = match self.textures.get(sub_tex.texture) {
            Some(texture) => texture,
            None => return,
        };

        let region = sub_tex.region;
        if region.is_empty() {
            return;
        }

        let (tw, th) = texture.dimensions();
        let bounds = Rect::from_corners(0, 0, tw as i32, th as i32);
        let (rw, rh) = (region.width() as f32, region.height() as f32);

        // Maps the pixels of the region onto the unit square first.
        let m = transform * Affine::scale(1.0 / rw, 1.0 / rh);
        let inv = match m.inverse() {
            Some(inv) => inv,
            None => return,
        };

        let (dw, dh) = dst.dimensions();
        let area = Self::covered(&m, rw, rh).overlap(Rect::from_corners(0, 0, dw as i32, dh as i32));

        for y in area.min.y..area.max.y {
            for x in area.min.x..area.max.x {
                let p = inv.transform_point(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
                if p.x < 0.0 || p.y < 0.0 || p.x >= rw || p.y >= rh {
                    continue;
                }

                let (sx, sy) = match (
                    region.min.x.checked_add(p.x as i32),
                    region.min.y.checked_add(p.y as i32),
                ) {
                    (Some(sx), Some(sy)) if bounds.contains([sx, sy]) => (sx, sy),
                    _ => continue,
                };

                let src = *texture.get_pixel(sx as u32, sy as u32);
                match src[3] {
                    0 => {}
                    255 => dst.put_pixel(x as u32, y as u32, src),
                    _ => dst.get_pixel_mut(x as u32, y as u32).blend(&src),
                }
            }
        }
    }

    // Bounding box of the destination pixels covered by the transformed region.
    fn covered(m: &Affine, w: f32, h: f32) -> Rect {
        let corners = [
            m.transform_point(Point2::new(0.0, 0.0)),
            m.transform_point(Point2::new(w, 0.0)),
            m.transform_point(Point2::new(0.0, h)),
            m.transform_point(Point2::new(w, h)),
        ];

        let (mut x0, mut y0) = (std::f32::MAX, std::f32::MAX);
        let (mut x1, mut y1) = (std::f32::MIN, std::f32::MIN);
        for v in &corners {
            x0 = x0.min(v.x);
            y0 = y0.min(v.y);
            x1 = x1.max(v.x);
            y1 = y1.max(v.y);
        }

        Rect::from_corners(
            x0.floor() as i32,
            y0.floor() as i32,
            x1.ceil() as i32,
            y1.ceil() as i32,
        )
    }
}

impl Engine for SoftwareEngine {
    fn register(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        if !scene.contains(node) {
            return Err(Error::NodeHandleInvalid(node));
        }

        if self.nodes.contains_key(&node) {
            return Err(Error::NodeAlreadyRegistered(node));
        }

        self.nodes.insert(node, NodeState::default());
        trace!("[SoftwareEngine] registers {}.", node);
        Ok(())
    }

    fn unregister(&mut self, _: &mut Scene, node: NodeHandle) -> Result<()> {
        self.nodes
            .remove(&node)
            .ok_or(Error::NodeNotRegistered(node))?;

        trace!("[SoftwareEngine] unregisters {}.", node);
        Ok(())
    }

    fn load_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::TextureEmpty(w, h));
        }

        let handle = self.textures.create(image.clone());
        debug!("[SoftwareEngine] creates {} ({}x{}).", handle, w, h);
        Ok(handle)
    }

    fn set_sub_tex(&mut self, node: NodeHandle, sub_tex: SubTex) -> Result<()> {
        if !self.textures.contains(sub_tex.texture) {
            return Err(Error::TextureHandleInvalid(sub_tex.texture));
        }

        if !sub_tex.region.is_valid() {
            return Err(Error::RegionInvalid(sub_tex.region));
        }

        self.state_mut(node)?.sub_tex = Some(sub_tex);
        Ok(())
    }

    fn set_transform(&mut self, node: NodeHandle, transform: Affine) -> Result<()> {
        self.state_mut(node)?.transform = transform;
        Ok(())
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        root: NodeHandle,
        time: Time,
        config: &DisplayConfig,
    ) -> Result<()> {
        let mut canvas = mem::take(&mut self.canvas);
        let result = self.render_into(scene, root, time, config, &mut canvas);
        self.canvas = canvas;
        result
    }
}

impl RasterEngine for SoftwareEngine {
    fn render_into(
        &mut self,
        scene: &mut Scene,
        root: NodeHandle,
        time: Time,
        config: &DisplayConfig,
        dst: &mut RgbaImage,
    ) -> Result<()> {
        if !scene.contains(root) {
            return Err(Error::NodeHandleInvalid(root));
        }

        if !self.nodes.contains_key(&root) {
            return Err(Error::NodeNotRegistered(root));
        }

        let ppp = config.pixels_per_pt;
        let mut stack = vec![(root, Affine::scale(ppp, ppp))];

        while let Some((node, parent)) = stack.pop() {
            // Unregistered nodes are pruned with their subtrees.
            if !self.nodes.contains_key(&node) {
                continue;
            }

            scene.arrange(self, node, time)?;

            let state = match self.nodes.get(&node) {
                Some(state) => *state,
                None => continue,
            };

            let abs = parent * state.transform;
            if let Some(sub_tex) = state.sub_tex {
                self.draw(sub_tex, abs, dst);
            }

            let children: SmallVec<[NodeHandle; 8]> = scene.children(node).collect();
            stack.extend(children.into_iter().rev().map(|v| (v, abs)));
        }

        self.frames += 1;
        Ok(())
    }
}
