use std::collections::HashMap;

use image::RgbaImage;
use smallvec::SmallVec;

use super::{DisplayConfig, Engine, NodeState, SubTex, TextureHandle, Time};

use crate::errors::*;
use crate::math::{Affine, Vector2};
use crate::scene::{NodeHandle, Scene};
use crate::utils::ObjectPool;

/// A backend that keeps the bookkeeping of a real renderer without drawing
/// anything.
#[derive(Default)]
pub struct HeadlessEngine {
    nodes: HashMap<NodeHandle, NodeState>,
    textures: ObjectPool<TextureHandle, Vector2<u32>>,
    visited: Vec<NodeHandle>,
    frames: u64,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        HeadlessEngine::default()
    }

    #[inline]
    pub fn is_registered(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Gets the rendering attributes of a registered node.
    #[inline]
    pub fn state(&self, node: NodeHandle) -> Option<&NodeState> {
        self.nodes.get(&node)
    }

    #[inline]
    pub fn texture_dimensions(&self, texture: TextureHandle) -> Option<Vector2<u32>> {
        self.textures.get(texture).cloned()
    }

    /// Nodes visited by the last render pass, in visiting order.
    #[inline]
    pub fn visited(&self) -> &[NodeHandle] {
        &self.visited
    }

    /// Number of completed render passes.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn state_mut(&mut self, node: NodeHandle) -> Result<&mut NodeState> {
        self.nodes
            .get_mut(&node)
            .ok_or(Error::NodeNotRegistered(node))
    }
}

impl Engine for HeadlessEngine {
    fn register(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        if !scene.contains(node) {
            return Err(Error::NodeHandleInvalid(node));
        }

        if self.nodes.contains_key(&node) {
            return Err(Error::NodeAlreadyRegistered(node));
        }

        self.nodes.insert(node, NodeState::default());
        debug!("[HeadlessEngine] registers {}.", node);
        Ok(())
    }

    fn unregister(&mut self, _: &mut Scene, node: NodeHandle) -> Result<()> {
        self.nodes
            .remove(&node)
            .ok_or(Error::NodeNotRegistered(node))?;

        debug!("[HeadlessEngine] unregisters {}.", node);
        Ok(())
    }

    fn load_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::TextureEmpty(w, h));
        }

        let handle = self.textures.create(Vector2::new(w, h));
        debug!("[HeadlessEngine] creates {} ({}x{}).", handle, w, h);
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
        _: &DisplayConfig,
    ) -> Result<()> {
        if !scene.contains(root) {
            return Err(Error::NodeHandleInvalid(root));
        }

        if !self.nodes.contains_key(&root) {
            return Err(Error::NodeNotRegistered(root));
        }

        self.visited.clear();

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            // Unregistered nodes are pruned with their subtrees.
            if !self.nodes.contains_key(&node) {
                trace!("[HeadlessEngine] skips unregistered {}.", node);
                continue;
            }

            scene.arrange(self, node, time)?;
            self.visited.push(node);

            let children: SmallVec<[NodeHandle; 8]> = scene.children(node).collect();
            stack.extend(children.into_iter().rev());
        }

        self.frames += 1;
        Ok(())
    }
}
