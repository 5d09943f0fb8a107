//! The mirror proxy engine.
//!
//! `MirrorEngine` is a drop-in `Engine` that drives two backends at once: a
//! primary one, which is usually interactive and whose output could not be
//! read back, and a shadow `RasterEngine` which draws into a framebuffer owned
//! by the mirror.
//!
//! # Structure
//!
//! The shadow backend renders a graph of its own. For every node registered
//! through the mirror, a shadow node is allocated in a private `Scene`, and the
//! pair is recorded in an identity table. Before each render pass the links of
//! every shadow node are rewritten from the links of its primary node, so the
//! application is free to rearrange the primary graph between frames. Textures
//! are uploaded to both backends eagerly and paired the same way.
//!
//! # Arrangers
//!
//! Arrangers are fired by the primary backend while it renders, and they talk
//! to whatever engine they receive. The mirror wraps the arranger of every
//! registered node, so the wrapped callback receives a `Relay` instead, and its
//! mutations reach both backends.
//!
//! # Snapshots
//!
//! The framebuffer sits behind a reader-writer lock. A render pass holds the
//! write lock from the clear to the last shadow draw, and `Snapshot` readers
//! hold the read lock while encoding, so a reader never observes a torn frame.
//!
//! # Divergence
//!
//! A call that succeeds on the primary backend but fails on the shadow one is
//! not rolled back. It returns `Error::Shadow`, and the primary keeps the
//! change. If the shadow refuses a `register`, the node is left registered on
//! the primary without a shadow counterpart, and the mirror rejects both
//! `register` and `unregister` of it. Unregister it through `primary_mut` to
//! start over.

mod arranger;
mod link;
mod snapshot;

pub use self::arranger::{MirroredArranger, Relay};
pub use self::link::IdentityTable;
pub use self::snapshot::Snapshot;

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use image::{Rgba, RgbaImage};

use self::link::ShadowLink;

use crate::engine::{DisplayConfig, Engine, RasterEngine, SoftwareEngine, SubTex, TextureHandle, Time};
use crate::errors::*;
use crate::math::Affine;
use crate::scene::{Links, NodeHandle, Scene};
use crate::settings::MirrorParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Clearing,
    ResyncingTopology,
    RenderingPrimary,
    RenderingShadow,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Stage::Clearing => "clearing",
            Stage::ResyncingTopology => "resyncing topology",
            Stage::RenderingPrimary => "rendering primary",
            Stage::RenderingShadow => "rendering shadow",
        };

        write!(f, "{}", name)
    }
}

/// Mirrors every operation issued on a primary backend onto a shadow raster
/// backend, and keeps the rasterized output readable from other threads.
pub struct MirrorEngine<P, S = SoftwareEngine> {
    primary: P,
    link: Arc<Mutex<ShadowLink<S>>>,
    frame: Arc<RwLock<RgbaImage>>,
    background: Rgba<u8>,
    frames: u64,
}

impl<P> MirrorEngine<P, SoftwareEngine>
where
    P: Engine,
{
    /// Creates a mirror of `primary` with a `SoftwareEngine` on the shadow
    /// side.
    pub fn new(primary: P, params: &MirrorParams) -> Result<Self> {
        MirrorEngine::with_shadow(primary, SoftwareEngine::new(), params)
    }
}

impl<P, S> MirrorEngine<P, S>
where
    P: Engine,
    S: RasterEngine + Send + 'static,
{
    /// Creates a mirror of `primary`, replaying everything on `shadow`.
    pub fn with_shadow(primary: P, shadow: S, params: &MirrorParams) -> Result<Self> {
        params.validate()?;

        let (w, h) = (params.dimensions.x, params.dimensions.y);
        let background = Rgba::from(params.background);

        info!(
            "[MirrorEngine] creates a {}x{} framebuffer, cleared with {:?}.",
            w, h, background
        );

        Ok(MirrorEngine {
            primary,
            link: Arc::new(Mutex::new(ShadowLink::new(shadow))),
            frame: Arc::new(RwLock::new(RgbaImage::from_pixel(w, h, background))),
            background,
            frames: 0,
        })
    }

    #[inline]
    pub fn primary(&self) -> &P {
        &self.primary
    }

    #[inline]
    pub fn primary_mut(&mut self) -> &mut P {
        &mut self.primary
    }

    /// Gets a cloneable read handle of the framebuffer.
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.frame.clone())
    }

    /// Encodes the current frame as PNG into `w`.
    pub fn write_to<W: Write>(&self, w: W) -> Result<()> {
        self.snapshot().write_png(w)
    }

    /// Number of completed render passes.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Gets the shadow node paired with `node`.
    pub fn shadow_node(&self, node: NodeHandle) -> Result<Option<NodeHandle>> {
        Ok(self.lock()?.nodes.get(node))
    }

    /// Gets the links of the shadow node paired with `node`.
    pub fn shadow_links(&self, node: NodeHandle) -> Result<Option<Links>> {
        let link = self.lock()?;
        Ok(link.nodes.get(node).and_then(|v| link.scene.links(v)))
    }

    /// Gets the shadow texture paired with `texture`.
    pub fn shadow_texture(&self, texture: TextureHandle) -> Result<Option<TextureHandle>> {
        Ok(self.lock()?.textures.get(texture))
    }

    /// Number of nodes currently mirrored.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.nodes.len())
    }

    /// Inspects the shadow backend.
    pub fn with_shadow_engine<F, R>(&self, func: F) -> Result<R>
    where
        F: FnOnce(&S) -> R,
    {
        Ok(func(&self.lock()?.engine))
    }

    #[inline]
    fn relay(&mut self) -> Relay<S> {
        Relay::new(&mut self.primary, &self.link)
    }

    fn lock(&self) -> Result<MutexGuard<ShadowLink<S>>> {
        self.link.lock().map_err(|_| Error::Poisoned)
    }

    fn render_pass(
        &mut self,
        frame: &mut RgbaImage,
        scene: &mut Scene,
        root: NodeHandle,
        time: Time,
        config: &DisplayConfig,
    ) -> ::std::result::Result<(), (Stage, Error)> {
        trace!("[MirrorEngine] {} frame {}.", Stage::Clearing, self.frames);
        for v in frame.pixels_mut() {
            *v = self.background;
        }

        trace!("[MirrorEngine] {}.", Stage::ResyncingTopology);
        let shadow_root = {
            let stage = |err| (Stage::ResyncingTopology, err);
            let mut link = self.lock().map_err(stage)?;
            link.resync_all(scene, &Arc::downgrade(&self.link))
                .map_err(stage)?;

            link.nodes
                .get(root)
                .ok_or(Error::NodeNotRegistered(root))
                .map_err(stage)?
        };

        // The shadow side must be unlocked here, wrapped arrangers reach it
        // while the primary renders.
        trace!("[MirrorEngine] {}.", Stage::RenderingPrimary);
        self.primary
            .render(scene, root, time, config)
            .map_err(|err| (Stage::RenderingPrimary, err))?;

        trace!("[MirrorEngine] {}.", Stage::RenderingShadow);
        let stage = |err| (Stage::RenderingShadow, err);
        let mut guard = self.lock().map_err(stage)?;
        let link = &mut *guard;
        link.engine
            .render_into(&mut link.scene, shadow_root, time, config, frame)
            .map_err(|err| stage(Error::Shadow(Box::new(err))))
    }
}

impl<P, S> Engine for MirrorEngine<P, S>
where
    P: Engine,
    S: RasterEngine + Send + 'static,
{
    fn register(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        self.relay().register(scene, node)
    }

    fn unregister(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        self.relay().unregister(scene, node)
    }

    fn load_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle> {
        self.relay().load_texture(image)
    }

    fn set_sub_tex(&mut self, node: NodeHandle, sub_tex: SubTex) -> Result<()> {
        self.relay().set_sub_tex(node, sub_tex)
    }

    fn set_transform(&mut self, node: NodeHandle, transform: Affine) -> Result<()> {
        self.relay().set_transform(node, transform)
    }

    fn render(
        &mut self,
        scene: &mut Scene,
        root: NodeHandle,
        time: Time,
        config: &DisplayConfig,
    ) -> Result<()> {
        let frame = self.frame.clone();
        let mut frame = frame.write().map_err(|_| Error::Poisoned)?;

        match self.render_pass(&mut frame, scene, root, time, config) {
            Ok(()) => {
                self.frames += 1;
                Ok(())
            }
            Err((stage, err)) => {
                error!(
                    "[MirrorEngine] frame {} aborted while {}: {}",
                    self.frames, stage, err
                );
                Err(err)
            }
        }
    }
}
