use std::sync::{Arc, Mutex, MutexGuard, Weak};

use image::RgbaImage;

use super::link::ShadowLink;

use crate::engine::{DisplayConfig, Engine, RasterEngine, SubTex, TextureHandle, Time};
use crate::errors::*;
use crate::math::Affine;
use crate::scene::{Arranger, Links, NodeHandle, Scene};

/// Decorates an arranger so that everything it does to the engine is fanned
/// out to the shadow backend as well.
pub struct MirroredArranger<S> {
    inner: Box<dyn Arranger>,
    link: Weak<Mutex<ShadowLink<S>>>,
}

impl<S> MirroredArranger<S> {
    pub(crate) fn new(inner: Box<dyn Arranger>, link: Weak<Mutex<ShadowLink<S>>>) -> Self {
        MirroredArranger { inner, link }
    }
}

impl<S> Arranger for MirroredArranger<S>
where
    S: RasterEngine + Send + 'static,
{
    fn arrange(&mut self, engine: &mut dyn Engine, node: NodeHandle, time: Time) -> Result<()> {
        match self.link.upgrade() {
            Some(link) => {
                let mut relay = Relay::new(engine, &link);
                self.inner.arrange(&mut relay, node, time)
            }
            // The mirror is gone, so there is nothing to fan out to.
            None => self.inner.arrange(engine, node, time),
        }
    }

    fn is_mirrored(&self) -> bool {
        true
    }
}

/// The fan-out view of a mirror. Each call is applied to the primary backend
/// first, and replayed on the shadow backend through the identity tables once
/// the primary succeeded.
pub struct Relay<'a, S> {
    primary: &'a mut dyn Engine,
    link: &'a Arc<Mutex<ShadowLink<S>>>,
}

impl<'a, S> Relay<'a, S>
where
    S: RasterEngine + Send + 'static,
{
    pub(crate) fn new(primary: &'a mut dyn Engine, link: &'a Arc<Mutex<ShadowLink<S>>>) -> Self {
        Relay { primary, link }
    }

    fn lock(&self) -> Result<MutexGuard<'a, ShadowLink<S>>> {
        self.link.lock().map_err(|_| Error::Poisoned)
    }

    fn shadow_failure(op: &str, err: Error) -> Error {
        warn!(
            "[MirrorEngine] {} succeeded on the primary backend but failed on the shadow: {}",
            op, err
        );

        Error::Shadow(Box::new(err))
    }
}

impl<'a, S> Engine for Relay<'a, S>
where
    S: RasterEngine + Send + 'static,
{
    fn register(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        if self.lock()?.nodes.contains(node) {
            return Err(Error::NodeAlreadyRegistered(node));
        }

        self.primary.register(scene, node)?;

        let mut guard = self.lock()?;
        let link = &mut *guard;

        let shadow = link.scene.create();
        if let Err(err) = link.engine.register(&mut link.scene, shadow) {
            link.scene.delete(shadow)?;
            return Err(Self::shadow_failure("register", err));
        }

        link.nodes.bind(node, shadow);
        debug!("[MirrorEngine] registers {} as {}.", node, shadow);

        link.resync(scene, node, &Arc::downgrade(self.link))
    }

    fn unregister(&mut self, scene: &mut Scene, node: NodeHandle) -> Result<()> {
        if !self.lock()?.nodes.contains(node) {
            return Err(Error::NodeNotRegistered(node));
        }

        self.primary.unregister(scene, node)?;

        let mut guard = self.lock()?;
        let link = &mut *guard;

        if let Some(shadow) = link.nodes.unbind(node) {
            let result = link.engine.unregister(&mut link.scene, shadow);

            // Links of the shadow graph may be stale until the next resync, so
            // the node is cut loose before it is deleted.
            link.scene.set_links(shadow, Links::default())?;
            link.scene.delete(shadow)?;
            debug!("[MirrorEngine] unregisters {} ({}).", node, shadow);
            result.map_err(|err| Self::shadow_failure("unregister", err))?;
        }

        Ok(())
    }

    fn load_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle> {
        let texture = self.primary.load_texture(image)?;

        let mut link = self.lock()?;
        let shadow = link
            .engine
            .load_texture(image)
            .map_err(|err| Self::shadow_failure("load_texture", err))?;

        link.textures.bind(texture, shadow);
        debug!("[MirrorEngine] loads {} as {}.", texture, shadow);
        Ok(texture)
    }

    fn set_sub_tex(&mut self, node: NodeHandle, sub_tex: SubTex) -> Result<()> {
        if !sub_tex.region.is_valid() {
            return Err(Error::RegionInvalid(sub_tex.region));
        }

        let (shadow, texture) = {
            let link = self.lock()?;
            let shadow = link.nodes.get(node).ok_or(Error::NodeNotRegistered(node))?;
            let texture = link
                .textures
                .get(sub_tex.texture)
                .ok_or(Error::TextureHandleInvalid(sub_tex.texture))?;
            (shadow, texture)
        };

        self.primary.set_sub_tex(node, sub_tex)?;

        let shadow_sub_tex = SubTex::new(texture, sub_tex.region);
        self.lock()?
            .engine
            .set_sub_tex(shadow, shadow_sub_tex)
            .map_err(|err| Self::shadow_failure("set_sub_tex", err))
    }

    fn set_transform(&mut self, node: NodeHandle, transform: Affine) -> Result<()> {
        let shadow = self
            .lock()?
            .nodes
            .get(node)
            .ok_or(Error::NodeNotRegistered(node))?;

        self.primary.set_transform(node, transform)?;

        self.lock()?
            .engine
            .set_transform(shadow, transform)
            .map_err(|err| Self::shadow_failure("set_transform", err))
    }

    fn render(&mut self, _: &mut Scene, _: NodeHandle, _: Time, _: &DisplayConfig) -> Result<()> {
        Err(Error::NestedRender)
    }
}
