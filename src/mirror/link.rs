use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, Weak};

use crate::engine::{RasterEngine, TextureHandle};
use crate::errors::*;
use crate::scene::{Links, NodeHandle, Scene};

use super::arranger::MirroredArranger;

/// Maps entities of the primary backend to their counterparts on the shadow
/// backend.
pub struct IdentityTable<H> {
    entries: HashMap<H, H>,
}

impl<H: Hash + Eq + Copy> Default for IdentityTable<H> {
    fn default() -> Self {
        IdentityTable {
            entries: HashMap::new(),
        }
    }
}

impl<H: Hash + Eq + Copy> IdentityTable<H> {
    #[inline]
    pub fn get(&self, primary: H) -> Option<H> {
        self.entries.get(&primary).cloned()
    }

    #[inline]
    pub fn contains(&self, primary: H) -> bool {
        self.entries.contains_key(&primary)
    }

    #[inline]
    pub fn bind(&mut self, primary: H, shadow: H) {
        self.entries.insert(primary, shadow);
    }

    #[inline]
    pub fn unbind(&mut self, primary: H) -> Option<H> {
        self.entries.remove(&primary)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the primary keys.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = H> + '_ {
        self.entries.keys().cloned()
    }
}

/// Everything that lives on the shadow side of a mirror: the backend, the
/// graph of shadow nodes it renders, and the tables that lead there.
pub struct ShadowLink<S> {
    pub engine: S,
    pub scene: Scene,
    pub nodes: IdentityTable<NodeHandle>,
    pub textures: IdentityTable<TextureHandle>,
}

impl<S> ShadowLink<S>
where
    S: RasterEngine + Send + 'static,
{
    pub fn new(engine: S) -> Self {
        ShadowLink {
            engine,
            scene: Scene::new(),
            nodes: IdentityTable::default(),
            textures: IdentityTable::default(),
        }
    }

    /// Rewrites the links of the shadow counterpart of `node` after the links
    /// of `node` in the primary `scene`, and wraps its arranger.
    pub fn resync(
        &mut self,
        scene: &mut Scene,
        node: NodeHandle,
        link: &Weak<Mutex<ShadowLink<S>>>,
    ) -> Result<()> {
        let shadow = self.nodes.get(node).ok_or(Error::NodeNotRegistered(node))?;

        let links = match scene.links(node) {
            Some(links) => self.translate(scene, links),
            None => {
                warn!(
                    "[MirrorEngine] {} was deleted from its scene without being unregistered.",
                    node
                );
                Links::default()
            }
        };

        scene.wrap_arranger(node, |inner| {
            Box::new(MirroredArranger::new(inner, link.clone()))
        });

        self.scene.set_links(shadow, links)
    }

    /// Translates primary links into the shadow graph. Unregistered children
    /// and siblings are stepped over, since renderers skip them but keep
    /// walking the rest of the sibling chain.
    fn translate(&self, scene: &Scene, links: Links) -> Links {
        let forward = |v: Option<NodeHandle>| self.nearest(scene, v, |l| l.next_sib);
        let backward = |v: Option<NodeHandle>| self.nearest(scene, v, |l| l.prev_sib);

        Links {
            parent: links.parent.and_then(|v| self.nodes.get(v)),
            first_child: forward(links.first_child),
            last_child: backward(links.last_child),
            prev_sib: backward(links.prev_sib),
            next_sib: forward(links.next_sib),
        }
    }

    // Shadow of the first registered node met walking from `cursor`.
    fn nearest<F>(
        &self,
        scene: &Scene,
        mut cursor: Option<NodeHandle>,
        step: F,
    ) -> Option<NodeHandle>
    where
        F: Fn(&Links) -> Option<NodeHandle>,
    {
        while let Some(v) = cursor {
            if let Some(shadow) = self.nodes.get(v) {
                return Some(shadow);
            }

            cursor = scene.links(v).and_then(|links| step(&links));
        }

        None
    }

    /// Resyncs every registered node.
    pub fn resync_all(
        &mut self,
        scene: &mut Scene,
        link: &Weak<Mutex<ShadowLink<S>>>,
    ) -> Result<()> {
        let nodes: Vec<_> = self.nodes.keys().collect();
        for node in nodes {
            self.resync(scene, node, link)?;
        }

        Ok(())
    }
}
