use crate::engine::{Engine, Time};
use crate::errors::*;
use crate::utils::ObjectPool;

use super::arranger::Arranger;
use super::NodeHandle;

/// Tree relationships of a node. These are structural references into the
/// owning `Scene`, not ownership.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Links {
    pub parent: Option<NodeHandle>,
    pub first_child: Option<NodeHandle>,
    pub last_child: Option<NodeHandle>,
    pub prev_sib: Option<NodeHandle>,
    pub next_sib: Option<NodeHandle>,
}

impl Links {
    /// Rewrites every present link with `func`.
    pub fn map<F>(&self, mut func: F) -> Links
    where
        F: FnMut(NodeHandle) -> Option<NodeHandle>,
    {
        Links {
            parent: self.parent.and_then(&mut func),
            first_child: self.first_child.and_then(&mut func),
            last_child: self.last_child.and_then(&mut func),
            prev_sib: self.prev_sib.and_then(&mut func),
            next_sib: self.next_sib.and_then(&mut func),
        }
    }

    /// Returns true if the node has neither a parent nor siblings.
    #[inline]
    pub fn is_detached(&self) -> bool {
        self.parent.is_none() && self.prev_sib.is_none() && self.next_sib.is_none()
    }
}

#[derive(Default)]
struct Node {
    links: Links,
    arranger: Option<Box<dyn Arranger>>,
}

/// An arena of sprite nodes. It may hold several disjoint trees, a render
/// call names the root it starts from.
#[derive(Default)]
pub struct Scene {
    nodes: ObjectPool<NodeHandle, Node>,
}

impl Scene {
    pub fn new() -> Self {
        Scene {
            nodes: ObjectPool::new(),
        }
    }

    /// Creates a detached node.
    pub fn create(&mut self) -> NodeHandle {
        self.nodes.create(Node::default())
    }

    /// Deletes a node. It is detached from its parent first, and its children
    /// become roots of their own. Descendants are never deleted with it.
    pub fn delete(&mut self, node: NodeHandle) -> Result<()> {
        let links = self.links(node).ok_or(Error::NodeHandleInvalid(node))?;

        if let Some(parent) = links.parent {
            self.remove_child(parent, node)?;
        }

        let children: Vec<_> = self.children(node).collect();
        for child in children {
            if let Some(v) = self.nodes.get_mut(child) {
                v.links.parent = None;
                v.links.prev_sib = None;
                v.links.next_sib = None;
            }
        }

        self.nodes.free(node);
        Ok(())
    }

    #[inline]
    pub fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains(node)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns an iterator over every alive node.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.nodes.iter()
    }

    #[inline]
    pub fn links(&self, node: NodeHandle) -> Option<Links> {
        self.nodes.get(node).map(|v| v.links)
    }

    /// Overwrites the links of `node` without touching the nodes it points to.
    pub(crate) fn set_links(&mut self, node: NodeHandle, links: Links) -> Result<()> {
        let v = self
            .nodes
            .get_mut(node)
            .ok_or(Error::NodeHandleInvalid(node))?;
        v.links = links;
        Ok(())
    }
}

impl Scene {
    #[inline]
    pub fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.links(node).and_then(|v| v.parent)
    }

    #[inline]
    pub fn first_child(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.links(node).and_then(|v| v.first_child)
    }

    #[inline]
    pub fn last_child(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.links(node).and_then(|v| v.last_child)
    }

    #[inline]
    pub fn prev_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.links(node).and_then(|v| v.prev_sib)
    }

    #[inline]
    pub fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.links(node).and_then(|v| v.next_sib)
    }

    /// Returns true if this is the root of a hierarchy, aka. has no parent.
    #[inline]
    pub fn is_root(&self, node: NodeHandle) -> bool {
        self.links(node)
            .map(|v| v.parent.is_none())
            .unwrap_or(false)
    }

    /// Returns true if this is the leaf of a hierarchy, aka. has no child.
    #[inline]
    pub fn is_leaf(&self, node: NodeHandle) -> bool {
        self.links(node)
            .map(|v| v.first_child.is_none())
            .unwrap_or(false)
    }

    /// Adds `child` as the last child of `parent`. The child must be detached.
    pub fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        let parent_links = self.links(parent).ok_or(Error::NodeHandleInvalid(parent))?;
        let child_links = self.links(child).ok_or(Error::NodeHandleInvalid(child))?;

        if !child_links.is_detached() {
            return Err(Error::NodeAttached(child));
        }

        if parent == child || self.ancestors(parent).any(|v| v == child) {
            return Err(Error::CyclicHierarchy { parent, child });
        }

        let last = parent_links.last_child;
        if let Some(last) = last {
            if let Some(v) = self.nodes.get_mut(last) {
                v.links.next_sib = Some(child);
            }
        }

        if let Some(v) = self.nodes.get_mut(parent) {
            if last.is_none() {
                v.links.first_child = Some(child);
            }

            v.links.last_child = Some(child);
        }

        if let Some(v) = self.nodes.get_mut(child) {
            v.links.parent = Some(parent);
            v.links.prev_sib = last;
        }

        Ok(())
    }

    /// Detaches `child` from `parent` and its siblings. Children of `child`
    /// are not affected.
    pub fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        let parent_links = self.links(parent).ok_or(Error::NodeHandleInvalid(parent))?;
        let child_links = self.links(child).ok_or(Error::NodeHandleInvalid(child))?;

        if child_links.parent != Some(parent) {
            return Err(Error::NotChild { parent, child });
        }

        if let Some(v) = self.nodes.get_mut(parent) {
            if parent_links.first_child == Some(child) {
                v.links.first_child = child_links.next_sib;
            }

            if parent_links.last_child == Some(child) {
                v.links.last_child = child_links.prev_sib;
            }
        }

        if let Some(prev) = child_links.prev_sib {
            if let Some(v) = self.nodes.get_mut(prev) {
                v.links.next_sib = child_links.next_sib;
            }
        }

        if let Some(next) = child_links.next_sib {
            if let Some(v) = self.nodes.get_mut(next) {
                v.links.prev_sib = child_links.prev_sib;
            }
        }

        if let Some(v) = self.nodes.get_mut(child) {
            v.links.parent = None;
            v.links.prev_sib = None;
            v.links.next_sib = None;
        }

        Ok(())
    }

    /// Returns an iterator of its ancestors, from the parent up to the root.
    #[inline]
    pub fn ancestors(&self, node: NodeHandle) -> Ancestors {
        Ancestors {
            cursor: self.parent(node),
            scene: self,
        }
    }

    /// Returns an iterator of its children, in sibling order.
    #[inline]
    pub fn children(&self, node: NodeHandle) -> Children {
        Children {
            cursor: self.first_child(node),
            scene: self,
        }
    }

    /// Returns an iterator of its descendants in tree order (pre-order, the node
    /// itself excluded).
    #[inline]
    pub fn descendants(&self, node: NodeHandle) -> Descendants {
        Descendants {
            root: node,
            cursor: self.first_child(node),
            scene: self,
        }
    }
}

impl Scene {
    /// Attaches an arranger to `node`, replacing the previous one.
    pub fn set_arranger<T>(&mut self, node: NodeHandle, arranger: T) -> Result<()>
    where
        T: Arranger + 'static,
    {
        let v = self
            .nodes
            .get_mut(node)
            .ok_or(Error::NodeHandleInvalid(node))?;
        v.arranger = Some(Box::new(arranger));
        Ok(())
    }

    pub fn remove_arranger(&mut self, node: NodeHandle) -> Option<Box<dyn Arranger>> {
        self.nodes.get_mut(node).and_then(|v| v.arranger.take())
    }

    #[inline]
    pub fn has_arranger(&self, node: NodeHandle) -> bool {
        self.nodes
            .get(node)
            .map(|v| v.arranger.is_some())
            .unwrap_or(false)
    }

    /// Returns true if the arranger of `node` re-routes through a mirror.
    #[inline]
    pub fn is_arranger_mirrored(&self, node: NodeHandle) -> bool {
        self.nodes
            .get(node)
            .and_then(|v| v.arranger.as_ref())
            .map(|v| v.is_mirrored())
            .unwrap_or(false)
    }

    /// Fires the arranger of `node`, if there is one.
    ///
    /// The arranger is taken out of the node for the duration of the call, so
    /// it could borrow the `engine` mutably.
    pub fn arrange(&mut self, engine: &mut dyn Engine, node: NodeHandle, time: Time) -> Result<()> {
        let mut arranger = {
            let v = self
                .nodes
                .get_mut(node)
                .ok_or(Error::NodeHandleInvalid(node))?;

            match v.arranger.take() {
                Some(arranger) => arranger,
                None => return Ok(()),
            }
        };

        let result = arranger.arrange(engine, node, time);

        if let Some(v) = self.nodes.get_mut(node) {
            if v.arranger.is_none() {
                v.arranger = Some(arranger);
            }
        }

        result
    }

    /// Replaces the arranger of `node` with `wrap(arranger)`, unless it is
    /// missing or already mirrored.
    pub(crate) fn wrap_arranger<F>(&mut self, node: NodeHandle, wrap: F)
    where
        F: FnOnce(Box<dyn Arranger>) -> Box<dyn Arranger>,
    {
        if let Some(v) = self.nodes.get_mut(node) {
            let mirrored = match v.arranger {
                Some(ref arranger) => arranger.is_mirrored(),
                None => return,
            };

            if !mirrored {
                if let Some(arranger) = v.arranger.take() {
                    v.arranger = Some(wrap(arranger));
                }
            }
        }
    }
}

/// An iterator of its ancestors.
pub struct Ancestors<'a> {
    scene: &'a Scene,
    cursor: Option<NodeHandle>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor?;
        self.cursor = self.scene.parent(node);
        Some(node)
    }
}

/// An iterator of its children.
pub struct Children<'a> {
    scene: &'a Scene,
    cursor: Option<NodeHandle>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor?;
        self.cursor = self.scene.next_sibling(node);
        Some(node)
    }
}

/// An iterator of its descendants, in tree order.
pub struct Descendants<'a> {
    scene: &'a Scene,
    root: NodeHandle,
    cursor: Option<NodeHandle>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor?;
        let links = self.scene.links(node)?;

        // Deep first search when iterating children recursively.
        self.cursor = if links.first_child.is_some() {
            links.first_child
        } else {
            self.next_after(node)
        };

        Some(node)
    }
}

impl<'a> Descendants<'a> {
    // Travel back when we reach leaf-node.
    fn next_after(&self, mut node: NodeHandle) -> Option<NodeHandle> {
        loop {
            if node == self.root {
                return None;
            }

            let links = self.scene.links(node)?;
            if links.next_sib.is_some() {
                return links.next_sib;
            }

            node = links.parent?;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn links_map() {
        let mut scene = Scene::new();
        let a = scene.create();
        let b = scene.create();

        let links = Links {
            parent: Some(a),
            next_sib: Some(b),
            ..Default::default()
        };

        let mapped = links.map(|v| if v == a { Some(b) } else { None });
        assert_eq!(mapped.parent, Some(b));
        assert_eq!(mapped.next_sib, None);
        assert!(Links::default().is_detached());
        assert!(!mapped.is_detached());
    }

    #[test]
    fn wrap_once() {
        struct Marked;

        impl Arranger for Marked {
            fn arrange(&mut self, _: &mut dyn Engine, _: NodeHandle, _: Time) -> Result<()> {
                Ok(())
            }

            fn is_mirrored(&self) -> bool {
                true
            }
        }

        let mut scene = Scene::new();
        let n = scene.create();

        scene.wrap_arranger(n, |_| Box::new(Marked));
        assert!(!scene.has_arranger(n));

        scene
            .set_arranger(n, |_: &mut dyn Engine, _: NodeHandle, _: Time| -> Result<()> { Ok(()) })
            .unwrap();
        assert!(!scene.is_arranger_mirrored(n));

        scene.wrap_arranger(n, |_| Box::new(Marked));
        assert!(scene.is_arranger_mirrored(n));

        let mut count = 0;
        scene.wrap_arranger(n, |v| {
            count += 1;
            v
        });
        assert_eq!(count, 0);
    }
}
