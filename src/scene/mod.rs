//! The sprite scene graph.
//!
//! A `Scene` is an arena of nodes addressed by versioned `NodeHandle`s. Nodes
//! keep their tree relationships as plain handles, so the graph could be walked
//! and rewritten without any shared ownership. Per-frame animation is attached
//! to nodes as `Arranger`s, which are fired by the rendering backends.

mod arranger;
mod graph;

pub use self::arranger::Arranger;
pub use self::graph::{Ancestors, Children, Descendants, Links, Scene};

impl_handle!(NodeHandle);
