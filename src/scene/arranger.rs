use crate::engine::{Engine, Time};
use crate::errors::*;

use super::NodeHandle;

/// Computes time-varying attributes of a node. It is invoked once per render
/// pass by the backend that walks the graph, and is free to issue any mutating
/// call on the `engine` it receives.
pub trait Arranger: Send {
    fn arrange(&mut self, engine: &mut dyn Engine, node: NodeHandle, time: Time) -> Result<()>;

    /// Returns true if this arranger already re-routes its calls through a
    /// mirror.
    fn is_mirrored(&self) -> bool {
        false
    }
}

impl<F> Arranger for F
where
    F: FnMut(&mut dyn Engine, NodeHandle, Time) -> Result<()> + Send,
{
    fn arrange(&mut self, engine: &mut dyn Engine, node: NodeHandle, time: Time) -> Result<()> {
        (self)(engine, node, time)
    }
}
