pub use crate::engine::{
    DisplayConfig, Engine, HeadlessEngine, NodeState, RasterEngine, SoftwareEngine, SubTex,
    TextureHandle, Time,
};
pub use crate::errors::{Error, Result};
pub use crate::math::Affine;
pub use crate::mirror::{MirrorEngine, Snapshot};
pub use crate::scene::{Arranger, Links, NodeHandle, Scene};
pub use crate::server::SnapshotServer;
pub use crate::settings::{MirrorParams, ServerParams, Settings};
pub use crate::utils::prelude::*;
