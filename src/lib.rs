//! # What is This?
//!
//! `sprite-mirror` keeps a second, software-rasterized copy of a sprite scene
//! in lockstep with an interactive renderer, so the picture on screen could be
//! captured as a still image at any time without slowing the renderer down.
//!
//! The entry point is `MirrorEngine`, which wraps any `Engine` and is itself an
//! `Engine`. Applications drive it exactly like the renderer it wraps:
//!
//! ```rust
//! use sprite_mirror::prelude::*;
//!
//! let mut scene = Scene::new();
//! let mut mirror = MirrorEngine::new(HeadlessEngine::new(), &MirrorParams::default()).unwrap();
//!
//! let root = scene.create();
//! mirror.register(&mut scene, root).unwrap();
//! mirror.render(&mut scene, root, Time(0), &DisplayConfig::default()).unwrap();
//!
//! let mut png = Vec::new();
//! mirror.write_to(&mut png).unwrap();
//! ```
//!
//! Snapshots could be read from any thread with the `Snapshot` handle, or
//! served over HTTP with `SnapshotServer`.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

#[macro_use]
pub mod utils;

pub mod engine;
pub mod errors;
pub mod math;
pub mod mirror;
pub mod scene;
pub mod server;
pub mod settings;

pub mod prelude;

pub use self::engine::{Engine, RasterEngine};
pub use self::errors::{Error, Result};
pub use self::mirror::{MirrorEngine, Snapshot};
pub use self::scene::Scene;
