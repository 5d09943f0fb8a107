//! Functions for loading mirror settings.

use serde::{Deserialize, Serialize};

use crate::errors::*;
use crate::math::Vector2;
use crate::utils::Color;

/// The largest framebuffer edge accepted, in pixels.
pub const MAX_DIMENSION: u32 = 16384;

/// A structure containing configuration data for a mirror and the listener
/// serving its snapshots. Fields missing from a JSON source keep their
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mirror: MirrorParams,
    pub server: ServerParams,
}

impl Settings {
    /// Parses and validates settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.mirror.validate()?;
        self.server.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorParams {
    /// Sets the dimensions of the framebuffer in pixels.
    pub dimensions: Vector2<u32>,
    /// Sets the color every frame is cleared with.
    pub background: Color,
}

impl Default for MirrorParams {
    fn default() -> Self {
        MirrorParams {
            dimensions: Vector2::new(800, 800),
            background: Color::white(),
        }
    }
}

impl MirrorParams {
    pub fn validate(&self) -> Result<()> {
        let (w, h) = (self.dimensions.x, self.dimensions.y);
        if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(Error::Settings(format!(
                "framebuffer dimensions {}x{} out of range.",
                w, h
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerParams {
    /// Sets the address the snapshot listener binds to.
    pub address: String,
    /// Sets how long a client may take to send its request head, in
    /// milliseconds.
    pub header_timeout_ms: u64,
}

impl Default for ServerParams {
    fn default() -> Self {
        ServerParams {
            address: "0.0.0.0:8080".to_owned(),
            header_timeout_ms: 5000,
        }
    }
}

impl ServerParams {
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::Settings("empty listener address.".to_owned()));
        }

        if self.header_timeout_ms == 0 {
            return Err(Error::Settings("zero request head timeout.".to_owned()));
        }

        Ok(())
    }
}
