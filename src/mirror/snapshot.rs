use std::io::Write;
use std::sync::{Arc, RwLock};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::errors::*;
use crate::math::Vector2;

/// A read-only handle to the framebuffer of a mirror. It could be cloned and
/// sent to any number of reader threads.
///
/// Readers hold the shared lock of the framebuffer while encoding, so they
/// always observe a whole render pass.
#[derive(Clone)]
pub struct Snapshot {
    frame: Arc<RwLock<RgbaImage>>,
}

impl Snapshot {
    pub(crate) fn new(frame: Arc<RwLock<RgbaImage>>) -> Self {
        Snapshot { frame }
    }

    pub fn dimensions(&self) -> Result<Vector2<u32>> {
        let frame = self.frame.read().map_err(|_| Error::Poisoned)?;
        let (w, h) = frame.dimensions();
        Ok(Vector2::new(w, h))
    }

    /// Encodes the current frame as PNG into `w`.
    pub fn write_png<W: Write>(&self, w: W) -> Result<()> {
        let frame = self.frame.read().map_err(|_| Error::Poisoned)?;
        let (width, height) = frame.dimensions();

        PngEncoder::new(w).write_image(
            frame.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        )?;

        Ok(())
    }

    /// Copies the current frame.
    pub fn to_image(&self) -> Result<RgbaImage> {
        let frame = self.frame.read().map_err(|_| Error::Poisoned)?;
        Ok(frame.clone())
    }
}
