//! Display adapters
//!
//! The renderer hands every finished frame to a [`Display`]. On the device
//! that is the SPI panel exposed as a Linux framebuffer.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::{Error, Result};

/// Accepts complete frames
pub trait Display: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Show one full frame
    ///
    /// # Errors
    ///
    /// Returns error if the frame cannot be written to the device
    fn show(&mut self, frame: &RgbImage) -> Result<()>;
}

/// Linux framebuffer device (e.g. `/dev/fb1` from the st7789 fbtft driver)
///
/// Frames are converted to little-endian RGB565 and written in one go.
pub struct FramebufferDisplay {
    path: PathBuf,
    device: File,
    buffer: Vec<u8>,
}

impl FramebufferDisplay {
    /// Open a framebuffer device for writing
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let device = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| Error::Display(format!("failed to open {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "framebuffer display opened");

        Ok(Self {
            path,
            device,
            buffer: Vec::new(),
        })
    }
}

impl Display for FramebufferDisplay {
    fn name(&self) -> &'static str {
        "framebuffer"
    }

    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        to_rgb565(frame, &mut self.buffer);
        self.device
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.device.write_all(&self.buffer))
            .map_err(|e| Error::Display(format!("{}: {e}", self.path.display())))
    }
}

/// Pack a frame as little-endian RGB565
pub fn to_rgb565(frame: &RgbImage, out: &mut Vec<u8>) {
    out.clear();
    out.reserve(frame.as_raw().len() / 3 * 2);
    for pixel in frame.pixels() {
        let [r, g, b] = pixel.0;
        let packed = (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
        out.extend_from_slice(&packed.to_le_bytes());
    }
}

/// Writes each frame to a PNG file, overwriting the previous one
pub struct PngDisplay {
    path: PathBuf,
}

impl PngDisplay {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Display for PngDisplay {
    fn name(&self) -> &'static str {
        "png"
    }

    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        frame
            .save(&self.path)
            .map_err(|e| Error::Display(format!("{}: {e}", self.path.display())))
    }
}

/// Discards frames (headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn name(&self) -> &'static str {
        "null"
    }

    fn show(&mut self, _frame: &RgbImage) -> Result<()> {
        Ok(())
    }
}
