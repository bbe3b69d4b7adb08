//! Decoded icon pixels.

use std::path::Path;

use crate::error::{Error, Result};

/// An icon decoded to RGBA pixels, ready for the host to render.
///
/// Icons are small and shared between many rows, so the registry keeps them
/// behind an `Arc` and hands out clones of the pointer.
#[derive(Clone, PartialEq, Eq)]
pub struct IconImage {
    /// RGBA pixel data (32 bits per pixel, row-major order).
    rgba: Vec<u8>,
    width: u32,
    height: u32,
}

impl IconImage {
    /// Create an icon from raw RGBA pixel data.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero or the data size does
    /// not match `width * height * 4`.
    pub fn from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::image_load(
                "<memory>",
                "width and height must be non-zero",
            ));
        }

        let expected_size = (width as usize) * (height as usize) * 4;
        if rgba.len() != expected_size {
            return Err(Error::image_load(
                "<memory>",
                format!("expected {} bytes, got {}", expected_size, rgba.len()),
            ));
        }

        Ok(Self {
            rgba,
            width,
            height,
        })
    }

    /// Load and decode an icon file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let img = image::open(path).map_err(|e| Error::image_load(path, e.to_string()))?;

        let rgba_image = img.to_rgba8();
        let width = rgba_image.width();
        let height = rgba_image.height();

        Ok(Self {
            rgba: rgba_image.into_raw(),
            width,
            height,
        })
    }

    /// Icon width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Icon height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA pixel data.
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

impl std::fmt::Debug for IconImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data_len", &self.rgba.len())
            .finish()
    }
}
