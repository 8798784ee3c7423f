//! Structs and functions for handling textures.
//!
//! The module provides [`TextureImage`], decoded RGB pixels waiting for upload, and
//! the [`Texture`] struct which is a CPU representation of a GPU texture.

use std::{path::Path, sync::Arc};

use crate::{
    abs::{Device, PixelFormat, Sampling},
    error::SetupError,
};

/// A decoded image: row-major RGB bytes, 3 per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TextureImage {
    /// Wraps raw RGB bytes. The buffer must hold exactly `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SetupError> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(SetupError::InvalidImage(format!(
                "{width}x{height} RGB image needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A 1x1 image of a single color.
    #[cfg(test)]
    pub fn solid(rgb: [u8; 3]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgb.to_vec(),
        }
    }

    /// Decodes an image file, converting it to RGB.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let image = image::open(path).map_err(|source| SetupError::Asset {
            path: path.to_path_buf(),
            source,
        })?;
        let rgb = image.to_rgb8();
        Self::from_rgb(rgb.width(), rgb.height(), rgb.into_raw())
    }

    /// Decodes an image held in memory, e.g. one embedded with `include_bytes!`.
    pub fn from_memory(name: &str, bytes: &[u8]) -> Result<Self, SetupError> {
        let image = image::load_from_memory(bytes).map_err(|source| SetupError::Asset {
            path: name.into(),
            source,
        })?;
        let rgb = image.to_rgb8();
        Self::from_rgb(rgb.width(), rgb.height(), rgb.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Represents a texture stored on the GPU side.
pub struct Texture<D: Device> {
    pub(super) device: Arc<D>,
    pub(super) id: D::Texture,
    width: u32,
    height: u32,
}

impl<D: Device> Texture<D> {
    /// Uploads `image` into a new texture: clamp-to-edge, linear filtering, no mipmaps.
    ///
    /// The image is consumed; its host-side pixels are freed once the upload returns.
    pub fn new(device: &Arc<D>, image: TextureImage) -> Result<Self, SetupError> {
        let texture = device
            .create_texture()
            .map_err(|message| SetupError::resource("texture", message))?;
        let texture = Self {
            device: Arc::clone(device),
            id: texture,
            width: image.width(),
            height: image.height(),
        };

        device.bind_texture(0, Some(texture.id));
        device.tex_image_2d(texture.width, texture.height, PixelFormat::Rgb8, Some(image.pixels()));
        device.set_sampling(Sampling::ClampLinear);
        device.bind_texture(0, None);
        drop(image);

        if let Some(code) = device.take_error() {
            return Err(SetupError::resource(
                "texture",
                format!(
                    "device error 0x{code:04X} uploading {}x{} image",
                    texture.width, texture.height
                ),
            ));
        }

        Ok(texture)
    }

    /// Allocates an RGBA8 texture without initial contents, used as a render target.
    pub fn empty_rgba(device: &Arc<D>, width: u32, height: u32) -> Result<Self, SetupError> {
        let texture = device
            .create_texture()
            .map_err(|message| SetupError::resource("texture", message))?;
        device.bind_texture(0, Some(texture));
        device.tex_image_2d(width, height, PixelFormat::Rgba8, None);
        device.set_sampling(Sampling::ClampLinear);
        device.bind_texture(0, None);

        Ok(Self {
            device: Arc::clone(device),
            id: texture,
            width,
            height,
        })
    }

    /// Returns the width of the texture.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the texture.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Binds the texture to the specified texture unit.
    pub fn bind_to_unit(&self, unit: u32) {
        self.device.bind_texture(unit, Some(self.id));
    }
}

impl<D: Device> Drop for Texture<D> {
    fn drop(&mut self) {
        self.device.delete_texture(self.id);
    }
}
