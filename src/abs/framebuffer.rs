//! Module to work with OpenGL framebuffers.
//!
//! Provides an offscreen render target backed by an RGBA8 color texture whose
//! contents can be read back to the host.

use std::sync::Arc;

use crate::{
    abs::{Device, Texture},
    error::SetupError,
};

/// Represents an offscreen framebuffer with a single color attachment.
pub struct Framebuffer<D: Device> {
    device: Arc<D>,
    fbo: D::Framebuffer,
    color_tex: Texture<D>,
}

impl<D: Device> Framebuffer<D> {
    /// Creates a new framebuffer with the specified width and height.
    pub fn new(device: &Arc<D>, width: u32, height: u32) -> Result<Self, SetupError> {
        let color_tex = Texture::empty_rgba(device, width, height)?;
        let fbo = device
            .create_framebuffer()
            .map_err(|message| SetupError::resource("framebuffer", message))?;
        let framebuffer = Self {
            device: Arc::clone(device),
            fbo,
            color_tex,
        };

        device.bind_framebuffer(Some(fbo));
        device.attach_color_texture(framebuffer.color_tex.id);
        let complete = device.framebuffer_complete();
        device.bind_framebuffer(None);

        if !complete {
            return Err(SetupError::resource(
                "framebuffer",
                format!("{width}x{height} color attachment is incomplete"),
            ));
        }
        Ok(framebuffer)
    }

    /// Binds the framebuffer for rendering and sets the viewport to cover it.
    pub fn bind(&self) {
        self.device.bind_framebuffer(Some(self.fbo));
        self.device
            .viewport(0, 0, self.color_tex.width() as i32, self.color_tex.height() as i32);
    }

    /// Unbinds the framebuffer, reverting to the default framebuffer.
    pub fn unbind(&self) {
        self.device.bind_framebuffer(None);
    }

    /// Reads the whole color attachment back as RGBA8, bottom row first.
    pub fn read_pixels(&self) -> Vec<u8> {
        self.device.bind_framebuffer(Some(self.fbo));
        let pixels = self
            .device
            .read_pixels_rgba(0, 0, self.color_tex.width(), self.color_tex.height());
        self.device.bind_framebuffer(None);
        pixels
    }
}

impl<D: Device> Drop for Framebuffer<D> {
    fn drop(&mut self) {
        self.device.delete_framebuffer(self.fbo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abs::recording::{Call, RecordingDevice};

    #[test]
    fn test_read_back_covers_attachment() {
        let device = Arc::new(RecordingDevice::new());
        let framebuffer = Framebuffer::new(&device, 4, 2).unwrap();
        assert!(device.calls().contains(&Call::TexImage {
            width: 4,
            height: 2,
            format: crate::abs::PixelFormat::Rgba8,
            uploaded: false,
        }));

        let pixels = framebuffer.read_pixels();
        assert_eq!(pixels.len(), 4 * 2 * 4);
        assert!(device.calls().contains(&Call::ReadPixels {
            width: 4,
            height: 2,
        }));

        drop(framebuffer);
        assert_eq!(device.live_objects(), 0);
    }
}
