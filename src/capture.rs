//! Renders a single frame offscreen and writes it to an image file.

use std::{path::Path, sync::Arc};

use image::RgbaImage;

use crate::{
    abs::{Device, Framebuffer},
    error::SetupError,
    frame::LoopSettings,
    scene::Pipeline,
    transform,
};

/// Draws the frame the loop would show after `elapsed` seconds into a `width` x
/// `height` offscreen target. The returned image is top row first.
pub fn capture<D: Device>(
    device: &Arc<D>,
    pipeline: &Pipeline<D>,
    settings: &LoopSettings,
    (width, height): (u32, u32),
    elapsed: f64,
) -> Result<RgbaImage, SetupError> {
    let target = Framebuffer::new(device, width, height)?;

    pipeline.set_model(transform::model_rotation(elapsed, settings.rotation_speed));
    target.bind();
    pipeline.clear(settings.background);
    pipeline.draw();
    target.unbind();

    if let Some(code) = device.take_error() {
        return Err(SetupError::resource(
            "frame capture",
            format!("device error 0x{code:04X} while drawing"),
        ));
    }

    let pixels = target.read_pixels();
    let image = RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
        SetupError::resource(
            "frame capture",
            format!("read back fewer pixels than a {width}x{height} frame holds"),
        )
    })?;
    // GL reads bottom row first.
    Ok(image::imageops::flip_vertical(&image))
}

/// Encodes `image` in the format implied by the extension of `path`.
pub fn save(image: &RgbaImage, path: &Path) -> Result<(), SetupError> {
    image.save(path).map_err(|source| SetupError::Capture {
        path: path.to_path_buf(),
        source,
    })
}
