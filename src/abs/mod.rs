//! This module contains the device-facing building blocks of the renderer,
//! including application setup, the device seam, shader management, meshes,
//! textures and offscreen framebuffers.

pub mod app;
pub mod device;
pub mod framebuffer;
pub mod mesh;
pub mod shader;
pub mod texture;

pub use app::*;
pub use device::*;
pub use framebuffer::*;
pub use mesh::*;
pub use shader::*;
pub use texture::*;
