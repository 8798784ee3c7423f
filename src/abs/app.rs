//! SDL2 and OpenGL application management.
//!
//! This module defines the [`App`] struct which encapsulates the SDL2 window and
//! the OpenGL 3.2 core context the renderer draws into.

use std::sync::Arc;

use glow::HasContext;
use sdl2::{event::Event, keyboard::Keycode};

use crate::{
    abs::GlDevice,
    error::SetupError,
    frame::{Key, Platform, PlatformEvent},
};

/// The [`App`] struct encapsulates the SDL2 and OpenGL context.
pub struct App {
    pub sdl: sdl2::Sdl,
    pub video_subsystem: sdl2::VideoSubsystem,
    pub window: sdl2::video::Window,
    pub gl_context: sdl2::video::GLContext,
    pub gl: Arc<GlDevice>,
    pub event_pump: sdl2::EventPump,
}

impl App {
    /// Creates a new [`App`] with a visible window of the given title and size.
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self, SetupError> {
        Self::create(title, width, height, false)
    }

    /// Creates an [`App`] whose window is never shown, for offscreen rendering.
    pub fn hidden(width: u32, height: u32) -> Result<Self, SetupError> {
        Self::create("offscreen", width, height, true)
    }

    fn create(title: &str, width: u32, height: u32, hidden: bool) -> Result<Self, SetupError> {
        let sdl = sdl2::init().map_err(SetupError::Platform)?;
        let video_subsystem = sdl.video().map_err(SetupError::Platform)?;
        let gl_attr = video_subsystem.gl_attr();
        gl_attr.set_context_profile(sdl2::video::GLProfile::Core);
        gl_attr.set_context_version(3, 2);

        let mut builder = video_subsystem.window(title, width, height);
        builder.opengl().position(100, 100);
        if hidden {
            builder.hidden();
        }
        let window = builder
            .build()
            .map_err(|e| SetupError::Platform(e.to_string()))?;
        let gl_context = window.gl_create_context().map_err(SetupError::Platform)?;
        window
            .gl_make_current(&gl_context)
            .map_err(SetupError::Platform)?;

        if let Err(e) = video_subsystem.gl_set_swap_interval(sdl2::video::SwapInterval::VSync) {
            log::warn!("vsync unavailable: {e}");
        }

        let gl = unsafe {
            glow::Context::from_loader_function(|s| {
                video_subsystem.gl_get_proc_address(s) as *const _
            })
        };
        let event_pump = sdl.event_pump().map_err(SetupError::Platform)?;

        let version = gl.version();
        require_gl_32(version)?;
        log::info!(
            "created {width}x{height} window with an OpenGL {}.{} context ({})",
            version.major,
            version.minor,
            version.vendor_info
        );

        Ok(Self {
            sdl,
            video_subsystem,
            window,
            gl_context,
            gl: Arc::new(GlDevice::new(gl)),
            event_pump,
        })
    }
}

/// Rejects contexts older than desktop OpenGL 3.2. The requested version is only a
/// hint, so the check runs against what the driver actually created.
fn require_gl_32(version: &glow::Version) -> Result<(), SetupError> {
    if version.is_embedded || (version.major, version.minor) < (3, 2) {
        return Err(SetupError::Platform(format!(
            "OpenGL 3.2 core required, driver created {}{}.{} ({})",
            if version.is_embedded { "ES " } else { "" },
            version.major,
            version.minor,
            version.vendor_info
        )));
    }
    Ok(())
}

impl Platform for App {
    fn poll_event(&mut self) -> Option<PlatformEvent> {
        self.event_pump.poll_event().map(|event| match event {
            Event::Quit { .. } => PlatformEvent::Quit,
            Event::KeyUp {
                keycode: Some(keycode),
                ..
            } => PlatformEvent::KeyReleased(if keycode == Keycode::Escape {
                Key::Escape
            } else {
                Key::Other
            }),
            _ => PlatformEvent::Other,
        })
    }

    fn present(&mut self) {
        self.window.gl_swap_window();
    }
}
