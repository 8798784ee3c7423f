//! Errors that abort setup before the frame loop starts.

use std::path::PathBuf;

use thiserror::Error;

use crate::abs::{MeshError, ShaderStage};

/// A setup failure. None of these are retried: the run ends before the first frame.
#[derive(Debug, Error)]
pub enum SetupError {
    /// SDL initialisation, window creation or OpenGL context creation failed.
    #[error("platform error: {0}")]
    Platform(String),
    #[error("failed to compile {stage} shader:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("failed to link shader program:\n{log}")]
    Link { log: String },
    #[error("failed to load image {}: {source}", .path.display())]
    Asset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write image {}: {source}", .path.display())]
    Capture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid image: {0}")]
    InvalidImage(String),
    /// Object creation failed or the device flagged an error after an upload.
    #[error("failed to create {resource}: {message}")]
    Resource {
        resource: &'static str,
        message: String,
    },
    #[error("invalid mesh: {0}")]
    Mesh(#[from] MeshError),
    #[error("shader program has no `{0}` uniform")]
    MissingUniform(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to read configuration {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install logger: {0}")]
    Logging(#[from] log::SetLoggerError),
}

impl SetupError {
    pub(crate) fn resource(resource: &'static str, message: String) -> Self {
        Self::Resource { resource, message }
    }
}
