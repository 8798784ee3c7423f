//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::{config::Config, error::SetupError, scene::Preset};

/// Draws a spinning, textured quad with OpenGL.
#[derive(Parser, Debug)]
#[command(name = "spinquad", version)]
pub struct Args {
    /// JSON configuration file. Defaults to `<config dir>/spinquad/config.json` when
    /// that file exists.
    pub config: Option<PathBuf>,

    /// Draw this preset instead of the configured one.
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Render one frame offscreen, write it to this image file and exit.
    #[arg(long, value_name = "PATH")]
    pub screenshot: Option<PathBuf>,

    /// Seconds of animation before the captured frame.
    #[arg(long, value_name = "SECONDS", requires = "screenshot")]
    pub time: Option<f64>,
}

impl Args {
    /// Resolves the configuration file and applies the command line overrides.
    pub fn config(&self) -> Result<Config, SetupError> {
        let mut config = Config::resolve(self.config.clone())?;
        if let Some(preset) = self.preset {
            config.preset = preset;
            config.validate()?;
        }
        Ok(config)
    }
}
