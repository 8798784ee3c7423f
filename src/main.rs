use std::{path::Path, process::ExitCode};

use clap::Parser;

use crate::{
    abs::App,
    args::Args,
    config::Config,
    error::SetupError,
    frame::{FrameLoop, FrameStats, MonotonicClock},
    scene::{Pipeline, PipelineDesc},
    transform::Camera,
};

mod abs;
mod args;
mod capture;
mod config;
mod error;
mod frame;
mod logging;
mod scene;
mod transform;

fn main() -> ExitCode {
    let args = Args::parse();
    let config = args.config();
    let level = config
        .as_ref()
        .ok()
        .and_then(|config| config.level_filter().ok())
        .unwrap_or(log::LevelFilter::Info);
    if let Err(e) = logging::init(level) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let result = config.and_then(|config| match &args.screenshot {
        Some(path) => screenshot(&config, path, args.time.unwrap_or(0.0)),
        None => run(config).map(|stats| {
            log::info!("drew {} frames in {:.2}s", stats.frames, stats.elapsed);
        }),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn pipeline_desc(config: &Config) -> Result<PipelineDesc, SetupError> {
    let textures = config.load_textures()?;
    config
        .preset
        .desc(textures, &Camera::default(), config.aspect())
}

fn run(config: Config) -> Result<FrameStats, SetupError> {
    let desc = pipeline_desc(&config)?;
    let mut app = App::new(&config.window.title, config.window.width, config.window.height)?;
    let pipeline = Pipeline::build(&app.gl, desc)?;
    log::info!("pipeline ready for preset {}", config.preset);

    let frame_loop = FrameLoop::new(pipeline, MonotonicClock::start(), config.loop_settings());
    Ok(frame_loop.run(&mut app))
}

fn screenshot(config: &Config, path: &Path, elapsed: f64) -> Result<(), SetupError> {
    let desc = pipeline_desc(config)?;
    let size = (config.window.width, config.window.height);
    let app = App::hidden(size.0, size.1)?;
    let pipeline = Pipeline::build(&app.gl, desc)?;

    let image = capture::capture(&app.gl, &pipeline, &config.loop_settings(), size, elapsed)?;
    capture::save(&image, path)?;
    log::info!(
        "wrote {}x{} frame of preset {} to {}",
        size.0,
        size.1,
        config.preset,
        path.display()
    );
    Ok(())
}
