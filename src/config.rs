//! Run configuration, read from an optional JSON file.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;

use crate::{
    abs::TextureImage,
    error::SetupError,
    frame::{FrameOrder, LoopSettings},
    scene::{KITTEN_PNG, PUPPY_PNG, Preset},
};

const CONFIG_DIR: &str = "spinquad";
const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "OpenGL".to_string(),
            width: 800,
            height: 600,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub window: WindowConfig,
    pub preset: Preset,
    /// Image files sampled by the preset, in texture-unit order. Empty means the
    /// embedded images.
    pub textures: Vec<PathBuf>,
    /// Degrees per second.
    pub rotation_speed: f32,
    pub background: [f32; 4],
    pub frame_order: FrameOrder,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            preset: Preset::default(),
            textures: Vec::new(),
            rotation_speed: 180.0,
            background: [0.0, 0.0, 0.0, 1.0],
            frame_order: FrameOrder::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SetupError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SetupError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let json = std::fs::read_to_string(path).map_err(|source| SetupError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Uses `explicit` if given, else `<config dir>/spinquad/config.json` if it
    /// exists, else the defaults.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, SetupError> {
        let path = explicit.or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
                .filter(|path| path.is_file())
        });
        match path {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(SetupError::Config(format!(
                "window size {}x{} must be non-zero",
                self.window.width, self.window.height
            )));
        }
        if !self.rotation_speed.is_finite() {
            return Err(SetupError::Config("rotation_speed must be finite".to_string()));
        }
        let needed = self.preset.features().textures;
        if !self.textures.is_empty() && self.textures.len() != needed {
            return Err(SetupError::Config(format!(
                "preset {} samples {needed} textures, {} configured",
                self.preset,
                self.textures.len()
            )));
        }
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<log::LevelFilter, SetupError> {
        log::LevelFilter::from_str(&self.log_level)
            .map_err(|_| SetupError::Config(format!("unknown log level `{}`", self.log_level)))
    }

    pub fn aspect(&self) -> f32 {
        self.window.width as f32 / self.window.height as f32
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            background: self.background,
            rotation_speed: self.rotation_speed,
            order: self.frame_order,
        }
    }

    /// Decodes the images the preset samples, from the configured files or the
    /// embedded defaults.
    pub fn load_textures(&self) -> Result<Vec<TextureImage>, SetupError> {
        let needed = self.preset.features().textures;
        if self.textures.is_empty() {
            [("kitten.png", KITTEN_PNG), ("puppy.png", PUPPY_PNG)]
                .into_iter()
                .take(needed)
                .map(|(name, bytes)| TextureImage::from_memory(name, bytes))
                .collect()
        } else {
            self.textures
                .iter()
                .map(|path| TextureImage::load(path))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.window.title, "OpenGL");
        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert_eq!(config.preset, Preset::SpinningQuad);
        assert_eq!(config.rotation_speed, 180.0);
        assert_eq!(config.level_filter().unwrap(), log::LevelFilter::Info);
    }

    #[test]
    fn test_partial_document() {
        let config = Config::from_json(
            r#"{ "window": { "width": 1024 }, "preset": "colored-triangle", "frame_order": "update-then-draw" }"#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.preset, Preset::ColoredTriangle);
        assert_eq!(config.loop_settings().order, FrameOrder::UpdateThenDraw);
    }

    #[test]
    fn test_invalid_documents_rejected() {
        for json in [
            r#"{ "window": { "width": 0 } }"#,
            r#"{ "preset": "cube" }"#,
            r#"{ "log_level": "loud" }"#,
            r#"{ "unknown": 1 }"#,
            r#"{ "preset": "textured-quad", "textures": ["a.png", "b.png"] }"#,
        ] {
            assert!(
                matches!(Config::from_json(json), Err(SetupError::Config(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::resolve(Some(PathBuf::from("no/such/config.json")))
            .err()
            .unwrap();
        assert!(matches!(err, SetupError::ConfigIo { .. }));
    }

    #[test]
    fn test_embedded_textures_match_preset() {
        for preset in Preset::ALL {
            let config = Config {
                preset,
                ..Config::default()
            };
            let textures = config.load_textures().unwrap();
            assert_eq!(textures.len(), preset.features().textures, "{preset}");
        }
    }
}
