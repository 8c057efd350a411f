use std::{fs::File, io::Read, path::Path};

use jane_eyre::eyre::{self, Context};
use serde::Deserialize;
use tracing::info;

use crate::layout::LayoutConfig;

pub static CONFIG_FILE_NAME: &str = "surflog.toml";
pub static DEFAULT_TRACE_DIR: &str = "../bin/eventlogs/";

/// Optional `surflog.toml` in the trace directory.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotConfig {
    /// Extension of trace files, without the dot.
    pub extension: String,
    /// Size of each chart, in SVG user units.
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub layout: LayoutConfig,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            extension: "surflog".to_owned(),
            width: 320.0,
            height: 240.0,
            layout: LayoutConfig::default(),
        }
    }
}

impl PlotConfig {
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let mut result = String::default();
        File::open(path)?.read_to_string(&mut result)?;
        let result: PlotConfig = toml::from_str(&result)?;

        Ok(result)
    }

    /// Loads `surflog.toml` from `dir` if it exists, otherwise the defaults.
    pub fn load_or_default(dir: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if !std::fs::exists(&path)? {
            return Ok(Self::default());
        }
        info!(?path, "Loading config");

        Self::load(&path).wrap_err_with(|| format!("Failed to load {}", path.display()))
    }
}

#[test]
fn test_config_overrides() -> eyre::Result<()> {
    let config: PlotConfig = toml::from_str(
        r#"
        extension = "log"
        items_per_row = 4
        palette = ["red", "blue"]
        "#,
    )?;
    assert_eq!(config.extension, "log");
    assert_eq!(config.layout.items_per_row, 4);
    assert_eq!(config.layout.colour(3), "blue");
    assert_eq!(config.layout.epsilon, LayoutConfig::default().epsilon);
    assert_eq!(config.width, 320.0);

    Ok(())
}

#[test]
fn test_config_defaults() -> eyre::Result<()> {
    let config: PlotConfig = toml::from_str("")?;
    assert_eq!(config, PlotConfig::default());
    assert_eq!(config.layout.items_per_row, 8);
    assert_eq!(config.layout.colour(0), "green");

    Ok(())
}
