use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use tracing::debug;

use crate::error::{Error, Result};
use crate::viewport::AdjustMode;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// User-tunable navigation settings, read from `config.toml`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub scroll_step: f64,
    /// Negative values fall back to `scroll_step`.
    pub scroll_hstep: f64,
    pub scroll_full_overlap: f64,
    pub scroll_page_aware: bool,
    pub scroll_wrap: bool,
    pub page_padding: u32,
    pub pages_per_row: usize,
    pub first_page_column: usize,
    pub advance_pages_per_row: bool,
    pub zoom_step: u32,
    pub zoom_min: u32,
    pub zoom_max: u32,
    pub show_scrollbars: bool,
    pub scrollbar_width: f64,
    pub scrollbar_spacing: f64,
    pub link_hadjust: bool,
    pub search_hadjust: bool,
    pub abort_clear_search: bool,
    pub jumplist_size: usize,
    #[serde_as(as = "DisplayFromStr")]
    pub adjust_open: AdjustMode,
    pub bindings: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scroll_step: 40.0,
            scroll_hstep: -1.0,
            scroll_full_overlap: 0.0,
            scroll_page_aware: false,
            scroll_wrap: false,
            page_padding: 1,
            pages_per_row: 1,
            first_page_column: 1,
            advance_pages_per_row: false,
            zoom_step: 10,
            zoom_min: 10,
            zoom_max: 1000,
            show_scrollbars: false,
            scrollbar_width: 10.0,
            scrollbar_spacing: 0.0,
            link_hadjust: true,
            search_hadjust: true,
            abort_clear_search: true,
            jumplist_size: 2000,
            adjust_open: AdjustMode::BestFit,
            bindings: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn horizontal_step(&self) -> f64 {
        if self.scroll_hstep < 0.0 {
            self.scroll_step
        } else {
            self.scroll_hstep
        }
    }

    pub fn zoom_bounds(&self) -> (f64, f64) {
        let min = f64::from(self.zoom_min) / 100.0;
        let max = f64::from(self.zoom_max) / 100.0;
        (min.min(max), max.max(min))
    }

    pub fn from_toml(source: &str, path: &Path) -> Result<Self> {
        toml::from_str(source).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "no config file, using defaults");
            return Ok(Self::default());
        }
        let source = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source, path)
    }

    pub fn default_path(dirs: &ProjectDirs) -> PathBuf {
        dirs.config_dir().join(CONFIG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
scroll-step = 25
scroll-wrap = true
adjust-open = "width"

[bindings]
"J" = "navigate next"
"#,
            Path::new("inline.toml"),
        )
        .unwrap();

        assert_eq!(settings.scroll_step, 25.0);
        assert!(settings.scroll_wrap);
        assert_eq!(settings.adjust_open, AdjustMode::Width);
        assert_eq!(settings.zoom_max, 1000);
        assert_eq!(settings.bindings.get("J").map(String::as_str), Some("navigate next"));
    }

    #[test]
    fn horizontal_step_falls_back_to_vertical() {
        let mut settings = Settings::default();
        assert_eq!(settings.horizontal_step(), 40.0);
        settings.scroll_hstep = 15.0;
        assert_eq!(settings.horizontal_step(), 15.0);
    }

    #[test]
    fn missing_file_yields_defaults_and_bad_file_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert_eq!(Settings::load(&missing).unwrap(), Settings::default());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "scroll-step = \"fast\"").unwrap();
        assert!(matches!(
            Settings::load(&broken),
            Err(Error::ConfigParse { .. })
        ));
    }
}
