use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub ocr: Option<OcrConfig>,
    pub parsing: Option<ParsingFileConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    pub enabled: Option<bool>,
    pub dpi: Option<u32>,
    pub language: Option<String>,
    pub tessdata_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingFileConfig {
    pub earliest_birth_year: Option<i32>,
    pub date_formats: Option<Vec<String>>,
    pub name_labels: Option<Vec<String>>,
}

/// Platform config directory path: `<config_dir>/intake/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("intake").join("config.toml"))
}

/// Load config by cascading CWD `.intake.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".intake.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_ocr = base.ocr.unwrap_or_default();
    let overlay_ocr = overlay.ocr.unwrap_or_default();
    let base_parsing = base.parsing.unwrap_or_default();
    let overlay_parsing = overlay.parsing.unwrap_or_default();

    ConfigFile {
        ocr: Some(OcrConfig {
            enabled: overlay_ocr.enabled.or(base_ocr.enabled),
            dpi: overlay_ocr.dpi.or(base_ocr.dpi),
            language: overlay_ocr.language.or(base_ocr.language),
            tessdata_path: overlay_ocr.tessdata_path.or(base_ocr.tessdata_path),
        }),
        parsing: Some(ParsingFileConfig {
            earliest_birth_year: overlay_parsing
                .earliest_birth_year
                .or(base_parsing.earliest_birth_year),
            date_formats: overlay_parsing.date_formats.or(base_parsing.date_formats),
            name_labels: overlay_parsing.name_labels.or(base_parsing.name_labels),
        }),
    }
}

/// Save the current config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}
