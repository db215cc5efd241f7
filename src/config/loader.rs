use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::BaseDirs;

use crate::{Error, Result};

use super::{PluginConfig, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

/// Load `~/.pipeline_deck/config.toml`, writing the defaults there on first run.
pub fn load_or_default() -> Result<PluginConfig> {
    load_or_create().map(|(cfg, _)| cfg)
}

/// The second value is the path of the file written on first run.
pub fn load_or_create() -> Result<(PluginConfig, Option<PathBuf>)> {
    let path = config_path()?;
    if !path.exists() {
        let cfg = PluginConfig::default();
        super::validate(&cfg)?;
        cfg.save_to_path(&path)?;
        return Ok((cfg, Some(path)));
    }
    Ok((load_from_path(&path)?, None))
}

/// Missing files yield the defaults without creating anything.
pub fn load_from_path(path: &Path) -> Result<PluginConfig> {
    if !path.exists() {
        let cfg = PluginConfig::default();
        super::validate(&cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(path)?;
    parse(&raw).map_err(|err| match err {
        Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn save_to_path(config: &PluginConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string(config)
        .map_err(|e| Error::Config(format!("cannot serialize config: {e}")))?;
    fs::write(path, format!("# pipeline-deck config\n{body}"))?;
    Ok(())
}

pub fn parse(raw: &str) -> Result<PluginConfig> {
    let cfg: PluginConfig =
        toml::from_str(raw).map_err(|e| Error::Config(e.message().to_string()))?;
    super::validate(&cfg)?;
    Ok(cfg)
}

pub fn config_path() -> Result<PathBuf> {
    let base = BaseDirs::new()
        .ok_or_else(|| Error::Config("HOME not set; cannot locate config directory".into()))?;
    Ok(base.home_dir().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
