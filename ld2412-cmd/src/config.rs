use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use ld2412::SessionConfig;
use tracing::debug;

/// Load a session config from a JSON file, using defaults for anything it does not
/// set, or the default config if no path is given.
pub fn load(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let file = File::open(path).with_context(|| format!("opening config {path:?}"))?;
    let config: SessionConfig = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing config {path:?}"))?;
    config
        .validate()
        .with_context(|| format!("invalid config {path:?}"))?;
    debug!("{config:?}");
    Ok(config)
}
