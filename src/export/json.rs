//! JSON and NDJSON writers for result files.

use crate::error::ConduitResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// How result files are written
#[derive(Debug, Clone)]
pub struct JsonExportConfig {
    /// Pretty print JSON
    pub pretty: bool,
    /// Create missing parent directories
    pub create_dirs: bool,
}

impl Default for JsonExportConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            create_dirs: true,
        }
    }
}

fn prepare(path: &Path, config: &JsonExportConfig) -> ConduitResult<()> {
    if config.create_dirs {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}

/// Write `value` to `path` with the default config (pretty, parents created)
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> ConduitResult<()> {
    write_json_with(path, value, &JsonExportConfig::default())
}

pub fn write_json_with<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    config: &JsonExportConfig,
) -> ConduitResult<()> {
    prepare(path, config)?;
    let text = if config.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    fs::write(path, &text)?;
    debug!(path = %path.display(), bytes = text.len(), "wrote json");
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> ConduitResult<T> {
    let text = fs::read_to_string(path)?;
    let value = serde_json::from_str(&text)?;
    debug!(path = %path.display(), "read json");
    Ok(value)
}

/// One compact JSON object per line; returns bytes written
pub fn write_ndjson<T: Serialize>(path: &Path, rows: &[T]) -> ConduitResult<usize> {
    prepare(path, &JsonExportConfig::default())?;
    let mut writer = BufWriter::new(File::create(path)?);
    let mut bytes = 0;
    for row in rows {
        let line = serde_json::to_string(row)?;
        writeln!(writer, "{}", line)?;
        bytes += line.len() + 1;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), bytes, "wrote ndjson");
    Ok(bytes)
}
