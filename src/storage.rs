//! Atomic file persistence: temp file in the same directory, fsync, rename.
//!
//! Both the config (alias catalog) and chat sessions go through here, so a
//! crash mid-write leaves the previous file intact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AiError, Result};

/// On-disk encoding, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// Read and decode `path`. `Ok(None)` when the file does not exist or is blank.
pub fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(AiError::io(path, e)),
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value = match Format::for_path(path) {
        Format::Yaml => serde_yaml::from_str(&raw)
            .map_err(|e| AiError::Config(format!("{}: {e}", path.display())))?,
        Format::Json => serde_json::from_str(&raw)
            .map_err(|e| AiError::Config(format!("{}: {e}", path.display())))?,
    };
    Ok(Some(value))
}

/// Encode `value` and replace `path` atomically.
pub fn write_record<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = match Format::for_path(path) {
        Format::Yaml => serde_yaml::to_string(value)
            .map_err(|e| AiError::Config(format!("cannot encode {}: {e}", path.display())))?,
        Format::Json => serde_json::to_string_pretty(value)
            .map_err(|e| AiError::Config(format!("cannot encode {}: {e}", path.display())))?,
    };
    write_atomic(path, body.as_bytes())
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| AiError::io(parent, e))?;
    }

    let tmp = temp_path(path)?;
    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(AiError::io(&tmp, e));
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AiError::io(path, e)
    })
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        AiError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?;
    let tmp_name = format!(".{}.{}.tmp", name.to_string_lossy(), std::process::id());
    Ok(path.with_file_name(tmp_name))
}
