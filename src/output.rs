use crate::error::{Result, SeagrassError};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

/// Writes `bytes` to `path` through a temporary sibling file, so `path` either
/// holds the complete content or is left untouched.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_err = |e: std::io::Error| SeagrassError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

pub fn write_map(path: &Path, html: &str) -> Result<()> {
    write_atomic(path, html.as_bytes())?;
    tracing::info!("Saved map to {:?}", path);
    Ok(())
}

pub fn write_geojson(path: &Path, geojson: &str) -> Result<()> {
    write_atomic(path, geojson.as_bytes())?;
    tracing::info!("Saved plot grid to {:?}", path);
    Ok(())
}

fn viewer_command(path: &Path, viewer: Option<&str>) -> Command {
    if let Some(mut words) = viewer.map(str::split_whitespace) {
        if let Some(program) = words.next() {
            let mut cmd = Command::new(program);
            cmd.args(words).arg(path);
            return cmd;
        }
    }

    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

/// Opens `path` in `viewer`, or the platform's default opener when unset.
/// Failure only produces a warning.
pub fn open_in_viewer(path: &Path, viewer: Option<&str>) -> bool {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    match viewer_command(&target, viewer).status() {
        Ok(status) if status.success() => {
            tracing::info!("Opened {:?} in the viewer", target);
            true
        }
        Ok(status) => {
            tracing::warn!("Viewer exited with {} for {:?}; open the file manually", status, target);
            false
        }
        Err(e) => {
            tracing::warn!("Could not launch a viewer for {:?}: {}; open the file manually", target, e);
            false
        }
    }
}
