//! Download-once cache for remote recording files.
//!
//! Recordings live in a shared drive; the analysis only needs each file
//! fetched a single time. `fetch_recording` is therefore a no-op whenever the
//! target file already exists, which keeps repeated runs offline and
//! deterministic.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;

use crate::error::AppError;

const DEFAULT_BASE_URL: &str = "https://drive.google.com/uc?export=download&id=";

/// Resolve the download base URL, allowing a `.env` override for mirrors.
fn base_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("SPIKEFIT_DATA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

/// Fetch a remote recording into `data_dir/file_name`, once.
///
/// Returns the local path. If the file already exists the network is never
/// touched.
pub fn fetch_recording(
    remote_id: &str,
    file_name: &str,
    data_dir: &Path,
) -> Result<PathBuf, AppError> {
    let target = data_dir.join(file_name);
    if target.is_file() {
        log::info!("recording '{}' already cached, skipping download", file_name);
        return Ok(target);
    }

    fs::create_dir_all(data_dir).map_err(|e| {
        AppError::fetch(format!(
            "Failed to create data directory '{}': {e}",
            data_dir.display()
        ))
    })?;

    let url = format!("{}{remote_id}", base_url());
    log::info!("downloading recording '{}' from remote id {remote_id}", file_name);

    let response = Client::new()
        .get(&url)
        .send()
        .map_err(|e| AppError::fetch(format!("Download request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::fetch(format!(
            "Download failed with status {} for remote id {remote_id}.",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .map_err(|e| AppError::fetch(format!("Failed to read download body: {e}")))?;

    fs::write(&target, &bytes).map_err(|e| {
        AppError::fetch(format!("Failed to write '{}': {e}", target.display()))
    })?;

    Ok(target)
}
