//! API key generation and the key-location file
//!
//! IndexNow verifies ownership by fetching `https://<host>/<key>.txt` and
//! comparing its content with the submitted key.

use crate::IndexNowError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Generates a new key: 32 lowercase hex characters
pub fn generate_api_key() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Path of the key file for `key` under `web_root`
pub fn key_file_path(web_root: &Path, key: &str) -> PathBuf {
    web_root.join(format!("{}.txt", key))
}

/// Writes the key file into the web root
///
/// An existing file that already holds the key is left untouched.
///
/// # Errors
///
/// Fails if `web_root` is not a directory or the file cannot be written.
pub fn write_key_file(web_root: &Path, key: &str) -> Result<PathBuf, IndexNowError> {
    if !web_root.is_dir() {
        return Err(IndexNowError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("web root {} is not a directory", web_root.display()),
        )));
    }

    let path = key_file_path(web_root, key);
    if key_file_valid(web_root, key) {
        tracing::debug!("Key file {} already up to date", path.display());
        return Ok(path);
    }

    fs::write(&path, key)?;
    tracing::info!("Wrote key file {}", path.display());
    Ok(path)
}

/// Returns true if the key file exists and holds exactly `key`
///
/// Surrounding whitespace in the file is ignored.
pub fn key_file_valid(web_root: &Path, key: &str) -> bool {
    fs::read_to_string(key_file_path(web_root, key))
        .map(|content| content.trim() == key)
        .unwrap_or(false)
}
