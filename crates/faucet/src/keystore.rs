//! Encrypted account files in the web3 secret storage format.

use std::path::{Path, PathBuf};

use alloy::signers::local::PrivateKeySigner;
use zeroize::Zeroizing;

use crate::error::ConfigError;

/// Decrypts the keystore at `path`.
///
/// Key derivation is deliberately slow, so it runs on the blocking pool.
pub async fn decrypt(
    chain: &str,
    path: &Path,
    password: Zeroizing<String>,
) -> Result<PrivateKeySigner, ConfigError> {
    let keystore_error = |reason: String| ConfigError::Keystore {
        chain: chain.to_string(),
        path: path.to_path_buf(),
        reason,
    };

    let keypath = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        PrivateKeySigner::decrypt_keystore(&keypath, password.as_bytes())
    })
    .await
    .map_err(|e| keystore_error(e.to_string()))?
    .map_err(|e| keystore_error(e.to_string()))
}

/// Generates a new random account and writes it, encrypted with
/// `password`, to `path`. Refuses to overwrite an existing file.
pub fn create(chain: &str, path: &Path, password: &str) -> Result<PrivateKeySigner, ConfigError> {
    let keystore_error = |reason: String| ConfigError::Keystore {
        chain: chain.to_string(),
        path: path.to_path_buf(),
        reason,
    };

    if path.exists() {
        return Err(keystore_error("file already exists".to_string()));
    }

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| keystore_error("path has no valid file name".to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| keystore_error(e.to_string()))?;

    let (signer, _) =
        PrivateKeySigner::new_keystore(&dir, &mut rand::thread_rng(), password, Some(name))
            .map_err(|e| keystore_error(e.to_string()))?;

    tracing::info!(chain, address = %signer.address(), keystore = %path.display(), "created account");
    Ok(signer)
}
