// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device identity and token storage.
//!
//! Each runner carries an ed25519 keypair persisted at `device.json`
//! (mode 0600). The device id is the hex sha-256 of the raw public key,
//! stable across restarts. Device tokens live next to it, keyed by
//! `<deviceId>:<role>`.

use ed25519_dalek::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{SigningKey, VerifyingKey};
use pkcs8::LineEnding;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const DEVICE_FILE: &str = "device.json";
const TOKENS_FILE: &str = "device-tokens.json";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid device file: {0}")]
    Invalid(String),
}

/// Persisted keypair, PEM-encoded (PKCS8 private, SPKI public).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub public_key_pem: String,
    pub private_key_pem: String,
}

/// One stored device token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceToken {
    pub token: String,
    pub role: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub updated_at_ms: u64,
}

fn io_err(path: &Path, source: std::io::Error) -> IdentityError {
    IdentityError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Write a file readable only by the owner.
fn write_private(path: &Path, content: &str) -> Result<(), IdentityError> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| io_err(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| io_err(path, e))
}

/// Hex sha-256 of the raw 32-byte public key.
pub fn device_id_from_pem(public_key_pem: &str) -> Result<String, IdentityError> {
    let key = VerifyingKey::from_public_key_pem(public_key_pem)
        .map_err(|e| IdentityError::Invalid(e.to_string()))?;
    let digest = Sha256::digest(key.to_bytes());
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Load the device identity, generating and persisting one on first run.
/// Returns the identity and its device id.
pub fn load_or_create_identity(
    state_dir: &Path,
) -> Result<(DeviceIdentity, String), IdentityError> {
    let path = state_dir.join(DEVICE_FILE);
    if let Ok(content) = std::fs::read_to_string(&path) {
        let identity: DeviceIdentity =
            serde_json::from_str(&content).map_err(|e| IdentityError::Invalid(e.to_string()))?;
        let device_id = device_id_from_pem(&identity.public_key_pem)?;
        return Ok((identity, device_id));
    }

    let seed: [u8; 32] = rand::random();
    let signing = SigningKey::from_bytes(&seed);
    let private_key_pem = signing
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| IdentityError::Invalid(e.to_string()))?
        .to_string();
    let public_key_pem = signing
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| IdentityError::Invalid(e.to_string()))?;

    let identity = DeviceIdentity {
        public_key_pem,
        private_key_pem,
    };
    let serialized = serde_json::to_string_pretty(&identity)
        .map_err(|e| IdentityError::Invalid(e.to_string()))?;
    write_private(&path, &serialized)?;

    let device_id = device_id_from_pem(&identity.public_key_pem)?;
    tracing::info!(device_id = %device_id, "generated device identity");
    Ok((identity, device_id))
}

/// Load the token map, `{}` when the file is absent.
pub fn load_tokens(state_dir: &Path) -> HashMap<String, DeviceToken> {
    let path = state_dir.join(TOKENS_FILE);
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

/// Persist a token under `<deviceId>:<role>`.
pub fn save_token(
    state_dir: &Path,
    device_id: &str,
    token: DeviceToken,
) -> Result<(), IdentityError> {
    let path = state_dir.join(TOKENS_FILE);
    let mut tokens = load_tokens(state_dir);
    tokens.insert(format!("{}:{}", device_id, token.role), token);
    let serialized =
        serde_json::to_string_pretty(&tokens).map_err(|e| IdentityError::Invalid(e.to_string()))?;
    write_private(&path, &serialized)
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
