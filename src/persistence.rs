//! On-disk artifacts for the fitted preprocessing chain and the model.
//!
//! Both artifacts share one envelope:
//!
//! | Field | Type |
//! |-------|------|
//! | magic | `[u8; 8]` = `MIMICSVC` |
//! | format version | `u32` |
//! | kind | [`ArtifactKind`] |
//! | crate version | `String` |
//! | checksum | `[u8; 32]`, SHA-256 of crate version and payload |
//! | payload | bincode bytes of [`PreprocessingBundle`] or [`ModelArtifact`] |
//!
//! Loading checks the envelope before touching the payload, so a file of
//! the wrong kind or an older format fails with a precise error rather than
//! a decoding error. The payload is only decoded once its checksum matches,
//! and trailing bytes after the envelope or the payload are rejected.

use crate::model::{SearchSummary, SvcParams};
use crate::preprocessing::{CleanerParams, KnnImputerParams, MinMaxScalerParams};
use crate::serialization::SerializableParams;
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Leading bytes of every artifact.
pub const MAGIC: [u8; 8] = *b"MIMICSVC";
/// Current envelope and payload layout.
pub const FORMAT_VERSION: u32 = 1;

/// What an artifact file holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    PreprocessingBundle,
    Model,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::PreprocessingBundle => f.write_str("preprocessing bundle"),
            ArtifactKind::Model => f.write_str("model"),
        }
    }
}

/// Error type for artifact I/O.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Not an artifact, or truncated / undecodable.
    #[error("corrupt artifact: {0}")]
    Corrupt(String),
    #[error("artifact format version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("expected a {expected} artifact, found a {found} artifact")]
    KindMismatch {
        expected: ArtifactKind,
        found: ArtifactKind,
    },
    /// The payload decoded but its contents are inconsistent.
    #[error("invalid artifact contents: {0}")]
    Invalid(String),
}

#[derive(Serialize, Deserialize)]
struct Header {
    magic: [u8; 8],
    format_version: u32,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 8],
    format_version: u32,
    kind: ArtifactKind,
    crate_version: String,
    checksum: [u8; 32],
    payload: Vec<u8>,
}

fn checksum(crate_version: &str, payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(crate_version.as_bytes());
    hasher.update(payload);
    hasher.finalize().into()
}

/// Strict decoding: same layout as `bincode::serialize`, no trailing bytes.
fn decode_exact<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PersistenceError> {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(bytes)
        .map_err(|e| PersistenceError::Corrupt(e.to_string()))
}

/// Everything needed to replay the fitted preprocessing on raw rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreprocessingBundle {
    pub cleaner: CleanerParams,
    pub imputer: KnnImputerParams,
    pub scaler: MinMaxScalerParams,
    /// Cleaned column order at fit time, label last.
    pub column_order: Vec<String>,
    pub label_column: String,
}

/// A fitted classifier and how it was chosen.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub estimator: SvcParams,
    /// Present when the model came out of a grid search.
    pub search: Option<SearchSummary>,
    /// Feature columns the model expects, in order.
    pub feature_names: Vec<String>,
    /// Name of the training experiment that produced the model.
    pub experiment: String,
}

/// Wrap `value` in an envelope of the given kind.
pub fn encode<T: Serialize + DeserializeOwned>(
    kind: ArtifactKind,
    value: &T,
) -> Result<Vec<u8>, PersistenceError> {
    let payload = value
        .to_bytes()
        .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
    let crate_version = env!("CARGO_PKG_VERSION");
    Envelope {
        magic: MAGIC,
        format_version: FORMAT_VERSION,
        kind,
        crate_version: crate_version.to_string(),
        checksum: checksum(crate_version, &payload),
        payload,
    }
    .to_bytes()
    .map_err(|e| PersistenceError::Corrupt(e.to_string()))
}

/// Unwrap an envelope, checking magic, version and kind before the payload.
pub fn decode<T: Serialize + DeserializeOwned>(
    kind: ArtifactKind,
    bytes: &[u8],
) -> Result<T, PersistenceError> {
    let header = Header::from_bytes(bytes)
        .map_err(|_| PersistenceError::Corrupt("file too short for an artifact header".into()))?;
    if header.magic != MAGIC {
        return Err(PersistenceError::Corrupt("bad magic bytes".into()));
    }
    if header.format_version != FORMAT_VERSION {
        return Err(PersistenceError::VersionMismatch {
            found: header.format_version,
            expected: FORMAT_VERSION,
        });
    }

    let envelope: Envelope = decode_exact(bytes)?;
    if envelope.kind != kind {
        return Err(PersistenceError::KindMismatch {
            expected: kind,
            found: envelope.kind,
        });
    }
    if envelope.crate_version != env!("CARGO_PKG_VERSION") {
        log::debug!(
            "Loading {} written by version {}",
            kind,
            envelope.crate_version
        );
    }
    if checksum(&envelope.crate_version, &envelope.payload) != envelope.checksum {
        return Err(PersistenceError::Corrupt(format!(
            "{kind} payload checksum mismatch"
        )));
    }
    decode_exact(&envelope.payload)
}

fn write(path: &Path, bytes: Vec<u8>) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn save_bundle<P: AsRef<Path>>(
    bundle: &PreprocessingBundle,
    path: P,
) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    write(path, encode(ArtifactKind::PreprocessingBundle, bundle)?)?;
    log::info!("Saved preprocessing bundle to {}", path.display());
    Ok(())
}

pub fn load_bundle<P: AsRef<Path>>(path: P) -> Result<PreprocessingBundle, PersistenceError> {
    let bytes = std::fs::read(path)?;
    decode(ArtifactKind::PreprocessingBundle, &bytes)
}

pub fn save_model<P: AsRef<Path>>(model: &ModelArtifact, path: P) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    write(path, encode(ArtifactKind::Model, model)?)?;
    log::info!("Saved model to {}", path.display());
    Ok(())
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelArtifact, PersistenceError> {
    let bytes = std::fs::read(path)?;
    decode(ArtifactKind::Model, &bytes)
}
