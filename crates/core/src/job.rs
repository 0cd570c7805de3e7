// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

//! Compile job descriptor and content fingerprinting.
//!
//! A [`JobDescriptor`] is the normalized, immutable form of one compile
//! request. Its [`Fingerprint`] is a SHA-256 digest over the build mode and
//! the sketch source bytes; two jobs with equal fingerprints are defined to
//! produce equal output, which is what makes the result cache sound. The
//! fingerprint deliberately does not cover shared library state; that is
//! handled by clearing the cache when upstream sources change.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::session::SessionId;

/// How the external compiler should build the sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// Fast incremental build, the default for interactive use.
    Quick,
    /// Debug build; keeps files for source mapping.
    Debug,
    /// Optimized release build.
    Release,
}

crate::simple_display! {
    BuildMode {
        Quick => "quick",
        Debug => "debug",
        Release => "release",
    }
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Quick => "quick",
            BuildMode::Debug => "debug",
            BuildMode::Release => "release",
        }
    }
}

/// Error parsing a build mode string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid build mode {0:?}, expected one of quick, debug, release")]
pub struct ParseBuildModeError(pub String);

impl FromStr for BuildMode {
    type Err = ParseBuildModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quick" => Ok(BuildMode::Quick),
            "debug" => Ok(BuildMode::Debug),
            "release" => Ok(BuildMode::Release),
            _ => Err(ParseBuildModeError(s.to_string())),
        }
    }
}

/// Content-addressed cache key for a compile job.
///
/// SHA-256 over the build mode and the source bytes, rendered as lowercase
/// hex on the wire and on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of a sketch for the given build mode.
    pub fn compute(mode: BuildMode, source: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(mode.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(source);
        Self(hasher.finalize().into())
    }

    /// Parse a lowercase-hex fingerprint, e.g. from an on-disk file name.
    ///
    /// Returns `None` for anything that is not exactly 64 hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", crate::id::short(&self.to_hex(), 12))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fingerprint::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid fingerprint {s:?}")))
    }
}

/// Normalized representation of one compile request.
///
/// Immutable once constructed; the fingerprint is computed at construction
/// and never recomputed.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub fingerprint: Fingerprint,
    pub build_mode: BuildMode,
    pub source: Vec<u8>,
    pub filename: String,
    pub session_id: SessionId,
}

impl JobDescriptor {
    pub fn new(
        build_mode: BuildMode,
        source: Vec<u8>,
        filename: impl Into<String>,
        session_id: SessionId,
    ) -> Self {
        let fingerprint = Fingerprint::compute(build_mode, &source);
        Self {
            fingerprint,
            build_mode,
            source,
            filename: filename.into(),
            session_id,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
