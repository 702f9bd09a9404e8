use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The final assembled recording handed to the persistence collaborator.
///
/// `data` is shared and immutable: the persistence path and the download
/// fallback can both hold it without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedArtifact {
    pub data: Arc<[u8]>,
    pub mime_type: String,
    pub file_name: String,
    pub chunk_count: usize,
}

impl CompletedArtifact {
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    /// Suggested name with the stem replaced by a user-provided one.
    ///
    /// Path separators are stripped and the container extension is kept.
    pub fn renamed(&self, stem: &str) -> Option<String> {
        let cleaned: String = stem
            .trim()
            .chars()
            .filter(|c| !matches!(c, '/' | '\\' | ':' | '\0'))
            .collect();
        let cleaned = cleaned.trim().trim_matches('.');
        if cleaned.is_empty() {
            return None;
        }
        let ext = self.file_name.rsplit_once('.').map(|(_, ext)| ext);
        match ext {
            Some(ext) if !cleaned.ends_with(&format!(".{}", ext)) => {
                Some(format!("{}.{}", cleaned, ext))
            }
            _ => Some(cleaned.to_string()),
        }
    }

    /// SHA-256 hex digest of the artifact bytes.
    pub fn checksum(&self) -> String {
        let digest = Sha256::digest(&self.data);
        hex_encode(&digest)
    }
}

/// Where an artifact ended up after handoff.
#[derive(Debug, Clone, PartialEq)]
pub enum HandoffOutcome {
    /// Written by the primary collaborator (workspace folder).
    Saved { location: PathBuf, file_name: String },
    /// Primary collaborator missing or failed; the download path was used.
    Downloaded {
        location: PathBuf,
        file_name: String,
        reason: Option<String>,
    },
    /// Nothing was buffered, so no artifact was produced.
    Skipped,
}

impl HandoffOutcome {
    pub fn location(&self) -> Option<&PathBuf> {
        match self {
            Self::Saved { location, .. } | Self::Downloaded { location, .. } => Some(location),
            Self::Skipped => None,
        }
    }
}

/// Sidecar metadata describing a saved recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub chunk_count: usize,
    pub checksum: String,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn for_artifact(artifact: &CompletedArtifact, file_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            mime_type: artifact.mime_type.clone(),
            size_bytes: artifact.size_bytes(),
            chunk_count: artifact.chunk_count,
            checksum: artifact.checksum(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str) -> CompletedArtifact {
        CompletedArtifact {
            data: Arc::from(&b"abc"[..]),
            mime_type: "video/webm".into(),
            file_name: name.into(),
            chunk_count: 1,
        }
    }

    #[test]
    fn rename_keeps_extension() {
        let a = artifact("recording-1700000000000.webm");
        assert_eq!(a.renamed("Demo take"), Some("Demo take.webm".into()));
        assert_eq!(a.renamed("demo.webm"), Some("demo.webm".into()));
        assert_eq!(a.renamed("../etc/passwd"), Some("etcpasswd.webm".into()));
        assert_eq!(a.renamed("   "), None);
    }

    #[test]
    fn checksum_is_sha256_hex() {
        let a = artifact("x.webm");
        assert_eq!(
            a.checksum(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn metadata_copies_artifact_facts() {
        let a = artifact("x.webm");
        let meta = RecordingMetadata::for_artifact(&a, "renamed.webm");
        assert_eq!(meta.file_name, "renamed.webm");
        assert_eq!(meta.size_bytes, 3);
        assert_eq!(meta.mime_type, "video/webm");
        assert_eq!(meta.checksum, a.checksum());
    }
}
