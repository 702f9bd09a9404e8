use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::RwLock;

use crate::models::artifact::{CompletedArtifact, HandoffOutcome};
use crate::models::error::StudioError;
use crate::models::presets::extension_for_mime;
use crate::traits::chunk_buffer::ChunkBuffer;
use crate::traits::persistence::{FilenamePrompt, PersistenceSink};

/// Result of one handoff attempt.
#[derive(Debug, Clone)]
pub struct HandoffReport {
    pub artifact: Option<CompletedArtifact>,
    pub outcome: HandoffOutcome,
}

/// Assembles buffered chunks into the final artifact and passes it to
/// persistence: the primary sink (workspace folder) when connected, the
/// download fallback otherwise. The buffer is cleared only once a sink
/// accepted the artifact.
pub struct CompletionHandoff {
    buffer: Arc<dyn ChunkBuffer>,
    primary: RwLock<Option<Arc<dyn PersistenceSink>>>,
    fallback: Arc<dyn PersistenceSink>,
    prompt: Option<Arc<dyn FilenamePrompt>>,
}

impl CompletionHandoff {
    pub fn new(buffer: Arc<dyn ChunkBuffer>, fallback: Arc<dyn PersistenceSink>) -> Self {
        Self {
            buffer,
            primary: RwLock::new(None),
            fallback,
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn FilenamePrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn set_primary(&self, sink: Option<Arc<dyn PersistenceSink>>) {
        *self.primary.write() = sink;
    }

    pub fn has_primary(&self) -> bool {
        self.primary.read().is_some()
    }

    pub fn buffer(&self) -> &Arc<dyn ChunkBuffer> {
        &self.buffer
    }

    /// Default file name: `recording-{unix millis}.{ext}`.
    pub fn suggested_file_name(mime_type: &str) -> String {
        format!(
            "recording-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            extension_for_mime(mime_type)
        )
    }

    /// Read every buffered chunk, concatenate, and persist.
    ///
    /// Returns `Skipped` without touching any sink when nothing was buffered.
    /// On persistence failure the chunks stay in the buffer.
    pub fn complete(&self, mime_type: &str) -> Result<HandoffReport, StudioError> {
        let chunks = self.buffer.read_all()?;
        if chunks.is_empty() {
            info!("Handoff: no chunks buffered, skipping");
            return Ok(HandoffReport {
                artifact: None,
                outcome: HandoffOutcome::Skipped,
            });
        }

        let total: usize = chunks.iter().map(|c| c.data.len()).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in &chunks {
            data.extend_from_slice(&chunk.data);
        }

        let suggested = Self::suggested_file_name(mime_type);
        let mut artifact = CompletedArtifact {
            data: Arc::from(data),
            mime_type: mime_type.to_string(),
            file_name: suggested,
            chunk_count: chunks.len(),
        };
        if let Some(prompt) = &self.prompt {
            if let Some(name) = prompt
                .request_file_name(&artifact.file_name)
                .and_then(|stem| artifact.renamed(&stem))
            {
                artifact.file_name = name;
            }
        }

        let outcome = self.persist(&artifact)?;
        self.buffer.clear()?;
        info!(
            "Handoff: {} chunks ({} bytes) handed off as {}",
            artifact.chunk_count,
            artifact.size_bytes(),
            artifact.file_name
        );
        Ok(HandoffReport {
            artifact: Some(artifact),
            outcome,
        })
    }

    fn persist(&self, artifact: &CompletedArtifact) -> Result<HandoffOutcome, StudioError> {
        let primary = self.primary.read().clone();
        let reason = match primary {
            Some(sink) => match sink.persist(artifact, &artifact.file_name) {
                Ok(location) => {
                    return Ok(HandoffOutcome::Saved {
                        location,
                        file_name: artifact.file_name.clone(),
                    })
                }
                Err(e) => {
                    warn!("Handoff: saving to {} failed: {}; falling back to download", sink.name(), e);
                    Some(e.to_string())
                }
            },
            None => None,
        };

        match self.fallback.persist(artifact, &artifact.file_name) {
            Ok(location) => Ok(HandoffOutcome::Downloaded {
                location,
                file_name: artifact.file_name.clone(),
                reason,
            }),
            Err(e) => {
                error!("Handoff: download fallback failed: {}", e);
                Err(StudioError::PersistenceFailure(match reason {
                    Some(primary) => format!("{}; download fallback: {}", primary, e),
                    None => e.to_string(),
                }))
            }
        }
    }
}
