//! Render errors, progress and metadata.
//!
//! Setup problems are reported as [`RenderError`] tagged with the phase that
//! failed. A completed offline render writes [`RenderMetadata`] as
//! `metadata.json` next to the frames.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::RenderJobSpec;

/// Render phase for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Initialization,
    GpuSetup,
    ShaderCompile,
    TextureLoad,
    BindingLookup,
    FrameRender,
    FrameSave,
    MetadataSave,
}

impl std::fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderPhase::Initialization => write!(f, "Initialization"),
            RenderPhase::GpuSetup => write!(f, "GPU Setup"),
            RenderPhase::ShaderCompile => write!(f, "Shader Compile"),
            RenderPhase::TextureLoad => write!(f, "Texture Load"),
            RenderPhase::BindingLookup => write!(f, "Binding Lookup"),
            RenderPhase::FrameRender => write!(f, "Frame Render"),
            RenderPhase::FrameSave => write!(f, "Frame Save"),
            RenderPhase::MetadataSave => write!(f, "Metadata Save"),
        }
    }
}

/// Structured error for render failures.
#[derive(Debug)]
pub struct RenderError {
    pub phase: RenderPhase,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.phase, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl RenderError {
    pub fn new(phase: RenderPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        phase: RenderPhase,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            phase,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Metadata for a completed render, written as metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    /// The job used, after CLI overrides.
    pub job: RenderJobSpec,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    pub render_duration_secs: f64,

    /// Frames simulated, including ones not written to disk.
    pub frame_count: usize,

    /// Frames written as PNG.
    pub frames_saved: usize,

    /// frame_count / render_duration_secs.
    pub average_render_fps: f64,

    /// SHA-256 of the serialized job.
    pub config_hash: String,

    pub postfx_version: String,

    pub gpu_adapter: String,

    /// Skipped passes and other non-fatal issues.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RenderMetadata {
    /// SHA-256 of a job's canonical JSON form.
    pub fn hash_job(job: &RenderJobSpec) -> Result<String, RenderError> {
        let json = serde_json::to_vec(job).map_err(|e| {
            RenderError::with_source(RenderPhase::MetadataSave, "Failed to serialize job", e)
        })?;
        let mut hasher = Sha256::new();
        hasher.update(&json);
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            RenderError::with_source(RenderPhase::MetadataSave, "Failed to serialize metadata", e)
        })?;
        std::fs::write(path, json).map_err(|e| {
            RenderError::with_source(
                RenderPhase::MetadataSave,
                format!("Failed to write metadata to {:?}", path),
                e,
            )
        })
    }
}

/// Progress information for render callbacks.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current frame number (1-indexed).
    pub current_frame: usize,
    pub total_frames: usize,
    pub elapsed_secs: f64,
    pub eta_secs: Option<f64>,
}

impl RenderProgress {
    pub fn new(current_frame: usize, total_frames: usize, elapsed_secs: f64) -> Self {
        let eta_secs = if current_frame > 0 {
            let per_frame = elapsed_secs / current_frame as f64;
            Some(per_frame * total_frames.saturating_sub(current_frame) as f64)
        } else {
            None
        };
        Self {
            current_frame,
            total_frames,
            elapsed_secs,
            eta_secs,
        }
    }

    /// Progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total_frames == 0 {
            100.0
        } else {
            (self.current_frame as f64 / self.total_frames as f64) * 100.0
        }
    }
}
