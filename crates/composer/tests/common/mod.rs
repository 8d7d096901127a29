#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use reelsmith_composer::{
    CancelToken, Composer, CompositionResult, ExportPreset, ExportProgress, ExportStage,
    MediaEncoder, MediaInfo, MemoryProbe, ProgressCallback,
};
use reelsmith_project_model::location::SourceLocation;

pub fn remote(name: &str) -> SourceLocation {
    SourceLocation::Remote(uri(name))
}

pub fn uri(name: &str) -> String {
    format!("https://media.test/{name}")
}

/// A fresh, empty directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("reelsmith_it_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

/// Probe with the media most tests use.
pub fn standard_probe() -> MemoryProbe {
    MemoryProbe::new()
        .with(
            remote("landscape.mp4"),
            MediaInfo::video(1920.0, 1080.0, 20.0).with_audio(),
        )
        .with(
            remote("portrait.mp4"),
            MediaInfo::video(1080.0, 1920.0, 15.0).with_audio(),
        )
        .with(remote("silent.mp4"), MediaInfo::video(1280.0, 720.0, 30.0))
        .with(remote("music.m4a"), MediaInfo::audio(30.0))
        .with(remote("voice.m4a"), MediaInfo::audio(4.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderBehavior {
    /// Write the output and succeed.
    Succeed,
    /// Write a partial file, then fail.
    Fail,
    /// Write a partial file, then wait for cancellation.
    Hang,
}

/// Encoder double that records what it was asked to do.
pub struct TestEncoder {
    behavior: EncoderBehavior,
    available: bool,
    unsupported: Vec<ExportPreset>,
    pub calls: Mutex<Vec<(PathBuf, ExportPreset)>>,
}

impl TestEncoder {
    pub fn new(behavior: EncoderBehavior) -> Self {
        Self {
            behavior,
            available: true,
            unsupported: vec![],
            calls: Mutex::new(vec![]),
        }
    }

    pub fn refusing(mut self, presets: &[ExportPreset]) -> Self {
        self.unsupported = presets.to_vec();
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn calls(&self) -> Vec<(PathBuf, ExportPreset)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl MediaEncoder for TestEncoder {
    fn name(&self) -> &str {
        "test"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    fn supports(&self, preset: ExportPreset, _result: &CompositionResult) -> bool {
        !self.unsupported.contains(&preset)
    }

    async fn encode(
        &self,
        result: &CompositionResult,
        destination: &Path,
        preset: ExportPreset,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ReelsmithResult<()> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((destination.to_path_buf(), preset));

        if destination.exists() {
            return Err(ReelsmithError::encode("destination was not cleared"));
        }
        std::fs::write(
            destination,
            format!("{preset} {:.3}", result.duration.as_secs()),
        )?;
        if let Some(cb) = &progress {
            cb(ExportProgress {
                progress: 0.5,
                frames_rendered: 1,
                total_frames: 2,
                eta_secs: 1.0,
                stage: ExportStage::Rendering,
            });
        }

        match self.behavior {
            EncoderBehavior::Succeed => Ok(()),
            EncoderBehavior::Fail => Err(ReelsmithError::encode("muxer exploded")),
            EncoderBehavior::Hang => {
                cancel.cancelled().await;
                Err(ReelsmithError::Cancelled)
            }
        }
    }
}

pub fn composer(probe: MemoryProbe, encoder: TestEncoder) -> (Composer, Arc<MemoryProbe>, Arc<TestEncoder>) {
    let probe = Arc::new(probe);
    let encoder = Arc::new(encoder);
    let composer = Composer::new(probe.clone(), encoder.clone());
    (composer, probe, encoder)
}
