//! Media probing: what a source contains and how it is oriented.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use kurbo::{Affine, Size};
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use reelsmith_project_model::location::SourceLocation;
use serde::{Deserialize, Serialize};

use crate::geometry::Orientation;

/// Metadata for one media source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub has_video: bool,
    pub has_audio: bool,
    /// Raw pixel size of the first video stream.
    pub natural_size: Size,
    pub orientation: Orientation,
    /// Container duration in seconds; zero when unknown.
    pub duration_secs: f64,
}

impl MediaInfo {
    /// A video-only source.
    pub fn video(width: f64, height: f64, duration_secs: f64) -> Self {
        Self {
            has_video: true,
            has_audio: false,
            natural_size: Size::new(width, height),
            orientation: Orientation::UPRIGHT,
            duration_secs,
        }
    }

    /// An audio-only source.
    pub fn audio(duration_secs: f64) -> Self {
        Self {
            has_video: false,
            has_audio: true,
            natural_size: Size::ZERO,
            orientation: Orientation::UPRIGHT,
            duration_secs,
        }
    }

    pub fn with_audio(mut self) -> Self {
        self.has_audio = true;
        self
    }

    pub fn rotated(mut self, clockwise_degrees: f64) -> Self {
        self.orientation = Orientation::from_degrees(clockwise_degrees, self.orientation.mirrored);
        self
    }

    /// The transform that displays the raw frame upright.
    pub fn preferred_transform(&self) -> Affine {
        self.orientation.transform()
    }
}

/// Reads metadata from media sources.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Inspect a source. A missing local file is reported as
    /// [`ReelsmithError::FileNotFound`].
    async fn probe(&self, location: &SourceLocation) -> ReelsmithResult<MediaInfo>;

    /// Probe name, for logs.
    fn name(&self) -> &str;
}

/// Probe backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, location: &SourceLocation) -> ReelsmithResult<MediaInfo> {
        if let Some(path) = location.local_path() {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(ReelsmithError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
        }

        let target = location.to_string();
        let output = tokio::process::Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(&target)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ReelsmithError::probe(format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ReelsmithError::probe(format!(
                "ffprobe failed for '{target}': {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let info = parse_probe_output(&output.stdout)?;
        tracing::debug!(
            location = %target,
            has_video = info.has_video,
            has_audio = info.has_audio,
            width = info.natural_size.width,
            height = info.natural_size.height,
            rotation = info.orientation.rotation_degrees,
            duration_secs = info.duration_secs,
            "Probed media source"
        );
        Ok(info)
    }

    fn name(&self) -> &str {
        "ffprobe"
    }
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output.
pub fn parse_probe_output(json: &[u8]) -> ReelsmithResult<MediaInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| ReelsmithError::probe(format!("ffprobe json parse failed: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let (natural_size, orientation) = match video {
        Some(stream) => {
            let size = Size::new(
                stream.width.unwrap_or(0) as f64,
                stream.height.unwrap_or(0) as f64,
            );
            // The display matrix reports counter-clockwise degrees, the
            // legacy `rotate` tag clockwise.
            let clockwise = stream
                .side_data_list
                .iter()
                .find_map(|d| d.rotation)
                .map(|ccw| -ccw)
                .or_else(|| stream.tags.get("rotate").and_then(|r| r.parse().ok()))
                .unwrap_or(0.0);
            (size, Orientation::from_degrees(clockwise, false))
        }
        None => (Size::ZERO, Orientation::UPRIGHT),
    };

    let duration_secs = parsed
        .format
        .and_then(|f| f.duration)
        .or_else(|| parsed.streams.iter().find_map(|s| s.duration.clone()))
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    Ok(MediaInfo {
        has_video: video.is_some(),
        has_audio,
        natural_size,
        orientation,
        duration_secs,
    })
}

/// Probe answering from registered metadata. Unregistered local paths
/// report not-found; unregistered remote locations are unreadable.
#[derive(Debug, Default)]
pub struct MemoryProbe {
    entries: Mutex<HashMap<SourceLocation, MediaInfo>>,
    calls: AtomicUsize,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, location: SourceLocation, info: MediaInfo) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(location, info);
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(self, location: SourceLocation, info: MediaInfo) -> Self {
        self.insert(location, info);
        self
    }

    /// Number of probe calls served so far.
    pub fn probe_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProbe for MemoryProbe {
    async fn probe(&self, location: &SourceLocation) -> ReelsmithResult<MediaInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let found = self
            .entries
            .lock()
            .map_err(|_| ReelsmithError::probe("probe table poisoned"))?
            .get(location)
            .cloned();

        match (found, location) {
            (Some(info), _) => Ok(info),
            (None, SourceLocation::Local(path)) => Err(ReelsmithError::FileNotFound {
                path: path.clone(),
            }),
            (None, SourceLocation::Remote(uri)) => {
                Err(ReelsmithError::probe(format!("no media registered for {uri}")))
            }
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
