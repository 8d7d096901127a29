//! Timeline project types.
//!
//! A project ties together media sources, the ordered video timeline,
//! independently placed audio overlays and narration, and the output shape.
//! The composer only ever borrows a project; it never writes back to it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::location::{LocationError, SourceLocation};
use crate::shape::OutputShape;

/// Top-level project file (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineProject {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable project name.
    #[serde(default)]
    pub name: String,

    /// Directory relative source paths resolve against. Set on load.
    #[serde(skip)]
    pub root: Option<PathBuf>,

    /// Media files referenced by timeline entries.
    #[serde(default)]
    pub media_sources: Vec<MediaSource>,

    /// Video entries, concatenated back-to-back in list order.
    #[serde(default)]
    pub video_entries: Vec<VideoEntry>,

    /// Auxiliary audio overlays, each at its own timeline offset.
    #[serde(default)]
    pub audio_entries: Vec<AudioEntry>,

    /// Narration / voice-over segments.
    #[serde(default)]
    pub narration_entries: Vec<NarrationEntry>,

    /// Target framing of the rendered output.
    #[serde(default)]
    pub output_shape: OutputShape,
}

/// A media file that video entries reference by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSource {
    /// Unique identifier within the project.
    pub id: String,

    /// Local path or remote URI.
    pub location: String,

    /// Duration in seconds, as cached when the source was imported.
    #[serde(default)]
    pub duration_secs: f64,
}

/// One clip on the main video timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEntry {
    /// Id of the referenced [`MediaSource`].
    pub source_id: String,

    /// Trim start in source seconds.
    pub in_point: f64,

    /// Trim end in source seconds (exclusive).
    pub out_point: f64,

    /// Playback speed multiplier (1.0 = normal).
    #[serde(default = "unit")]
    pub playback_rate: f64,

    /// Drop the clip's own audio.
    #[serde(default)]
    pub muted: bool,
}

/// An auxiliary audio track laid over the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioEntry {
    /// Local path or remote URI of the audio file.
    pub path: String,

    /// Trim start in source seconds.
    #[serde(default)]
    pub in_point: f64,

    /// Trim end in source seconds (exclusive).
    pub out_point: f64,

    /// Gain multiplier, `[0.0, 2.0]`.
    #[serde(default = "unit")]
    pub volume: f64,

    /// Where the overlay starts on the output timeline, in seconds.
    #[serde(default)]
    pub timeline_start: f64,
}

/// A narration segment with an optional recorded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationEntry {
    /// The recorded voice-over, if one has been attached.
    #[serde(default)]
    pub audio_path: Option<String>,

    /// Intended start on the output timeline, in seconds.
    pub start_secs: f64,

    /// Intended end on the output timeline, in seconds (exclusive).
    pub end_secs: f64,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn unit() -> f64 {
    1.0
}

impl TimelineProject {
    /// Create an empty project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            name: name.into(),
            root: None,
            media_sources: vec![],
            video_entries: vec![],
            audio_entries: vec![],
            narration_entries: vec![],
            output_shape: OutputShape::default(),
        }
    }

    /// Load a project file. The file's directory becomes the project root.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut project: TimelineProject =
            serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        project.root = path.parent().map(Path::to_path_buf);
        Ok(project)
    }

    /// Write the project to `path` as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Look up a media source by id.
    pub fn source(&self, id: &str) -> Option<&MediaSource> {
        self.media_sources.iter().find(|s| s.id == id)
    }

    /// Parse a location string and resolve it against the project root.
    pub fn resolve_location(&self, raw: &str) -> Result<SourceLocation, LocationError> {
        SourceLocation::parse(raw).map(|loc| loc.resolved_against(self.root.as_deref()))
    }

    /// Sum of the untrimmed, unscaled video entry windows. A quick estimate
    /// for display; the composer computes the exact duration.
    pub fn nominal_duration_secs(&self) -> f64 {
        self.video_entries
            .iter()
            .map(|e| (e.out_point - e.in_point).max(0.0) / e.playback_rate.max(f64::EPSILON))
            .sum()
    }

    /// Report problems that would make a build fail or silently drop media.
    ///
    /// This never fails; the composer corrects or skips most of these at
    /// build time, but surfacing them helps explain the result.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = vec![];

        if self.video_entries.is_empty() {
            issues.push("Timeline has no video entries".to_string());
        }

        let mut seen = HashSet::new();
        for source in &self.media_sources {
            if !seen.insert(source.id.as_str()) {
                issues.push(format!("Duplicate media source id: {}", source.id));
            }
            self.check_location(&format!("Source {}", source.id), &source.location, &mut issues);
        }

        for (idx, entry) in self.video_entries.iter().enumerate() {
            if self.source(&entry.source_id).is_none() {
                issues.push(format!(
                    "Video entry {idx} references unknown source: {}",
                    entry.source_id
                ));
            }
            if entry.out_point <= entry.in_point {
                issues.push(format!(
                    "Video entry {idx} has an empty trim window [{}, {})",
                    entry.in_point, entry.out_point
                ));
            }
            if entry.playback_rate.is_nan() || entry.playback_rate <= 0.0 {
                issues.push(format!(
                    "Video entry {idx} has invalid playback rate: {}",
                    entry.playback_rate
                ));
            }
        }

        for (idx, entry) in self.audio_entries.iter().enumerate() {
            self.check_location(&format!("Audio entry {idx}"), &entry.path, &mut issues);
            if !(0.0..=2.0).contains(&entry.volume) {
                issues.push(format!(
                    "Audio entry {idx} volume {} is outside [0, 2]",
                    entry.volume
                ));
            }
        }

        for (idx, entry) in self.narration_entries.iter().enumerate() {
            if entry.end_secs <= entry.start_secs {
                issues.push(format!(
                    "Narration entry {idx} has an empty window [{}, {})",
                    entry.start_secs, entry.end_secs
                ));
            }
            if let Some(path) = &entry.audio_path {
                self.check_location(&format!("Narration entry {idx}"), path, &mut issues);
            }
        }

        issues
    }

    fn check_location(&self, label: &str, raw: &str, issues: &mut Vec<String>) {
        match self.resolve_location(raw) {
            Ok(SourceLocation::Local(path)) if !path.exists() => {
                issues.push(format!("{label} file missing: {}", path.display()));
            }
            Ok(_) => {}
            Err(e) => issues.push(format!("{label} has an invalid location: {e}")),
        }
    }
}

impl MediaSource {
    pub fn new(id: impl Into<String>, location: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            duration_secs,
        }
    }
}

impl VideoEntry {
    /// A clip of `source_id` trimmed to `[in_point, out_point)` at normal speed.
    pub fn new(source_id: impl Into<String>, in_point: f64, out_point: f64) -> Self {
        Self {
            source_id: source_id.into(),
            in_point,
            out_point,
            playback_rate: 1.0,
            muted: false,
        }
    }

    /// Set playback speed.
    pub fn rate(mut self, playback_rate: f64) -> Self {
        self.playback_rate = playback_rate;
        self
    }

    /// Drop this clip's audio.
    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }
}

impl AudioEntry {
    pub fn new(path: impl Into<String>, in_point: f64, out_point: f64) -> Self {
        Self {
            path: path.into(),
            in_point,
            out_point,
            volume: 1.0,
            timeline_start: 0.0,
        }
    }

    /// Set the gain multiplier.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Set the start offset on the output timeline.
    pub fn at(mut self, timeline_start: f64) -> Self {
        self.timeline_start = timeline_start;
        self
    }
}

impl NarrationEntry {
    pub fn new(audio_path: Option<String>, start_secs: f64, end_secs: f64) -> Self {
        Self {
            audio_path,
            start_secs,
            end_secs,
        }
    }
}

/// Errors that can occur when loading or saving projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}
