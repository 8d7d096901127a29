//! Reelsmith Composer
//!
//! Non-linear timeline composition engine. Turns a timeline project
//! (trimmed, speed-ramped clips plus overlay audio) into a multi-track
//! composition with an audio mix and a frame plan, and renders it to a file.
//!
//! # Pipeline Architecture
//!
//! ```text
//! project.json ──┐
//!                ├── Track Builder (per clip, in order)
//! ffprobe ───────┤         │  geometry normalizer
//!                │         ▼
//!                ├── Audio Mix Assembler (overlays probed concurrently)
//!                │         │
//!                │         ▼
//!                └── Frame Composition Planner
//!                          │
//!                          ▼
//!                   CompositionResult ──► build()
//!                          │
//!                          ▼
//!                   ffmpeg encode ──► export()
//!                          │
//!                          ▼
//!                      output.mp4
//! ```

pub mod audio_mix;
pub mod cancel;
pub mod clamp;
pub mod composer;
pub mod composition;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod frame_plan;
pub mod geometry;
pub mod probe;
pub mod source;
pub mod time;
pub mod track_builder;

pub use cancel::CancelToken;
pub use composer::{Composer, CompositionResult};
pub use encode::{
    ExportPreset, ExportProgress, ExportQuality, ExportStage, MediaEncoder, ProgressCallback,
};
pub use error::{ComposeError, ComposeResult};
pub use ffmpeg::{FfmpegEncoder, FfmpegSettings};
pub use probe::{FfprobeProbe, MediaInfo, MediaProbe, MemoryProbe};
pub use time::{MediaTime, TimeRange, TIMESCALE};
