//! Video pass: lays the ordered video entries back-to-back.
//!
//! Entries are processed strictly in list order against a single cursor.
//! Each entry's trimmed source range is inserted at the cursor, rescaled for
//! its playback rate, and (unless muted) mirrored onto the primary audio
//! track at the same position.

use std::path::PathBuf;

use kurbo::{Affine, Size};
use reelsmith_project_model::location::SourceLocation;
use reelsmith_project_model::project::{TimelineProject, VideoEntry};
use serde::{Deserialize, Serialize};

use crate::clamp::{clamp_rate, clamp_trim, is_unit_rate};
use crate::composition::{Composition, MediaKind, TrackId};
use crate::error::{ComposeError, ComposeResult};
use crate::geometry::normalize;
use crate::probe::{MediaInfo, MediaProbe};
use crate::source::{resolve_readable, ResolveError};
use crate::time::{MediaTime, TimeRange};

/// A video entry as it landed on the output timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedSegment {
    pub source_id: String,
    /// Output range after insertion and rate scaling.
    pub time_range: TimeRange,
    pub natural_size: Size,
    pub display_size: Size,
    /// Normalized orientation transform (raw pixels to display space).
    pub transform: Affine,
}

/// Output of the video pass.
#[derive(Debug, Clone)]
pub struct VideoTracks {
    pub video_track: TrackId,
    /// Created on the first unmuted entry whose source has audio.
    pub audio_track: Option<TrackId>,
    pub placed: Vec<PlacedSegment>,
    /// End of the last placed segment.
    pub end: MediaTime,
}

/// Insert every video entry of `project` into `composition`.
pub async fn build_video_tracks(
    project: &TimelineProject,
    composition: &mut Composition,
    probe: &dyn MediaProbe,
) -> ComposeResult<VideoTracks> {
    let video_track = composition.add_track(MediaKind::Video)?;
    let mut audio_track = None;
    let mut placed = Vec::with_capacity(project.video_entries.len());
    let mut cursor = MediaTime::ZERO;

    for (index, entry) in project.video_entries.iter().enumerate() {
        let (location, info, cached_duration) = open_source(project, entry, probe).await?;

        let source_duration = if info.duration_secs > 0.0 {
            info.duration_secs
        } else {
            cached_duration
        };
        let (in_point, out_point) = clamp_trim(entry.in_point, entry.out_point, source_duration);
        if (in_point, out_point) != (entry.in_point, entry.out_point) {
            tracing::debug!(
                index,
                source_id = %entry.source_id,
                requested_in = entry.in_point,
                requested_out = entry.out_point,
                in_point,
                out_point,
                "Clamped trim window"
            );
        }

        let rate = clamp_rate(entry.playback_rate);
        if rate != entry.playback_rate {
            tracing::debug!(index, requested = entry.playback_rate, rate, "Clamped playback rate");
        }

        let source_range = TimeRange::from_secs(in_point, out_point);
        let inserted = TimeRange::new(cursor, source_range.duration);
        // Scaled from the clamped seconds so the rate keeps full precision.
        let scaled = if is_unit_rate(rate) {
            source_range.duration
        } else {
            MediaTime::from_secs((out_point - in_point) / rate)
        };

        composition.insert_time_range(video_track, location.clone(), source_range, cursor)?;
        if scaled != inserted.duration {
            composition.scale_time_range(video_track, inserted, scaled)?;
        }

        let geometry = normalize(info.natural_size, info.preferred_transform());
        placed.push(PlacedSegment {
            source_id: entry.source_id.clone(),
            time_range: TimeRange::new(cursor, scaled),
            natural_size: info.natural_size,
            display_size: geometry.display_size,
            transform: geometry.transform,
        });

        if entry.muted {
            tracing::debug!(index, source_id = %entry.source_id, "Entry muted, audio not placed");
        } else if !info.has_audio {
            tracing::debug!(index, source_id = %entry.source_id, "Source has no audio track");
        } else {
            let track = match audio_track {
                Some(track) => track,
                None => {
                    let track = composition.add_track(MediaKind::Audio)?;
                    audio_track = Some(track);
                    track
                }
            };
            composition.insert_time_range(track, location, source_range, cursor)?;
            if scaled != inserted.duration {
                composition.scale_time_range(track, inserted, scaled)?;
            }
        }

        tracing::debug!(
            index,
            source_id = %entry.source_id,
            start = %cursor,
            duration = %scaled,
            rate,
            "Placed video segment"
        );
        cursor += scaled;
    }

    Ok(VideoTracks {
        video_track,
        audio_track,
        placed,
        end: cursor,
    })
}

/// Resolve and probe the source behind `entry`, translating failures into
/// the fatal error for a required source.
async fn open_source(
    project: &TimelineProject,
    entry: &VideoEntry,
    probe: &dyn MediaProbe,
) -> ComposeResult<(SourceLocation, MediaInfo, f64)> {
    let source = project
        .source(&entry.source_id)
        .ok_or_else(|| ComposeError::MissingSource {
            source_id: entry.source_id.clone(),
        })?;

    let location = resolve_readable(project, &source.location)
        .await
        .map_err(|e| match e {
            ResolveError::Invalid(reason) => ComposeError::InvalidSourceLocation {
                source_id: source.id.clone(),
                location: source.location.clone(),
                reason: reason.to_string(),
            },
            ResolveError::NotFound(path) => ComposeError::SourceNotFound { path },
        })?;

    let info = probe.probe(&location).await.map_err(|e| {
        if e.is_not_found() {
            ComposeError::SourceNotFound {
                path: location
                    .local_path()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(location.to_string())),
            }
        } else {
            ComposeError::SourceUnreadable {
                location: location.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    if !info.has_video {
        return Err(ComposeError::SourceHasNoVideo {
            source_id: source.id.clone(),
            location: location.to_string(),
        });
    }

    Ok((location, info, source.duration_secs))
}
