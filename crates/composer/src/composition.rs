//! Multi-track composition model.
//!
//! A composition is a set of tracks, each an ordered list of segments that
//! map a range of a source onto a range of the output timeline. Gaps between
//! segments are silence (audio) or nothing (video). Editing operations keep
//! every track's segments sorted and non-overlapping.

use std::fmt;

use reelsmith_project_model::location::SourceLocation;
use serde::{Deserialize, Serialize};

use crate::time::{MediaTime, TimeRange};

/// Upper bound on tracks in a single composition.
pub const MAX_TRACKS: usize = 64;

/// Identifier of a track within one composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// The media type a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
}

/// One source range placed on the output timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSegment {
    pub source: SourceLocation,
    /// Range read from the source, in source time.
    pub source_range: TimeRange,
    /// Range occupied on the output timeline.
    pub target_range: TimeRange,
}

impl TrackSegment {
    /// Effective playback rate: source time consumed per output second.
    pub fn playback_rate(&self) -> f64 {
        if self.target_range.duration.is_zero() {
            return 1.0;
        }
        self.source_range.duration.as_secs() / self.target_range.duration.as_secs()
    }

    /// Split at output time `at`, which must fall strictly inside the
    /// segment. The source split point is proportional to the rate.
    fn split(&self, at: MediaTime) -> (TrackSegment, TrackSegment) {
        let head_target = at - self.target_range.start;
        let head_source = head_target.mul_ratio(
            self.source_range.duration,
            self.target_range.duration,
        );

        let head = TrackSegment {
            source: self.source.clone(),
            source_range: TimeRange::new(self.source_range.start, head_source),
            target_range: TimeRange::new(self.target_range.start, head_target),
        };
        let tail = TrackSegment {
            source: self.source.clone(),
            source_range: TimeRange::new(
                self.source_range.start + head_source,
                self.source_range.duration - head_source,
            ),
            target_range: TimeRange::new(at, self.target_range.duration - head_target),
        };
        (head, tail)
    }
}

/// A single track of one media kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionTrack {
    pub id: TrackId,
    pub kind: MediaKind,
    pub segments: Vec<TrackSegment>,
}

impl CompositionTrack {
    /// End of the last segment, or zero for an empty track.
    pub fn end(&self) -> MediaTime {
        self.segments
            .last()
            .map(|s| s.target_range.end())
            .unwrap_or(MediaTime::ZERO)
    }

    /// Make `at` a segment boundary by splitting any segment straddling it.
    fn split_at(&mut self, at: MediaTime) {
        let straddling = self
            .segments
            .iter()
            .position(|s| s.target_range.start < at && at < s.target_range.end());
        if let Some(idx) = straddling {
            let (head, tail) = self.segments[idx].split(at);
            self.segments[idx] = head;
            self.segments.insert(idx + 1, tail);
        }
    }
}

/// Errors from editing a composition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    #[error("composition already has the maximum of {limit} tracks")]
    TooManyTracks { limit: usize },

    #[error("unknown {0}")]
    UnknownTrack(TrackId),

    #[error("cannot insert an empty source range")]
    EmptyRange,

    #[error("invalid time range {0}")]
    InvalidRange(TimeRange),
}

/// A multi-track timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    tracks: Vec<CompositionTrack>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new empty track.
    pub fn add_track(&mut self, kind: MediaKind) -> Result<TrackId, CompositionError> {
        if self.tracks.len() >= MAX_TRACKS {
            return Err(CompositionError::TooManyTracks { limit: MAX_TRACKS });
        }
        let id = TrackId(self.tracks.len() as u32);
        self.tracks.push(CompositionTrack {
            id,
            kind,
            segments: vec![],
        });
        Ok(id)
    }

    /// Insert `source_range` of `source` into `track` at output time `at`.
    ///
    /// Segments at or after `at` move later by the inserted duration; a
    /// segment straddling `at` is split first. Inserting past the end of the
    /// track leaves a gap.
    pub fn insert_time_range(
        &mut self,
        track: TrackId,
        source: SourceLocation,
        source_range: TimeRange,
        at: MediaTime,
    ) -> Result<(), CompositionError> {
        if source_range.is_empty() {
            return Err(CompositionError::EmptyRange);
        }
        if at < MediaTime::ZERO || source_range.start < MediaTime::ZERO {
            return Err(CompositionError::InvalidRange(TimeRange::new(
                at,
                source_range.duration,
            )));
        }

        let track = self.track_mut(track)?;
        track.split_at(at);

        let shift = source_range.duration;
        let insert_idx = track
            .segments
            .iter()
            .position(|s| s.target_range.start >= at)
            .unwrap_or(track.segments.len());
        for segment in &mut track.segments[insert_idx..] {
            segment.target_range.start += shift;
        }
        track.segments.insert(
            insert_idx,
            TrackSegment {
                source,
                source_range,
                target_range: TimeRange::new(at, source_range.duration),
            },
        );
        Ok(())
    }

    /// Stretch or compress `range` of `track` to `new_duration`.
    ///
    /// Segments inside the range are rescaled proportionally (their source
    /// ranges stay the same, so their playback rate changes); later segments
    /// shift by the difference.
    pub fn scale_time_range(
        &mut self,
        track: TrackId,
        range: TimeRange,
        new_duration: MediaTime,
    ) -> Result<(), CompositionError> {
        if range.is_empty() || new_duration <= MediaTime::ZERO || range.start < MediaTime::ZERO {
            return Err(CompositionError::InvalidRange(range));
        }

        let track = self.track_mut(track)?;
        track.split_at(range.start);
        track.split_at(range.end());

        let delta = new_duration - range.duration;
        for segment in &mut track.segments {
            let target = &mut segment.target_range;
            if target.start >= range.end() {
                target.start += delta;
            } else if range.encloses(target) {
                let offset = target.start - range.start;
                let end_offset = target.end() - range.start;
                let scaled_start = offset.mul_ratio(new_duration, range.duration);
                let scaled_end = end_offset.mul_ratio(new_duration, range.duration);
                *target = TimeRange::new(range.start + scaled_start, scaled_end - scaled_start);
            }
        }
        Ok(())
    }

    pub fn tracks(&self) -> &[CompositionTrack] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: MediaKind) -> impl Iterator<Item = &CompositionTrack> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    pub fn track(&self, id: TrackId) -> Option<&CompositionTrack> {
        self.tracks.get(id.0 as usize)
    }

    /// Latest segment end across all tracks.
    pub fn duration(&self) -> MediaTime {
        self.tracks
            .iter()
            .map(CompositionTrack::end)
            .max()
            .unwrap_or(MediaTime::ZERO)
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut CompositionTrack, CompositionError> {
        self.tracks
            .get_mut(id.0 as usize)
            .ok_or(CompositionError::UnknownTrack(id))
    }
}
