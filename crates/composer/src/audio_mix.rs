//! Overlay audio: auxiliary tracks, narration, and the gain mix.
//!
//! Overlays are optional. Any that cannot be resolved, probed, or lack an
//! audio stream are logged and skipped. Probing runs concurrently; placement
//! happens afterwards in declaration order so track ids are stable.

use std::sync::Arc;

use reelsmith_project_model::location::SourceLocation;
use reelsmith_project_model::project::TimelineProject;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::clamp::{clamp_trim, clamp_volume};
use crate::composition::{Composition, MediaKind, TrackId};
use crate::error::ComposeResult;
use crate::probe::{MediaInfo, MediaProbe};
use crate::source::ensure_exists;
use crate::time::{MediaTime, TimeRange};

/// Constant gain applied to one audio track from time zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackGain {
    pub track: TrackId,
    pub volume: f64,
}

/// Per-track gain parameters for the final mix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMix {
    pub gains: Vec<TrackGain>,
}

impl AudioMix {
    pub fn volume_for(&self, track: TrackId) -> Option<f64> {
        self.gains.iter().find(|g| g.track == track).map(|g| g.volume)
    }
}

#[derive(Debug, Clone)]
enum OverlayKind {
    Auxiliary {
        in_point: f64,
        out_point: f64,
        volume: f64,
        timeline_start: f64,
    },
    Narration {
        start_secs: f64,
        end_secs: f64,
    },
}

/// An overlay whose source resolved and probed successfully.
#[derive(Debug, Clone)]
pub struct ProbedOverlay {
    /// Declaration order: auxiliary entries first, then narration.
    order: usize,
    label: String,
    location: SourceLocation,
    info: MediaInfo,
    kind: OverlayKind,
}

/// Resolve and probe every overlay of `project` concurrently.
///
/// Unusable overlays are dropped from the result. The returned list is in
/// declaration order.
pub async fn probe_overlays(
    project: &TimelineProject,
    probe: Arc<dyn MediaProbe>,
) -> Vec<ProbedOverlay> {
    let mut tasks = JoinSet::new();
    let mut order = 0;

    let auxiliary = project.audio_entries.iter().enumerate().map(|(idx, e)| {
        (
            format!("audio entry {idx}"),
            Some(e.path.as_str()),
            OverlayKind::Auxiliary {
                in_point: e.in_point,
                out_point: e.out_point,
                volume: e.volume,
                timeline_start: e.timeline_start,
            },
        )
    });
    let narration = project.narration_entries.iter().enumerate().map(|(idx, e)| {
        (
            format!("narration entry {idx}"),
            e.audio_path.as_deref(),
            OverlayKind::Narration {
                start_secs: e.start_secs,
                end_secs: e.end_secs,
            },
        )
    });

    for (label, raw, kind) in auxiliary.chain(narration) {
        order += 1;
        let Some(raw) = raw else {
            tracing::debug!(overlay = %label, "No recording attached, skipping");
            continue;
        };
        let location = match project.resolve_location(raw) {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!(overlay = %label, location = raw, error = %e, "Skipping overlay with invalid location");
                continue;
            }
        };

        let probe = Arc::clone(&probe);
        tasks.spawn(async move {
            if let Err(e) = ensure_exists(&location).await {
                tracing::warn!(overlay = %label, error = %e, "Skipping missing overlay");
                return None;
            }
            match probe.probe(&location).await {
                Ok(info) => Some(ProbedOverlay {
                    order,
                    label,
                    location,
                    info,
                    kind,
                }),
                Err(e) => {
                    tracing::warn!(overlay = %label, location = %location, error = %e, "Skipping unreadable overlay");
                    None
                }
            }
        });
    }

    let mut probed = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(overlay)) => probed.push(overlay),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Overlay probe task failed"),
        }
    }
    probed.sort_by_key(|o| o.order);
    probed
}

/// Place probed overlays on dedicated audio tracks and return their gains.
pub fn lay_overlays(
    composition: &mut Composition,
    overlays: Vec<ProbedOverlay>,
) -> ComposeResult<Vec<TrackGain>> {
    let mut gains = Vec::with_capacity(overlays.len());

    for overlay in overlays {
        if !overlay.info.has_audio {
            tracing::warn!(overlay = %overlay.label, "Overlay source has no audio, skipping");
            continue;
        }

        let (source_range, at, volume) = match overlay.kind {
            OverlayKind::Auxiliary {
                in_point,
                out_point,
                volume,
                timeline_start,
            } => {
                let (in_point, out_point) =
                    clamp_trim(in_point, out_point, overlay.info.duration_secs);
                let volume_clamped = clamp_volume(volume);
                if volume_clamped != volume {
                    tracing::debug!(overlay = %overlay.label, volume, clamped = volume_clamped, "Clamped overlay volume");
                }
                (
                    TimeRange::from_secs(in_point, out_point),
                    MediaTime::from_secs(timeline_start).max(MediaTime::ZERO),
                    volume_clamped,
                )
            }
            OverlayKind::Narration {
                start_secs,
                end_secs,
            } => {
                let start = if start_secs.is_finite() {
                    start_secs.max(0.0)
                } else {
                    0.0
                };
                let window = end_secs - start;
                if !window.is_finite() || window <= 0.0 {
                    tracing::debug!(overlay = %overlay.label, start_secs, end_secs, "Empty narration window, skipping");
                    continue;
                }
                let length = if overlay.info.duration_secs > 0.0 {
                    overlay.info.duration_secs.min(window)
                } else {
                    window
                };
                (
                    TimeRange::from_secs(0.0, length),
                    MediaTime::from_secs(start),
                    1.0,
                )
            }
        };

        if source_range.is_empty() {
            continue;
        }

        let track = composition.add_track(MediaKind::Audio)?;
        composition.insert_time_range(track, overlay.location, source_range, at)?;
        tracing::debug!(
            overlay = %overlay.label,
            %track,
            start = %at,
            duration = %source_range.duration,
            volume,
            "Placed overlay"
        );
        gains.push(TrackGain { track, volume });
    }

    Ok(gains)
}

/// Combine the primary clip audio (unity gain) with overlay gains.
/// Returns `None` when no track carries audio.
pub fn assemble_mix(primary_audio: Option<TrackId>, overlays: Vec<TrackGain>) -> Option<AudioMix> {
    let mut gains = Vec::with_capacity(overlays.len() + 1);
    if let Some(track) = primary_audio {
        gains.push(TrackGain { track, volume: 1.0 });
    }
    gains.extend(overlays);

    if gains.is_empty() {
        None
    } else {
        Some(AudioMix { gains })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MemoryProbe;
    use reelsmith_project_model::project::{AudioEntry, NarrationEntry};

    const MUSIC: &str = "https://media.test/music.m4a";
    const VOICE: &str = "https://media.test/voice.m4a";
    const SILENT: &str = "https://media.test/silent.mp4";

    fn remote(uri: &str) -> SourceLocation {
        SourceLocation::Remote(uri.to_string())
    }

    fn probe() -> Arc<dyn MediaProbe> {
        Arc::new(
            MemoryProbe::new()
                .with(remote(MUSIC), MediaInfo::audio(60.0))
                .with(remote(VOICE), MediaInfo::audio(3.0))
                .with(remote(SILENT), MediaInfo::video(640.0, 480.0, 5.0)),
        )
    }

    #[tokio::test]
    async fn test_overlays_are_placed_in_declaration_order() {
        let mut project = TimelineProject::new("mix");
        project
            .narration_entries
            .push(NarrationEntry::new(Some(VOICE.into()), 1.0, 6.0));
        project
            .audio_entries
            .push(AudioEntry::new(MUSIC, 5.0, 15.0).volume(1.5).at(3.0));

        let overlays = probe_overlays(&project, probe()).await;
        assert_eq!(overlays.len(), 2);

        let mut comp = Composition::new();
        let gains = lay_overlays(&mut comp, overlays).unwrap();
        assert_eq!(gains.len(), 2);
        assert_eq!(gains[0].volume, 1.5);
        assert_eq!(gains[1].volume, 1.0);

        let music = comp.track(gains[0].track).unwrap();
        assert_eq!(music.segments[0].target_range, TimeRange::from_secs(3.0, 13.0));
        assert_eq!(music.segments[0].source_range, TimeRange::from_secs(5.0, 15.0));

        // Voice file is shorter than its window.
        let voice = comp.track(gains[1].track).unwrap();
        assert_eq!(voice.segments[0].target_range, TimeRange::from_secs(1.0, 4.0));
    }

    #[tokio::test]
    async fn test_unusable_overlays_are_skipped() {
        let mut project = TimelineProject::new("mix");
        project.audio_entries.push(AudioEntry::new("ftp://x/a.mp3", 0.0, 2.0));
        project.audio_entries.push(AudioEntry::new("/missing/bed.m4a", 0.0, 2.0));
        project.audio_entries.push(AudioEntry::new(SILENT, 0.0, 2.0));
        project.audio_entries.push(AudioEntry::new("https://media.test/unknown.mp3", 0.0, 2.0));
        project.narration_entries.push(NarrationEntry::new(None, 0.0, 4.0));
        project
            .narration_entries
            .push(NarrationEntry::new(Some(VOICE.into()), 5.0, 5.0));
        project
            .narration_entries
            .push(NarrationEntry::new(Some(VOICE.into()), 1.0, f64::NAN));
        project
            .narration_entries
            .push(NarrationEntry::new(Some(VOICE.into()), 1.0, f64::INFINITY));

        let overlays = probe_overlays(&project, probe()).await;
        let mut comp = Composition::new();
        let gains = lay_overlays(&mut comp, overlays).unwrap();

        assert!(gains.is_empty());
        assert!(comp.tracks().is_empty());
        assert_eq!(assemble_mix(None, gains), None);
    }

    #[tokio::test]
    async fn test_negative_offsets_and_loud_volumes_are_clamped() {
        let mut project = TimelineProject::new("mix");
        project
            .audio_entries
            .push(AudioEntry::new(MUSIC, 0.0, 4.0).volume(5.0).at(-2.0));
        project
            .narration_entries
            .push(NarrationEntry::new(Some(VOICE.into()), -1.0, 1.5));

        let overlays = probe_overlays(&project, probe()).await;
        let mut comp = Composition::new();
        let gains = lay_overlays(&mut comp, overlays).unwrap();

        assert_eq!(gains[0].volume, 2.0);
        let music = comp.track(gains[0].track).unwrap();
        assert_eq!(music.segments[0].target_range.start, MediaTime::ZERO);

        let voice = comp.track(gains[1].track).unwrap();
        assert_eq!(voice.segments[0].target_range, TimeRange::from_secs(0.0, 1.5));
    }

    #[test]
    fn test_mix_puts_primary_audio_first() {
        let mix = assemble_mix(
            Some(TrackId(1)),
            vec![TrackGain {
                track: TrackId(2),
                volume: 0.5,
            }],
        )
        .unwrap();
        assert_eq!(mix.volume_for(TrackId(1)), Some(1.0));
        assert_eq!(mix.volume_for(TrackId(2)), Some(0.5));
        assert_eq!(mix.volume_for(TrackId(7)), None);
    }
}
