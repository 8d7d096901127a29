mod common;

use common::{composer, standard_probe, uri, EncoderBehavior, TestEncoder};
use proptest::prelude::*;
use reelsmith_composer::clamp::{clamp_rate, clamp_trim, is_unit_rate};
use reelsmith_composer::composition::MediaKind;
use reelsmith_composer::{CompositionResult, MediaTime, TimeRange};
use reelsmith_project_model::project::{MediaSource, TimelineProject, VideoEntry};
use reelsmith_project_model::shape::OutputShape;

const SOURCE_SECS: f64 = 20.0;

fn entry_strategy() -> impl Strategy<Value = (f64, f64, f64)> {
    (-2.0f64..25.0, -2.0f64..25.0, 0.01f64..5.0)
}

fn shape_strategy() -> impl Strategy<Value = OutputShape> {
    prop_oneof![
        Just(OutputShape::Feed),
        Just(OutputShape::Landscape),
        Just(OutputShape::Portrait),
        Just(OutputShape::Square),
        Just(OutputShape::Custom { width: 21, height: 9 }),
    ]
}

fn build(entries: &[(f64, f64, f64)], shape: OutputShape) -> CompositionResult {
    let mut project = TimelineProject::new("props");
    project.output_shape = shape;
    project
        .media_sources
        .push(MediaSource::new("wide", uri("landscape.mp4"), SOURCE_SECS));
    for &(in_point, out_point, rate) in entries {
        project
            .video_entries
            .push(VideoEntry::new("wide", in_point, out_point).rate(rate));
    }

    let (composer, _, _) = composer(standard_probe(), TestEncoder::new(EncoderBehavior::Succeed));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    runtime
        .block_on(composer.build(&project))
        .expect("build should succeed")
}

/// `(out - in) / rate` in plain seconds, after the builder's clamping.
fn expected_duration(in_point: f64, out_point: f64, rate: f64) -> MediaTime {
    let (in_point, out_point) = clamp_trim(in_point, out_point, SOURCE_SECS);
    let rate = clamp_rate(rate);
    if is_unit_rate(rate) {
        TimeRange::from_secs(in_point, out_point).duration
    } else {
        MediaTime::from_secs((out_point - in_point) / rate)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn segments_are_contiguous_and_sum_to_duration(
        entries in prop::collection::vec(entry_strategy(), 1..8),
    ) {
        let result = build(&entries, OutputShape::Landscape);

        prop_assert_eq!(result.placed_segments.len(), entries.len());
        let mut cursor = MediaTime::ZERO;
        for (placed, &(in_point, out_point, rate)) in result.placed_segments.iter().zip(&entries) {
            prop_assert_eq!(placed.time_range.start, cursor);
            let expected = expected_duration(in_point, out_point, rate);
            prop_assert!(
                (placed.time_range.duration.ticks() - expected.ticks()).abs() <= 1,
                "placed {} expected {}",
                placed.time_range.duration,
                expected
            );
            prop_assert!(!placed.time_range.is_empty());
            cursor = placed.time_range.end();
        }
        prop_assert_eq!(result.duration, cursor);
        prop_assert_eq!(result.composition.duration(), cursor);
    }

    #[test]
    fn video_track_tiles_the_timeline(
        entries in prop::collection::vec(entry_strategy(), 1..8),
    ) {
        let result = build(&entries, OutputShape::Landscape);
        let video: Vec<_> = result.composition.tracks_of(MediaKind::Video).collect();
        prop_assert_eq!(video.len(), 1);

        let mut cursor = MediaTime::ZERO;
        for segment in &video[0].segments {
            prop_assert_eq!(segment.target_range.start, cursor);
            prop_assert!(segment.source_range.end() <= MediaTime::from_secs(SOURCE_SECS));
            cursor = segment.target_range.end();
        }
        prop_assert_eq!(cursor, result.duration);
    }

    #[test]
    fn frame_plan_covers_every_instant(
        entries in prop::collection::vec(entry_strategy(), 1..6),
        shape in shape_strategy(),
    ) {
        let result = build(&entries, shape);
        let plan = result.frame_plan.as_ref().expect("non-empty timeline has a plan");

        prop_assert_eq!(plan.render_size.width % 2, 0);
        prop_assert_eq!(plan.render_size.height % 2, 0);
        prop_assert_eq!(plan.duration(), result.duration);
        for (instruction, placed) in plan.instructions.iter().zip(&result.placed_segments) {
            prop_assert_eq!(instruction.time_range, placed.time_range);
            prop_assert!(plan.instruction_at(instruction.time_range.start).is_some());
            prop_assert!(instruction.content_rect.x0 >= -1e-6);
            prop_assert!(instruction.content_rect.y0 >= -1e-6);
            prop_assert!(instruction.content_rect.x1 <= plan.render_size.width as f64 + 1e-6);
            prop_assert!(instruction.content_rect.y1 <= plan.render_size.height as f64 + 1e-6);
        }
        prop_assert!(plan.instruction_at(result.duration).is_none());
    }
}
