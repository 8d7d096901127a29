mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{composer, standard_probe, temp_dir, uri, EncoderBehavior, TestEncoder};
use reelsmith_composer::{
    CancelToken, ComposeError, ExportPreset, ExportProgress, ExportQuality, ExportStage,
    ProgressCallback,
};
use reelsmith_project_model::project::{MediaSource, TimelineProject, VideoEntry};

fn project() -> TimelineProject {
    let mut project = TimelineProject::new("export");
    project
        .media_sources
        .push(MediaSource::new("wide", uri("landscape.mp4"), 20.0));
    project.video_entries.push(VideoEntry::new("wide", 0.0, 4.0));
    project
}

#[tokio::test]
async fn export_twice_to_same_path_overwrites() {
    let dir = temp_dir("export_twice");
    let out = dir.join("renders").join("reel.mp4");
    let (composer, _, encoder) = composer(standard_probe(), TestEncoder::new(EncoderBehavior::Succeed));

    composer
        .export(&project(), &out, ExportQuality::High)
        .await
        .expect("first export");
    composer
        .export(&project(), &out, ExportQuality::High)
        .await
        .expect("second export");

    assert_eq!(
        std::fs::read_to_string(&out).expect("output exists"),
        "1920x1080 4.000"
    );
    assert_eq!(encoder.calls().len(), 2);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn unsupported_presets_fall_back_in_order() {
    let dir = temp_dir("export_fallback");
    let out = dir.join("reel.mp4");
    let encoder = TestEncoder::new(EncoderBehavior::Succeed)
        .refusing(&[ExportPreset::Uhd3840x2160, ExportPreset::HighestQuality]);
    let (composer, _, encoder) = composer(standard_probe(), encoder);

    composer
        .export(&project(), &out, ExportQuality::Ultra)
        .await
        .expect("export should fall back");

    assert_eq!(encoder.calls(), vec![(out.clone(), ExportPreset::Hd1920x1080)]);
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn no_supported_preset_cannot_create_session() {
    let dir = temp_dir("export_no_preset");
    let out = dir.join("reel.mp4");
    let encoder = TestEncoder::new(EncoderBehavior::Succeed).refusing(&[
        ExportPreset::Hd1280x720,
        ExportPreset::HighestQuality,
        ExportPreset::MediumQuality,
    ]);
    let (composer, _, encoder) = composer(standard_probe(), encoder);

    let err = composer
        .export(&project(), &out, ExportQuality::Standard)
        .await
        .unwrap_err();

    assert!(matches!(err, ComposeError::CannotCreateExportSession { .. }));
    assert!(encoder.calls().is_empty());
    assert!(!out.exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn unavailable_encoder_cannot_create_session() {
    let dir = temp_dir("export_unavailable");
    let out = dir.join("reel.mp4");
    let (composer, _, _) = composer(
        standard_probe(),
        TestEncoder::new(EncoderBehavior::Succeed).unavailable(),
    );

    let err = composer
        .export(&project(), &out, ExportQuality::High)
        .await
        .unwrap_err();
    assert!(matches!(err, ComposeError::CannotCreateExportSession { .. }));
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn encoder_failure_removes_partial_output() {
    let dir = temp_dir("export_failure");
    let out = dir.join("reel.mp4");
    std::fs::write(&out, b"previous render").expect("seed old output");
    let (composer, _, _) = composer(standard_probe(), TestEncoder::new(EncoderBehavior::Fail));

    let err = composer
        .export(&project(), &out, ExportQuality::High)
        .await
        .unwrap_err();

    match err {
        ComposeError::ExportFailed { message } => assert!(message.contains("muxer exploded")),
        other => panic!("expected ExportFailed, got {other:?}"),
    }
    assert!(!out.exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn build_errors_leave_destination_untouched() {
    let dir = temp_dir("export_build_error");
    let out = dir.join("reel.mp4");
    std::fs::write(&out, b"previous render").expect("seed old output");
    let (composer, _, encoder) = composer(standard_probe(), TestEncoder::new(EncoderBehavior::Succeed));

    let mut broken = project();
    broken.video_entries.push(VideoEntry::new("ghost", 0.0, 1.0));
    let err = composer
        .export(&broken, &out, ExportQuality::High)
        .await
        .unwrap_err();

    assert!(matches!(err, ComposeError::MissingSource { .. }));
    assert_eq!(std::fs::read(&out).expect("old output kept"), b"previous render");
    assert!(encoder.calls().is_empty());
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn cancelling_mid_encode_discards_output() {
    let dir = temp_dir("export_cancel");
    let out = dir.join("reel.mp4");
    let (composer, _, encoder) = composer(standard_probe(), TestEncoder::new(EncoderBehavior::Hang));

    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        let out = out.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                if out.exists() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            token.cancel();
        })
    };

    let err = composer
        .export_with(&project(), &out, ExportQuality::High, None, &token)
        .await
        .unwrap_err();
    canceller.await.expect("canceller task");

    assert!(matches!(err, ComposeError::Cancelled));
    assert_eq!(encoder.calls().len(), 1);
    assert!(!out.exists());
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn progress_runs_from_preparing_to_complete() {
    let dir = temp_dir("export_progress");
    let out = dir.join("reel.mp4");
    let (composer, _, _) = composer(standard_probe(), TestEncoder::new(EncoderBehavior::Succeed));

    let stages = Arc::new(Mutex::new(vec![]));
    let progress: ProgressCallback = {
        let stages = Arc::clone(&stages);
        Arc::new(move |p: ExportProgress| stages.lock().expect("stages lock").push(p.stage))
    };

    composer
        .export_with(&project(), &out, ExportQuality::High, Some(progress), &CancelToken::new())
        .await
        .expect("export should succeed");

    let stages = stages.lock().expect("stages lock").clone();
    assert_eq!(
        stages,
        vec![
            ExportStage::Preparing,
            ExportStage::Rendering,
            ExportStage::Complete
        ]
    );
    std::fs::remove_dir_all(&dir).ok();
}
