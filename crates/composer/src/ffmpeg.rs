//! FFmpeg-backed encoder.
//!
//! Translates a composition result into a single `filter_complex` graph:
//! every video segment is trimmed, retimed, fitted into the render canvas and
//! concatenated; every audio segment is trimmed, retimed, gained and delayed
//! to its timeline offset before all of them are mixed.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use reelsmith_common::config::ComposerConfig;
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use reelsmith_project_model::location::SourceLocation;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::cancel::CancelToken;
use crate::clamp::is_unit_rate;
use crate::composer::CompositionResult;
use crate::composition::MediaKind;
use crate::encode::{ExportPreset, ExportProgress, ExportStage, MediaEncoder, ProgressCallback};

/// Seconds without progress before a stall warning.
const STALL_WARNING_SECS: u64 = 10;

/// Encoder settings, usually taken from [`ComposerConfig`].
#[derive(Debug, Clone)]
pub struct FfmpegSettings {
    pub binary: PathBuf,
    pub video_codec: String,
    pub audio_bitrate_kbps: u32,
    pub fps: u32,
    /// Largest frame edge the encoder accepts.
    pub max_dimension: u32,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self::from(&ComposerConfig::default())
    }
}

impl From<&ComposerConfig> for FfmpegSettings {
    fn from(config: &ComposerConfig) -> Self {
        Self {
            binary: config.ffmpeg_path.clone(),
            video_codec: config.video_codec.clone(),
            audio_bitrate_kbps: config.audio_bitrate_kbps,
            fps: config.fps.max(1),
            max_dimension: config.max_encoder_dimension,
        }
    }
}

/// Encoder that shells out to `ffmpeg`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    settings: FfmpegSettings,
}

impl FfmpegEncoder {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FfmpegSettings {
        &self.settings
    }

    async fn run_ffmpeg(
        &self,
        args: &[String],
        total_frames: u64,
        expected_duration_secs: f64,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ReelsmithResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = tokio::process::Command::new(&self.settings.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReelsmithError::encode(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            total_frames,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelsmithError::encode("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelsmithError::encode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let started = Instant::now();
        let mut lines = BufReader::new(stdout).lines();
        let mut latest = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = Instant::now();

        loop {
            let line = tokio::select! {
                biased;
                // Returning drops the child, and kill_on_drop stops ffmpeg.
                _ = cancel.cancelled() => return Err(ReelsmithError::Cancelled),
                line = lines.next_line() => line.map_err(|e| {
                    ReelsmithError::encode(format!("Failed reading ffmpeg progress: {e}"))
                })?,
            };
            let Some(line) = line else { break };

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest.out_time_secs;
                last_progress_wall = Instant::now();
            }
            if let Some(cb) = &progress {
                cb(progress_report(
                    &latest,
                    total_frames,
                    expected_duration_secs,
                    started.elapsed().as_secs_f64(),
                ));
            }
            if last_progress_wall.elapsed().as_secs() >= STALL_WARNING_SECS {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for {STALL_WARNING_SECS}s"
                );
                last_progress_wall = Instant::now();
            }
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReelsmithError::Cancelled),
            status = child.wait() => status
                .map_err(|e| ReelsmithError::encode(format!("Failed to wait on ffmpeg: {e}")))?,
        };

        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(ReelsmithError::encode(format!(
                "ffmpeg export failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn is_available(&self) -> bool {
        command_exists(&self.settings.binary).await
    }

    fn supports(&self, preset: ExportPreset, result: &CompositionResult) -> bool {
        let Some(plan) = &result.frame_plan else {
            return false;
        };
        match preset {
            ExportPreset::HighestQuality => plan.render_size.long_edge() <= self.settings.max_dimension,
            ExportPreset::MediumQuality => true,
            fixed => fixed
                .bounding_box()
                .map(|(long, _)| long <= self.settings.max_dimension)
                .unwrap_or(false),
        }
    }

    async fn encode(
        &self,
        result: &CompositionResult,
        destination: &Path,
        preset: ExportPreset,
        progress: Option<ProgressCallback>,
        cancel: &CancelToken,
    ) -> ReelsmithResult<()> {
        let args = build_ffmpeg_args(result, destination, preset, &self.settings)?;
        let duration_secs = result.duration.as_secs();
        let total_frames = (duration_secs * self.settings.fps as f64).ceil() as u64;

        tracing::info!(
            encoder = self.name(),
            %preset,
            output = %destination.display(),
            duration_secs,
            "Encoding composition"
        );
        self.run_ffmpeg(&args, total_frames, duration_secs, progress, cancel)
            .await
    }
}

/// Build the full ffmpeg argument list for one export.
pub fn build_ffmpeg_args(
    result: &CompositionResult,
    destination: &Path,
    preset: ExportPreset,
    settings: &FfmpegSettings,
) -> ReelsmithResult<Vec<String>> {
    let plan = result
        .frame_plan
        .as_ref()
        .ok_or_else(|| ReelsmithError::encode("composition has no frame plan"))?;
    let video = result
        .composition
        .tracks_of(MediaKind::Video)
        .next()
        .ok_or_else(|| ReelsmithError::encode("composition has no video track"))?;
    if video.segments.len() != plan.instructions.len() {
        return Err(ReelsmithError::encode(format!(
            "frame plan has {} instructions for {} video segments",
            plan.instructions.len(),
            video.segments.len()
        )));
    }

    let mut inputs: Vec<&SourceLocation> = vec![];

    let canvas = plan.render_size;
    let output = preset.output_size(canvas);
    let mut graph = String::new();

    for (idx, (segment, instruction)) in video.segments.iter().zip(&plan.instructions).enumerate() {
        let input = input_index(&mut inputs, &segment.source);
        // ffmpeg applies the display matrix on decode, so frames arrive
        // upright and only need scaling into the content rect.
        let width = even_round(instruction.content_rect.width()).min(canvas.width);
        let height = even_round(instruction.content_rect.height()).min(canvas.height);
        let _ = write!(
            graph,
            "[{input}:v]trim=start={start:.6}:duration={dur:.6},setpts=(PTS-STARTPTS)/{rate:.6},scale={width}:{height}:flags=lanczos,setsar=1,pad={cw}:{ch}:{x}:{y}:color=black,fps={fps}[v{idx}];",
            start = segment.source_range.start.as_secs(),
            dur = segment.source_range.duration.as_secs(),
            rate = segment.playback_rate(),
            cw = canvas.width,
            ch = canvas.height,
            x = (canvas.width - width) / 2,
            y = (canvas.height - height) / 2,
            fps = settings.fps,
        );
    }
    for idx in 0..video.segments.len() {
        let _ = write!(graph, "[v{idx}]");
    }
    let _ = write!(
        graph,
        "concat=n={n}:v=1:a=0[vcat];[vcat]scale={w}:{h}:flags=lanczos,format=yuv420p[vout]",
        n = video.segments.len(),
        w = output.width,
        h = output.height,
    );

    let mut audio_labels = vec![];
    for track in result.composition.tracks_of(MediaKind::Audio) {
        let gain = result
            .audio_mix
            .as_ref()
            .and_then(|mix| mix.volume_for(track.id))
            .unwrap_or(1.0);
        for segment in &track.segments {
            let input = input_index(&mut inputs, &segment.source);
            let label = format!("a{}", audio_labels.len());
            let tempo: String = atempo_chain(segment.playback_rate())
                .iter()
                .map(|factor| format!(",atempo={factor:.6}"))
                .collect();
            let _ = write!(
                graph,
                ";[{input}:a]atrim=start={start:.6}:duration={dur:.6},asetpts=PTS-STARTPTS{tempo},volume={gain:.4},adelay={delay}:all=1[{label}]",
                start = segment.source_range.start.as_secs(),
                dur = segment.source_range.duration.as_secs(),
                delay = (segment.target_range.start.as_secs() * 1000.0).round() as i64,
            );
            audio_labels.push(label);
        }
    }
    match audio_labels.len() {
        0 => {}
        1 => graph.push_str(";[a0]anull[aout]"),
        n => {
            graph.push(';');
            for label in &audio_labels {
                let _ = write!(graph, "[{label}]");
            }
            let _ = write!(graph, "amix=inputs={n}:normalize=0:duration=longest[aout]");
        }
    }

    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-progress",
        "pipe:1",
        "-nostats",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for location in &inputs {
        args.push("-i".to_string());
        args.push(location.to_string());
    }
    args.push("-filter_complex".to_string());
    args.push(graph);
    args.push("-map".to_string());
    args.push("[vout]".to_string());
    if !audio_labels.is_empty() {
        args.push("-map".to_string());
        args.push("[aout]".to_string());
    }
    args.push("-r".to_string());
    args.push(settings.fps.to_string());
    args.extend(codec_args(settings, preset, !audio_labels.is_empty()));
    args.push("-t".to_string());
    args.push(format!("{:.6}", result.duration.as_secs()));
    args.push(destination.display().to_string());
    Ok(args)
}

/// Position of `location` among the `-i` inputs, appending it if new.
fn input_index<'a>(inputs: &mut Vec<&'a SourceLocation>, location: &'a SourceLocation) -> usize {
    match inputs.iter().position(|l| *l == location) {
        Some(idx) => idx,
        None => {
            inputs.push(location);
            inputs.len() - 1
        }
    }
}

/// Split a playback rate into `atempo` factors, each within `[0.5, 2.0]`.
/// Unit rates need no filter.
pub fn atempo_chain(rate: f64) -> Vec<f64> {
    if !rate.is_finite() || rate <= 0.0 || is_unit_rate(rate) {
        return vec![];
    }
    let mut factors = vec![];
    let mut remaining = rate;
    while remaining > 2.0 {
        factors.push(2.0);
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        factors.push(0.5);
        remaining /= 0.5;
    }
    factors.push(remaining);
    factors
}

fn even_round(value: f64) -> u32 {
    ((value / 2.0).round() * 2.0).max(2.0) as u32
}

fn codec_args(settings: &FfmpegSettings, preset: ExportPreset, has_audio: bool) -> Vec<String> {
    let crf = preset.crf().to_string();
    let mut args: Vec<String> = match settings.video_codec.as_str() {
        "libx264" => vec![
            "-c:v", "libx264", "-preset", "medium", "-profile:v", "high", "-crf",
        ],
        "libx265" => vec!["-c:v", "libx265", "-preset", "medium", "-tag:v", "hvc1", "-crf"],
        other => vec!["-c:v", other, "-crf"],
    }
    .into_iter()
    .map(str::to_string)
    .collect();
    args.push(crf);
    args.extend(["-pix_fmt", "yuv420p"].map(str::to_string));

    if has_audio {
        args.extend(
            [
                "-c:a".to_string(),
                "aac".to_string(),
                "-b:a".to_string(),
                format!("{}k", settings.audio_bitrate_kbps.max(64)),
            ],
        );
    } else {
        args.push("-an".to_string());
    }
    args.extend(["-movflags", "+faststart"].map(str::to_string));
    args
}

async fn command_exists(binary: &Path) -> bool {
    tokio::process::Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite the name, ffmpeg reports out_time_ms in microseconds.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    total_frames: u64,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> ExportProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let frames_rendered = (progress * total_frames as f64).round() as u64;
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress: if state.complete { 1.0 } else { progress },
        frames_rendered,
        total_frames,
        eta_secs,
        stage: if state.complete {
            ExportStage::Finalizing
        } else {
            ExportStage::Rendering
        },
    }
}
