//! Build a composition and print its layout without rendering.

use std::path::PathBuf;

use reelsmith_common::config::AppConfig;
use reelsmith_composer::composition::MediaKind;
use reelsmith_composer::Composer;
use reelsmith_project_model::project::TimelineProject;

pub async fn run(config: &AppConfig, path: PathBuf, json: bool) -> anyhow::Result<()> {
    let project =
        TimelineProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    let composer = Composer::from_config(&config.composer);
    let result = composer
        .build(&project)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to build composition: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Composition: {}", project.name);
    println!("  Duration: {}", result.duration);
    if let Some(plan) = &result.frame_plan {
        println!(
            "  Render size: {}x{}",
            plan.render_size.width, plan.render_size.height
        );
    }
    println!();

    println!("Segments:");
    for segment in &result.placed_segments {
        println!(
            "  {} {} ({}x{} -> {}x{})",
            segment.time_range,
            segment.source_id,
            segment.natural_size.width,
            segment.natural_size.height,
            segment.display_size.width,
            segment.display_size.height,
        );
    }
    println!();

    println!("Tracks:");
    for track in result.composition.tracks() {
        let kind = match track.kind {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        };
        let gain = result
            .audio_mix
            .as_ref()
            .and_then(|mix| mix.volume_for(track.id))
            .map(|v| format!(", gain {v:.2}"))
            .unwrap_or_default();
        println!(
            "  {} {kind}: {} segment(s), ends {}{gain}",
            track.id,
            track.segments.len(),
            track.end()
        );
    }

    Ok(())
}
