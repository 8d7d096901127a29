//! Show what the composer sees in a media file.

use reelsmith_common::config::AppConfig;
use reelsmith_composer::geometry::normalize;
use reelsmith_composer::{FfprobeProbe, MediaProbe};
use reelsmith_project_model::location::SourceLocation;

pub async fn run(config: &AppConfig, file: String, json: bool) -> anyhow::Result<()> {
    let location =
        SourceLocation::parse(&file).map_err(|e| anyhow::anyhow!("Invalid location: {e}"))?;

    let probe = FfprobeProbe::new(config.composer.ffprobe_path.clone());
    let info = probe
        .probe(&location)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to probe {location}: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Media: {location}");
    println!("  Video: {}", if info.has_video { "yes" } else { "no" });
    println!("  Audio: {}", if info.has_audio { "yes" } else { "no" });
    if info.duration_secs > 0.0 {
        println!("  Duration: {:.3}s", info.duration_secs);
    } else {
        println!("  Duration: unknown");
    }
    if info.has_video {
        let geometry = normalize(info.natural_size, info.preferred_transform());
        println!(
            "  Coded size: {}x{}",
            info.natural_size.width, info.natural_size.height
        );
        println!(
            "  Rotation: {} deg{}",
            info.orientation.rotation_degrees,
            if info.orientation.mirrored { " (mirrored)" } else { "" }
        );
        println!(
            "  Display size: {}x{}",
            geometry.display_size.width, geometry.display_size.height
        );
    }

    Ok(())
}
