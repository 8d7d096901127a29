//! Validate a timeline project.

use std::path::PathBuf;

use reelsmith_composer::source::resolve_readable;
use reelsmith_project_model::project::TimelineProject;

pub async fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating project at: {}", path.display());

    let project =
        TimelineProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    println!("  Name: {}", project.name);
    println!("  Version: {}", project.version);
    println!("  Shape: {:?}", project.output_shape);
    println!("  Sources: {}", project.media_sources.len());
    println!("  Video entries: {}", project.video_entries.len());
    println!("  Audio overlays: {}", project.audio_entries.len());
    println!("  Narration: {}", project.narration_entries.len());
    println!("  Nominal duration: {:.2}s", project.nominal_duration_secs());

    let mut issues = project.validate();
    for source in &project.media_sources {
        if let Err(e) = resolve_readable(&project, &source.location).await {
            issues.push(format!("Source {} is not readable: {e}", source.id));
        }
    }

    if issues.is_empty() {
        println!("\nProject is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found. The composer may skip or adjust some media.",
            issues.len()
        );
    }

    Ok(())
}
