//! `switchyard route`: run one request through the pipeline.

use switchyard_core::TaskRequest;
use switchyard_router::{Resolution, Routed, RoutingPipeline, SlotContent};

pub async fn run(
    description: String,
    hints: Vec<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let registry = switchyard_profiles::from_config(&config)?;
    let pipeline = RoutingPipeline::from_config(&config)?;

    let request = TaskRequest::new(description).with_hints(hints);
    let routed = pipeline.route(&request, &registry.all())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&routed)?);
    } else {
        print_routed(&routed)?;
    }
    Ok(())
}

fn print_routed(routed: &Routed) -> Result<(), Box<dyn std::error::Error>> {
    println!("Classification:");
    let active = routed.classification.active_ids();
    for score in &routed.classification.scores {
        let marker = if active.contains(&score.profile_id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "  {marker} {:<16} {:.3}  [{}]{}",
            score.profile_id,
            score.confidence,
            score.matched_tags.join(", "),
            if score.forced { " (hint)" } else { "" }
        );
    }

    let composition = &routed.composition;
    println!("\nPreferences:");
    for pref in &composition.preferences {
        println!("  {:<16} {}", pref.category, describe(&pref.resolution));
    }

    println!("\nTemplate:");
    for slot in &composition.sections {
        let detail = match &slot.content {
            SlotContent::Preference { resolution, .. } => describe(resolution),
            SlotContent::Attributed { .. } => slot.profiles.join(" + "),
        };
        println!("  - {:<20} {detail}", slot.name);
    }

    if composition.is_multi_profile() {
        println!(
            "\nHandoff: {} profiles collaborate",
            composition.profile_ids().join(", ")
        );
    }
    println!("\nFingerprint: {}", composition.fingerprint()?);
    Ok(())
}

fn describe(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Chosen { option, .. } => option.clone(),
        Resolution::AnyOf { options } => format!("any of {}", options.join(" | ")),
        Resolution::Conflict { candidates } => format!("CONFLICT {}", candidates.join(" vs ")),
    }
}
