//! `switchyard profiles`: inspect the registry and validate documents.

use std::path::Path;
use tracing::warn;

use switchyard_profiles::ProfileSet;

/// List registered profiles in registry order.
pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let registry = switchyard_profiles::from_config(&config)?;
    let snapshot = registry.all();

    if snapshot.is_empty() {
        println!("No profiles registered.");
        println!("\nEnable the builtin catalog or add documents to the profiles directory:");
        println!("  [profiles]");
        println!("  builtin = true");
        println!("  dir = \"~/.switchyard/profiles\"");
        return Ok(());
    }

    println!("Profiles ({} registered):\n", snapshot.len());
    for (i, profile) in snapshot.iter().enumerate() {
        println!("  {}. {}", i + 1, profile.id);
        if !profile.description.is_empty() {
            println!("     {}", profile.description);
        }
        println!("     tags: {}", profile.tags.join(", "));
        let categories: Vec<&str> = profile.rankings.iter().map(|r| r.category.as_str()).collect();
        if !categories.is_empty() {
            println!("     rankings: {}", categories.join(", "));
        }
        if !profile.contract.provides.is_empty() || !profile.contract.requires.is_empty() {
            println!(
                "     contract: provides [{}], requires [{}]",
                profile.contract.provides.join(", "),
                profile.contract.requires.join(", ")
            );
        }
    }
    Ok(())
}

/// Print one profile as a TOML document.
pub async fn show(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let registry = switchyard_profiles::from_config(&config)?;
    let profile = registry.lookup(id)?;

    let document = ProfileSet {
        profiles: vec![profile.as_ref().clone()],
    };
    print!("{}", document.to_toml()?);
    Ok(())
}

/// Validate a document on its own, then report identifiers that would
/// collide with the configured registry.
pub async fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let document = ProfileSet::from_path(path)?;
    println!(
        "{}: {} profile(s) valid ({})",
        path.display(),
        document.len(),
        document
            .profiles
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let config = super::load_config()?;
    let registry = switchyard_profiles::from_config(&config)?;
    let snapshot = registry.all();
    for profile in &document.profiles {
        if snapshot.get(&profile.id).is_some() {
            warn!(profile = %profile.id, "Identifier already registered");
            println!("  note: '{}' is already registered and would be rejected", profile.id);
        }
    }
    Ok(())
}
