//! `switchyard onboard`: First-time setup.

use switchyard_config::AppConfig;

const SAMPLE_PROFILE: &str = r#"# Example profile document. Rename to mobile.toml to load it.
id = "mobile"
description = "Native mobile clients"
tags = ["mobile", "ios", "android", "app", "offline"]

[[rankings]]
category = "platform"
options = [
    { name = "react native", rationale = "shares the web component model" },
    { name = "swift", rationale = "first-class iOS tooling" },
]

[[template]]
name = "Overview"

[[template]]
name = "Platform"
category = "platform"

[contract]
provides = ["client release plan"]
requires = ["API contract"]
"#;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let profiles_dir = AppConfig::profiles_dir();

    println!("Switchyard: First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !profiles_dir.exists() {
        std::fs::create_dir_all(&profiles_dir)?;
        println!("Created profiles directory: {}", profiles_dir.display());
    }

    let sample_path = profiles_dir.join("mobile.toml.example");
    if !sample_path.exists() {
        std::fs::write(&sample_path, SAMPLE_PROFILE)?;
        println!("Created example profile: {}", sample_path.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        let mut config = AppConfig::default();
        config.profiles.dir = Some(profiles_dir.display().to_string());
        let text = toml::to_string_pretty(&config)?;
        std::fs::write(&config_path, text)?;
        println!("Created config.toml at: {}", config_path.display());
    }

    println!("\nNext steps:");
    println!("   1. Add profile documents to {}", profiles_dir.display());
    println!("   2. Run: switchyard profiles list");
    println!("   3. Run: switchyard route \"design the user table and API\"\n");

    Ok(())
}
