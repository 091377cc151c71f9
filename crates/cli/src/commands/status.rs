//! `switchyard status`: Show configuration and registry status.

use switchyard_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    println!("Switchyard Status");
    println!("=================");
    println!("  Config dir:      {}", AppConfig::config_dir().display());
    println!(
        "  Profiles dir:    {}",
        config.profiles.dir.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Builtin catalog: {}",
        if config.profiles.builtin { "enabled" } else { "disabled" }
    );
    println!("  Extra documents: {}", config.profiles.files.len());
    println!("  Min confidence:  {}", config.classifier.min_confidence);
    println!("  Tie threshold:   {}", config.classifier.tie_threshold);
    println!("  Policy:          {}", config.resolver.policy);
    println!("  Gateway:         {}:{}", config.gateway.host, config.gateway.port);

    match switchyard_profiles::from_config(&config) {
        Ok(registry) => {
            let snapshot = registry.all();
            println!("\n  Profiles loaded: {} ({})", snapshot.len(), snapshot.ids().join(", "));
        }
        Err(e) => println!("\n  Registry failed to load: {e}"),
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  Config file found");
    } else {
        println!("  No config file, run `switchyard onboard` first");
    }

    Ok(())
}
