//! `kangae config` — Print the configuration.

use kangae_config::AppConfig;

/// Print the effective configuration: file, then environment overrides.
pub fn show(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("# {}", config_path.display());
    println!("{}", config.to_toml()?);
    Ok(())
}

/// Print the built-in defaults, ready to save as `config.toml`.
pub fn show_default() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::default_toml());
    Ok(())
}
