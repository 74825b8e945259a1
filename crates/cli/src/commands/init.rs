//! `murmur init` — Write a default configuration file.

use super::CommandResult;
use murmur_config::AppConfig;
use std::path::Path;

pub fn run(force: bool) -> CommandResult {
    let home = AppConfig::home_dir();
    let config_path = AppConfig::config_path();

    println!("Murmur setup");
    println!("============\n");

    if write_default_config(&home, &config_path, force)? {
        println!("Created config.toml at: {}", config_path.display());
        println!("\nNext steps:");
        println!("  1. Start Ollama and pull a model: ollama pull llama3.2");
        println!("     (or set provider = \"local\" in {} for a `--features local` build)", config_path.display());
        println!("  2. Run: murmur chat");
        println!("  3. Or:  murmur serve, then open the printed address");
    } else {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or re-run with --force.");
    }

    Ok(())
}

/// Write the default config unless one exists. Returns whether it wrote.
fn write_default_config(home: &Path, config_path: &Path, force: bool) -> std::io::Result<bool> {
    if config_path.exists() && !force {
        return Ok(false);
    }
    std::fs::create_dir_all(home)?;
    std::fs::write(config_path, AppConfig::default_toml())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_config_once() {
        let tmp = tempfile::tempdir().unwrap();
        let home = tmp.path().join(".murmur");
        let path = home.join("config.toml");

        assert!(write_default_config(&home, &path, false).unwrap());
        std::fs::write(&path, "[model]\nprovider = \"llamacpp\"\n").unwrap();
        assert!(!write_default_config(&home, &path, false).unwrap());
        assert_eq!(
            AppConfig::load_from(&path).unwrap().model.provider,
            "llamacpp"
        );

        assert!(write_default_config(&home, &path, true).unwrap());
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model.provider, "ollama");
        assert_eq!(config.session.window_size, 20);
    }
}
