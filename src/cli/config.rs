use crate::config::generate::generate_starter_config;
use crate::config::{system_config_path, user_config_path};
use std::fs;
use std::path::{Path, PathBuf};

/// Print the starter config, or write it to the first writable default location.
pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = default_write_path();
    write_config(&config_content, &config_path)?;
    println!("Config file written to {}", config_path.display());
    Ok(())
}

/// `~/.config/log-groups/config.yml` when its directory can be created,
/// otherwise `/etc/log-groups/config.yml`.
fn default_write_path() -> PathBuf {
    if let Some(user_config) = user_config_path() {
        match user_config.parent().map(fs::create_dir_all) {
            Some(Ok(())) => return user_config,
            Some(Err(e)) => {
                eprintln!("Warning: Could not create directory for {}: {}", user_config.display(), e);
                eprintln!("Falling back to {}", system_config_path().display());
            }
            None => {}
        }
    }
    system_config_path()
}

/// Write `config_content` to `config_path`, refusing to overwrite an existing file.
pub fn write_config(config_content: &str, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() {
        return Err(format!(
            "Config file already exists at {}. Remove it first or use --stdout to print the config",
            config_path.display()
        )
        .into());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(config_path, config_content)?;
    Ok(())
}
