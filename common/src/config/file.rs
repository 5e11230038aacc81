use config::{Config, ConfigError, File};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Process-level settings: where the topology lives, how verbosely to
/// log, and whether to report to Sentry. Distinct from the topology
/// config itself, which `configurator::load_raw_config` loads.
#[derive(Debug, Deserialize, Serialize)]
pub struct HeraldConfig {
    pub topology_file: String,
    pub log_level: String,
    pub sentry_dsn: Option<String>,
}

pub fn load_config() -> Result<HeraldConfig, ConfigError> {
    let config_paths = [
        "/etc/herald/herald.toml",
        "~/.config/herald/herald.toml",
        "herald.toml",
    ];

    // Create config builder and apply default values
    let config_builder = Config::builder()
        .set_default("topology_file", "topology.toml")?
        .set_default("log_level", "info")?
        .set_default("sentry_dsn", None::<String>)?;

    // Add config sources
    let config_builder = config_paths.iter().fold(config_builder, |builder, path| {
        let path = shellexpand::full(path).unwrap().into_owned();
        if Path::new(&path).exists() {
            builder.add_source(File::with_name(&path))
        } else {
            builder
        }
    });

    // Build and deserialize
    config_builder.build()?.try_deserialize()
}

/// Updates the configuration file with the provided config values.
///
/// This function will write to the first available config file path in the following order:
/// 1. herald.toml (current directory)
/// 2. ~/.config/herald/herald.toml
/// 3. /etc/herald/herald.toml (if writable)
pub fn update_config(config: &HeraldConfig) -> Result<(), Box<dyn std::error::Error>> {
    let config_paths = [
        "/etc/herald/herald.toml",
        "~/.config/herald/herald.toml",
        "herald.toml",
    ];

    let toml_string = toml::to_string_pretty(config)?;

    // Try to write to the first available path
    for path in config_paths {
        let expanded_path = shellexpand::full(path).unwrap().into_owned();
        let path_obj = Path::new(&expanded_path);

        if let Some(parent) = path_obj.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    error!("Failed to create directory {}: {}", parent.display(), e);
                    continue;
                }
            }
        }

        match fs::File::create(path_obj) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(toml_string.as_bytes()) {
                    error!("Failed to write to {}: {}", expanded_path, e);
                    continue;
                }

                info!("Configuration updated successfully at {}", expanded_path);
                return Ok(());
            }
            Err(e) => {
                error!("Failed to create file {}: {}", expanded_path, e);
                continue;
            }
        }
    }

    Err("Failed to update configuration: could not write to any config file path".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied_with_no_files_present() {
        // load_config() walks real filesystem paths, so we only exercise
        // the builder's own defaults here rather than the full search.
        let builder = Config::builder()
            .set_default("topology_file", "topology.toml")
            .unwrap()
            .set_default("log_level", "info")
            .unwrap()
            .set_default("sentry_dsn", None::<String>)
            .unwrap();
        let config: HeraldConfig = builder.build().unwrap().try_deserialize().unwrap();
        assert_eq!(config.topology_file, "topology.toml");
        assert_eq!(config.log_level, "info");
        assert!(config.sentry_dsn.is_none());
    }
}
