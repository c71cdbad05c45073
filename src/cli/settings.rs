//! Settings CLI command.

// CLI commands are allowed to use println! for output
#![allow(clippy::print_stdout)]

use crate::config::StoredSettings;
use crate::config::settings::{DELETE_THRESHOLD, SETTING_KEYS};
use crate::storage::SettingsSource;
use crate::{Error, Result};

/// Prints the stored filter settings.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn cmd_settings_show(source: &SettingsSource, json: bool) -> Result<StoredSettings> {
    let settings = source.load().await?;

    if json {
        let line = serde_json::to_string(&settings.to_record())
            .map_err(|e| Error::operation("serialize_settings", e))?;
        println!("{line}");
        return Ok(settings);
    }

    println!("Filter Settings");
    println!("===============");
    println!();
    println!(
        "{DELETE_THRESHOLD:<24} {} ({})",
        settings.delete_threshold,
        settings.delete_threshold()
    );
    for key in SETTING_KEYS.iter().filter(|k| **k != DELETE_THRESHOLD) {
        if let Some(value) = settings.flag(key) {
            println!("{key:<24} {value}");
        }
    }
    Ok(settings)
}

/// Validates and stores one setting.
///
/// # Errors
///
/// Returns `InvalidInput` for unknown keys or bad values, or a storage error
/// if the write fails.
pub async fn cmd_settings_set(
    source: &SettingsSource,
    key: &str,
    value: &str,
) -> Result<StoredSettings> {
    let settings = source.set(key, value).await?;
    if key == DELETE_THRESHOLD {
        println!("{key} = {} ({})", settings.delete_threshold, settings.delete_threshold());
    } else {
        println!("{key} = {}", settings.flag(key).unwrap_or_default());
    }
    Ok(settings)
}
