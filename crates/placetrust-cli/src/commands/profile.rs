//! Profile command implementation.

use crate::cli::{ProfileAction, ProfileArgs};
use crate::config::{Config, Profile};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;

/// Changes to apply to a profile; absent fields keep their current value.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    /// Places provider base URL
    pub places_url: Option<String>,
    /// Places provider API key
    pub api_key: Option<String>,
    /// Sentiment service endpoint
    pub scorer_url: Option<String>,
    /// SQLite database path
    pub database: Option<String>,
}

/// Execute the profile command, saving changes to `config_path`.
pub fn execute_profile(
    args: ProfileArgs,
    config: &mut Config,
    config_path: &Path,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        ProfileAction::List => list_profiles(config, formatter),
        ProfileAction::Show => show_active_profile(config, formatter),
        ProfileAction::Switch { name } => {
            switch_profile(config, name, formatter)?;
            config.save_to(config_path)
        }
        ProfileAction::Set {
            name,
            places_url,
            api_key,
            scorer_url,
            database,
        } => {
            let update = ProfileUpdate {
                places_url,
                api_key,
                scorer_url,
                database,
            };
            set_profile(config, name, update, formatter)?;
            config.save_to(config_path)
        }
        ProfileAction::Delete { name } => {
            if delete_profile(config, name, formatter)? {
                config.save_to(config_path)?;
            }
            Ok(())
        }
    }
}

fn print_profile(profile: &Profile, indent: &str) {
    println!("{}Places URL: {}", indent, profile.places_url);
    println!(
        "{}API key: {}",
        indent,
        if profile.api_key.is_some() { "set" } else { "not set" }
    );
    println!("{}Scorer URL: {}", indent, profile.scorer_url);
    println!("{}Database: {}", indent, profile.database);
}

/// List all profiles.
fn list_profiles(config: &Config, formatter: &Formatter) -> Result<()> {
    if config.profiles.is_empty() {
        println!("{}", formatter.info("No profiles configured"));
        return Ok(());
    }

    let mut names: Vec<&String> = config.profiles.keys().collect();
    names.sort();

    println!("Available profiles:");
    for name in names {
        let active = name == &config.active_profile;
        println!(
            "{}{}",
            if active { "* " } else { "  " },
            if active { formatter.success(name) } else { name.clone() }
        );
        print_profile(&config.profiles[name], "    ");
    }

    Ok(())
}

/// Show the active profile.
fn show_active_profile(config: &Config, formatter: &Formatter) -> Result<()> {
    let profile = config.get_active_profile()?;

    println!("Active profile: {}", formatter.success(&config.active_profile));
    print_profile(profile, "  ");
    Ok(())
}

/// Switch to a different profile.
fn switch_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<()> {
    config.switch_profile(name.clone())?;
    println!(
        "{}",
        formatter.success(&format!("Switched to profile '{}'", name))
    );
    Ok(())
}

/// Create or update a profile.
fn set_profile(
    config: &mut Config,
    name: String,
    update: ProfileUpdate,
    formatter: &Formatter,
) -> Result<()> {
    let action = if config.profiles.contains_key(&name) {
        "Updated"
    } else {
        "Created"
    };

    let mut profile = config.profiles.get(&name).cloned().unwrap_or_default();
    if let Some(places_url) = update.places_url {
        profile.places_url = places_url;
    }
    if let Some(api_key) = update.api_key {
        profile.api_key = Some(api_key);
    }
    if let Some(scorer_url) = update.scorer_url {
        profile.scorer_url = scorer_url;
    }
    if let Some(database) = update.database {
        profile.database = database;
    }

    config.set_profile(name.clone(), profile);
    println!(
        "{}",
        formatter.success(&format!("{} profile '{}'", action, name))
    );
    Ok(())
}

/// Delete a profile, returning whether one was removed.
fn delete_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<bool> {
    if name == config.active_profile {
        return Err(CliError::ProfileGuard(format!(
            "'{}' is the active profile; switch to another profile before deleting it",
            name
        )));
    }

    if config.profiles.remove(&name).is_some() {
        println!(
            "{}",
            formatter.success(&format!("Deleted profile '{}'", name))
        );
        Ok(true)
    } else {
        println!(
            "{}",
            formatter.warning(&format!("Profile '{}' does not exist", name))
        );
        Ok(false)
    }
}
