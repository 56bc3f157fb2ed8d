use crate::commands::{CmdMessage, CmdResult, ProfileEntry};
use crate::config::MochiConfig;
use crate::error::Result;
use std::path::Path;

#[derive(Debug, Clone)]
pub enum ConfigAction {
    Add { name: String, api_key: String },
    Remove(String),
    Use(String),
    List,
    Reset,
}

pub fn run(config_dir: &Path, action: ConfigAction) -> Result<CmdResult> {
    let mut config = MochiConfig::load(config_dir)?;
    let mut result = CmdResult::default();

    match action {
        ConfigAction::Add { name, api_key } => {
            config.add_profile(&name, &api_key)?;
            config.save(config_dir)?;
            result.add_message(CmdMessage::success(format!("Profile '{}' saved", name)));
        }
        ConfigAction::Remove(name) => {
            config.remove_profile(&name)?;
            config.save(config_dir)?;
            result.add_message(CmdMessage::success(format!("Profile '{}' removed", name)));
        }
        ConfigAction::Use(name) => {
            config.use_profile(&name)?;
            config.save(config_dir)?;
            result.add_message(CmdMessage::success(format!(
                "Now using profile '{}'",
                name
            )));
        }
        ConfigAction::List => {
            if config.profiles.is_empty() {
                result.add_message(CmdMessage::info("No profiles configured."));
            }
        }
        ConfigAction::Reset => {
            config.reset();
            config.save(config_dir)?;
            result.add_message(CmdMessage::success("Configuration reset"));
        }
    }

    let profiles = config
        .profile_names()
        .into_iter()
        .map(|name| ProfileEntry {
            active: config.active_profile.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();
    Ok(result.with_profiles(profiles))
}
