use crate::error::{MochiError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.json";

pub const CONFIG_DIR_ENV: &str = "MOCHI_CONFIG_DIR";
pub const API_KEY_ENV: &str = "MOCHI_API_KEY";
pub const API_URL_ENV: &str = "MOCHI_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub api_key: String,
}

/// Named API-key profiles, stored in `config.json` in the config directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MochiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,

    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,

    /// Archive format used by `export` when none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,
}

/// Directory holding `config.json`: `$MOCHI_CONFIG_DIR`, else the platform
/// config directory.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("cards", "mochi", "mochi-cli")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| MochiError::Config("Could not determine config dir".to_string()))
}

impl MochiConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: MochiConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given directory, readable by the owner only.
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        restrict_permissions(&config_path)?;
        Ok(())
    }

    /// Add or replace a profile. The first profile added becomes active.
    pub fn add_profile(&mut self, name: &str, api_key: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(MochiError::Config("Profile name cannot be empty".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(MochiError::Config("API key cannot be empty".to_string()));
        }

        self.profiles.insert(
            name.to_string(),
            Profile {
                api_key: api_key.to_string(),
            },
        );
        if self.active_profile.is_none() {
            self.active_profile = Some(name.to_string());
        }
        Ok(())
    }

    /// Remove a profile. If it was active, another remaining profile takes over.
    pub fn remove_profile(&mut self, name: &str) -> Result<()> {
        if self.profiles.remove(name).is_none() {
            return Err(MochiError::NotFound(format!("profile '{}'", name)));
        }
        if self.active_profile.as_deref() == Some(name) {
            self.active_profile = self.profiles.keys().next().cloned();
        }
        Ok(())
    }

    pub fn use_profile(&mut self, name: &str) -> Result<()> {
        if !self.profiles.contains_key(name) {
            return Err(MochiError::NotFound(format!("profile '{}'", name)));
        }
        self.active_profile = Some(name.to_string());
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Profile names in sorted order.
    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Pick the API key: explicit flag, then `MOCHI_API_KEY`, then the named
    /// profile, then the active profile.
    pub fn resolve_api_key(&self, flag: Option<&str>, profile: Option<&str>) -> Result<String> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        self.resolve_api_key_with(flag, env_key.as_deref(), profile)
    }

    fn resolve_api_key_with(
        &self,
        flag: Option<&str>,
        env_key: Option<&str>,
        profile: Option<&str>,
    ) -> Result<String> {
        if let Some(key) = flag.filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        if let Some(key) = env_key.filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        if let Some(name) = profile {
            return self
                .profile(name)
                .map(|p| p.api_key.clone())
                .ok_or_else(|| MochiError::NotFound(format!("profile '{}'", name)));
        }
        if let Some(p) = self.active_profile.as_deref().and_then(|n| self.profile(n)) {
            return Ok(p.api_key.clone());
        }

        Err(MochiError::Config(format!(
            "no API key found. Use --api-key, set {}, or add a profile with 'mochi config add'",
            API_KEY_ENV
        )))
    }
}

/// Base URL of the service: `$MOCHI_API_URL` if set.
pub fn api_url() -> Option<String> {
    std::env::var(API_URL_ENV).ok().filter(|u| !u.is_empty())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_missing_config() {
        let dir = tempdir().unwrap();
        let config = MochiConfig::load(dir.path()).unwrap();
        assert_eq!(config, MochiConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");

        let mut config = MochiConfig::default();
        config.add_profile("work", "key-1").unwrap();
        config.default_format = Some("json".into());
        config.save(&nested).unwrap();

        let loaded = MochiConfig::load(&nested).unwrap();
        assert_eq!(loaded, config);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        MochiConfig::default().save(dir.path()).unwrap();

        let mode = fs::metadata(dir.path().join(CONFIG_FILENAME))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_first_profile_becomes_active() {
        let mut config = MochiConfig::default();
        config.add_profile("work", "k1").unwrap();
        config.add_profile("home", "k2").unwrap();
        assert_eq!(config.active_profile.as_deref(), Some("work"));
        assert_eq!(config.profile_names(), vec!["home", "work"]);
    }

    #[test]
    fn test_remove_active_profile_falls_back() {
        let mut config = MochiConfig::default();
        config.add_profile("work", "k1").unwrap();
        config.add_profile("home", "k2").unwrap();

        config.remove_profile("work").unwrap();
        assert_eq!(config.active_profile.as_deref(), Some("home"));

        config.remove_profile("home").unwrap();
        assert_eq!(config.active_profile, None);
        assert!(config.remove_profile("home").is_err());
    }

    #[test]
    fn test_use_unknown_profile_fails() {
        let mut config = MochiConfig::default();
        assert!(matches!(
            config.use_profile("ghost"),
            Err(MochiError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_profile_values_rejected() {
        let mut config = MochiConfig::default();
        assert!(config.add_profile("", "k").is_err());
        assert!(config.add_profile("work", " ").is_err());
    }

    #[test]
    fn test_key_resolution_order() {
        let mut config = MochiConfig::default();
        config.add_profile("work", "work-key").unwrap();
        config.add_profile("home", "home-key").unwrap();

        let key = |flag, env, profile| config.resolve_api_key_with(flag, env, profile).unwrap();
        assert_eq!(key(Some("flag-key"), Some("env-key"), Some("home")), "flag-key");
        assert_eq!(key(None, Some("env-key"), Some("home")), "env-key");
        assert_eq!(key(None, None, Some("home")), "home-key");
        assert_eq!(key(None, None, None), "work-key");
        assert_eq!(key(Some(""), None, None), "work-key");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let config = MochiConfig::default();
        let err = config.resolve_api_key_with(None, None, None).unwrap_err();
        assert!(matches!(err, MochiError::Config(_)));
        assert!(err.to_string().contains("--api-key"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut config = MochiConfig::default();
        config.add_profile("work", "k").unwrap();
        config.reset();
        assert_eq!(config, MochiConfig::default());
    }
}
