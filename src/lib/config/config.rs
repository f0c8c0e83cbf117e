use std::path::{Path, PathBuf};

use reqwest::Url;
use tracing::debug;

use super::types::{
    CONFIG_FILE_NAME, Config, ConfigError, ConfigResult, DEFAULT_MASTER, DEFAULT_PROFILE,
    OPERATOR_API_PATH, Profile, SCHEDULER_API_PATH,
};
use crate::lib::client::types::Endpoint;
use crate::lib::tasks::types::TaskInfo;

impl Default for Profile {
    fn default() -> Self {
        Profile {
            master: DEFAULT_MASTER.to_string(),
            task_info: Some(TaskInfo::default()),
        }
    }
}

impl Profile {
    /// Replaces the master address unless the override is empty.
    pub fn with_master(mut self, master: Option<&str>) -> Self {
        if let Some(master) = master.filter(|m| !m.is_empty()) {
            self.master = master.to_string();
        }
        self
    }

    /// Base task specification for new submissions. Every call hands out a
    /// fresh copy so the profile itself stays read-only.
    pub fn task_info(&self) -> TaskInfo {
        self.task_info.clone().unwrap_or_default()
    }

    pub fn endpoint(&self) -> ConfigResult<Endpoint> {
        self.endpoint_at(OPERATOR_API_PATH)
    }

    pub fn scheduler_endpoint(&self) -> ConfigResult<Endpoint> {
        self.endpoint_at(SCHEDULER_API_PATH)
    }

    fn endpoint_at(&self, path: &str) -> ConfigResult<Endpoint> {
        let mut url = Url::parse(&self.master).map_err(|e| ConfigError::InvalidMaster {
            address: self.master.clone(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(ConfigError::InvalidMaster {
                address: self.master.clone(),
                reason: "missing host".to_string(),
            });
        }
        url.set_path(path);
        Ok(Endpoint::new(url))
    }
}

pub fn default_config_path() -> ConfigResult<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

/// Loads a named profile from the config file, writing a file holding just
/// the default profile when none exists yet.
pub fn load_profile(path: &Path, name: &str) -> ConfigResult<Profile> {
    let shown = path.display().to_string();

    if !path.exists() {
        debug!("config file {} not found, writing defaults", shown);
        let mut config = Config::default();
        let profile = Profile::default();
        config
            .profiles
            .insert(DEFAULT_PROFILE.to_string(), profile.clone());
        let raw = serde_json::to_vec_pretty(&config).map_err(|source| ConfigError::Parse {
            path: shown.clone(),
            source,
        })?;
        std::fs::write(path, raw).map_err(|source| ConfigError::Io {
            path: shown.clone(),
            source,
        })?;
        if name != DEFAULT_PROFILE {
            return Err(ConfigError::UnknownProfile(name.to_string()));
        }
        return Ok(profile);
    }

    let raw = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: shown.clone(),
        source,
    })?;
    let mut config: Config = serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
        path: shown,
        source,
    })?;

    let mut profile = config
        .profiles
        .remove(name)
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;
    if profile.task_info.is_none() {
        profile.task_info = Some(TaskInfo::default());
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_default_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.json");

        let profile = load_profile(&path, DEFAULT_PROFILE).unwrap();
        assert_eq!(profile.master, DEFAULT_MASTER);
        assert!(path.exists());

        let written: Config = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(written.profiles.contains_key(DEFAULT_PROFILE));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.json");
        std::fs::write(&path, r#"{"profiles": {"prod": {"master": "http://m:5050"}}}"#).unwrap();

        let err = load_profile(&path, "staging").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile(name) if name == "staging"));
    }

    #[test]
    fn profile_without_task_info_gets_default_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.json");
        std::fs::write(&path, r#"{"profiles": {"prod": {"master": "http://m:5050"}}}"#).unwrap();

        let profile = load_profile(&path, "prod").unwrap();
        assert_eq!(profile.master, "http://m:5050");
        let task = profile.task_info.unwrap();
        assert_eq!(task.resources.len(), 1);
        assert_eq!(task.resources[0].name, "cpus");
    }

    #[test]
    fn master_override_ignores_empty_value() {
        let profile = Profile::default().with_master(Some(""));
        assert_eq!(profile.master, DEFAULT_MASTER);

        let profile = profile.with_master(Some("http://other:5050"));
        assert_eq!(profile.master, "http://other:5050");
    }

    #[test]
    fn endpoints_use_operator_paths() {
        let profile = Profile::default().with_master(Some("http://master.local:5050"));
        assert_eq!(
            profile.endpoint().unwrap().url().as_str(),
            "http://master.local:5050/api/v1"
        );
        assert_eq!(
            profile.scheduler_endpoint().unwrap().url().as_str(),
            "http://master.local:5050/api/v1/scheduler"
        );
    }

    #[test]
    fn master_without_scheme_is_invalid() {
        let profile = Profile::default().with_master(Some("localhost"));
        assert!(matches!(
            profile.endpoint(),
            Err(ConfigError::InvalidMaster { .. })
        ));
    }
}
