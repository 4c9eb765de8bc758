//! The single user preference: the last city that produced a weather update.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use crate::config::{project_dirs, write_toml};

pub trait PreferenceStore: Send + Debug {
    fn last_searched_city(&self) -> Option<String>;

    fn set_last_searched_city(&mut self, city: &str) -> Result<()>;
}

impl PreferenceStore for Box<dyn PreferenceStore> {
    fn last_searched_city(&self) -> Option<String> {
        (**self).last_searched_city()
    }

    fn set_last_searched_city(&mut self, city: &str) -> Result<()> {
        (**self).set_last_searched_city(city)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub last_searched_city: Option<String>,
}

/// Preferences persisted as `state.toml` in the platform data directory.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    prefs: Preferences,
}

impl FilePreferences {
    pub fn open_default() -> Result<Self> {
        Self::open(project_dirs()?.data_dir().join("state.toml"))
    }

    pub fn open(path: PathBuf) -> Result<Self> {
        let prefs = read_prefs(&path)?;
        Ok(Self { path, prefs })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_prefs(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        return Ok(Preferences::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read preferences: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse preferences: {}", path.display()))
}

impl PreferenceStore for FilePreferences {
    fn last_searched_city(&self) -> Option<String> {
        self.prefs.last_searched_city.clone()
    }

    fn set_last_searched_city(&mut self, city: &str) -> Result<()> {
        if self.prefs.last_searched_city.as_deref() == Some(city) {
            return Ok(());
        }
        self.prefs.last_searched_city = Some(city.to_string());
        write_toml(&self.path, &self.prefs)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    last_searched_city: Option<String>,
}

impl MemoryPreferences {
    pub fn with_city(city: &str) -> Self {
        Self { last_searched_city: Some(city.to_string()) }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn last_searched_city(&self) -> Option<String> {
        self.last_searched_city.clone()
    }

    fn set_last_searched_city(&mut self, city: &str) -> Result<()> {
        self.last_searched_city = Some(city.to_string());
        Ok(())
    }
}
