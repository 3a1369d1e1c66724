//! Local student profile.
//!
//! Stored next to the config as `profile.json`. A missing file yields the
//! default profile so first runs never fail.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub bio: String,
    pub major: String,
    pub year: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "UCSB Student".to_string(),
            email: "student@ucsb.edu".to_string(),
            bio: String::new(),
            major: String::new(),
            year: String::new(),
        }
    }
}

/// Field names accepted by [`UserProfile::set_field`]
pub const PROFILE_FIELDS: [&str; 5] = ["name", "email", "bio", "major", "year"];

impl UserProfile {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::profile_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::profile_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "saved profile");
        Ok(())
    }

    /// Updates one field by name. Returns false for an unknown field.
    pub fn set_field(&mut self, field: &str, value: impl Into<String>) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "email" => &mut self.email,
            "bio" => &mut self.bio,
            "major" => &mut self.major,
            "year" => &mut self.year,
            _ => return false,
        };
        *slot = value.into();
        true
    }

    /// `(label, value)` pairs in display order
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("Name", self.name.as_str()),
            ("Email", self.email.as_str()),
            ("Major", self.major.as_str()),
            ("Year", self.year.as_str()),
            ("Bio", self.bio.as_str()),
        ]
    }

    fn profile_path() -> Result<PathBuf> {
        Ok(Config::config_dir()?.join("profile.json"))
    }
}
