//! Connection profile persistence.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

use crate::profile::ConnectionProfile;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ProfileFile {
    #[serde(default)]
    profiles: Vec<ConnectionProfile>,
}

/// Profiles kept in a single YAML file.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: Vec<ConnectionProfile>,
}

impl ProfileStore {
    /// Load profiles from `path`. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.exists() {
            tracing::debug!("No profile file at {:?}, starting empty", path);
            return Ok(Self {
                path,
                profiles: Vec::new(),
            });
        }

        let content = fs::read_to_string(&path).context("Failed to read profiles file")?;
        let file: ProfileFile =
            serde_yaml::from_str(&content).context("Failed to parse profiles file")?;

        Ok(Self {
            path,
            profiles: file.profiles,
        })
    }

    /// Write all profiles back to the file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).context("Failed to create profiles directory")?;
        }

        let file = ProfileFile {
            profiles: self.profiles.clone(),
        };
        let content = serde_yaml::to_string(&file).context("Failed to serialize profiles")?;

        fs::write(&self.path, content).context("Failed to write profiles file")?;

        Ok(())
    }

    /// Whether a profile other than `except` already uses `name`.
    fn name_taken(&self, name: &str, except: Uuid) -> bool {
        self.profiles.iter().any(|p| p.name == name && p.id != except)
    }

    pub fn insert(&mut self, profile: ConnectionProfile) {
        if self.name_taken(&profile.name, profile.id) {
            tracing::warn!("Another connection is already named '{}'", profile.name);
        }
        self.profiles.push(profile);
    }

    /// Replace the stored profile with the same id.
    pub fn update(&mut self, profile: ConnectionProfile) -> Result<()> {
        if self.name_taken(&profile.name, profile.id) {
            tracing::warn!("Another connection is already named '{}'", profile.name);
        }
        let Some(existing) = self.profiles.iter_mut().find(|p| p.id == profile.id) else {
            bail!("Connection '{}' ({}) is not stored", profile.name, profile.id);
        };
        *existing = profile;
        Ok(())
    }

    /// Delete a profile by id
    pub fn delete(&mut self, id: Uuid) -> bool {
        let original_len = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        self.profiles.len() < original_len
    }

    /// Look up a profile by exact name, falling back to its id.
    pub fn find(&self, name_or_id: &str) -> Option<&ConnectionProfile> {
        self.profiles
            .iter()
            .find(|p| p.name == name_or_id)
            .or_else(|| {
                let id = Uuid::parse_str(name_or_id).ok()?;
                self.profiles.iter().find(|p| p.id == id)
            })
    }

    /// Like [`find`](Self::find), with an error listing what is available.
    pub fn get(&self, name_or_id: &str) -> Result<&ConnectionProfile> {
        self.find(name_or_id).with_context(|| {
            let available = self
                .list_sorted()
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("Connection '{name_or_id}' not found. Available: {available}")
        })
    }

    /// All profiles ordered by name.
    pub fn list_sorted(&self) -> Vec<&ConnectionProfile> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        profiles
    }

    /// Record a successful connection on the profile.
    pub fn touch_last_connected(&mut self, id: Uuid) -> bool {
        match self.profiles.iter_mut().find(|p| p.id == id) {
            Some(profile) => {
                profile.last_connected_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn empty_store() -> ProfileStore {
        ProfileStore {
            path: PathBuf::from("unused.yaml"),
            profiles: Vec::new(),
        }
    }

    #[test]
    fn test_list_sorted_by_name() {
        let mut store = empty_store();
        store.insert(ConnectionProfile::new("staging", "staging.local"));
        store.insert(ConnectionProfile::new("atlas", "cluster0.mongodb.net"));
        store.insert(ConnectionProfile::new("local", "localhost"));

        let names: Vec<_> = store.list_sorted().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["atlas", "local", "staging"]);
    }

    #[test]
    fn test_find_by_name_or_id() {
        let mut store = empty_store();
        let profile = ConnectionProfile::new("local", "localhost");
        let id = profile.id;
        store.insert(profile);

        assert!(store.find("local").is_some());
        assert_eq!(store.find(&id.to_string()).map(|p| p.id), Some(id));
        assert!(store.find("nonexistent").is_none());

        let err = store.get("nonexistent").unwrap_err().to_string();
        assert!(err.contains("Available: local"));
    }

    #[test]
    fn test_update_in_place() {
        let mut store = empty_store();
        let mut profile = ConnectionProfile::new("local", "localhost");
        store.insert(profile.clone());

        profile.port = 27018;
        store.update(profile.clone()).unwrap();
        assert_eq!(store.find("local").unwrap().port, 27018);
        assert_eq!(store.len(), 1);

        let stranger = ConnectionProfile::new("other", "elsewhere");
        assert!(store.update(stranger).is_err());
    }

    #[test]
    fn test_name_taken_ignores_own_id() {
        let mut store = empty_store();
        let local = ConnectionProfile::new("local", "localhost");
        let mut staging = ConnectionProfile::new("staging", "staging.local");
        store.insert(local.clone());
        store.insert(staging.clone());

        assert!(!store.name_taken("local", local.id));
        assert!(store.name_taken("local", staging.id));

        // Renaming onto an existing name is allowed, names are unique by convention only
        staging.name = "local".to_string();
        store.update(staging.clone()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.name_taken("local", Uuid::new_v4()));
    }

    #[test]
    fn test_delete() {
        let mut store = empty_store();
        let profile = ConnectionProfile::new("local", "localhost");
        let id = profile.id;
        store.insert(profile);

        assert!(store.delete(id));
        assert!(store.is_empty());
        assert!(!store.delete(id));
    }

    #[test]
    fn test_touch_last_connected() {
        let mut store = empty_store();
        let profile = ConnectionProfile::new("local", "localhost");
        let id = profile.id;
        store.insert(profile);

        assert!(store.find("local").unwrap().last_connected_at.is_none());
        assert!(store.touch_last_connected(id));
        assert!(store.find("local").unwrap().last_connected_at.is_some());
        assert!(!store.touch_last_connected(Uuid::new_v4()));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("profiles.yaml");

        let mut store = ProfileStore::load(&path).unwrap();
        assert!(store.is_empty());

        let mut profile = ConnectionProfile::new("atlas", "cluster0.example.net");
        profile.use_srv = true;
        profile.username = Some("reader".to_string());
        store.insert(profile.clone());
        store.save().unwrap();

        let reloaded = ProfileStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.find("atlas"), Some(&profile));
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profiles.yaml");
        fs::write(
            &path,
            "profiles:\n  - id: 67e55044-10b1-426f-9247-bb680e5fe0c8\n    name: local\n    host: localhost\n    created_at: 2025-04-21T10:00:00Z\n",
        )
        .unwrap();

        let store = ProfileStore::load(&path).unwrap();
        let profile = store.find("local").unwrap();
        assert_eq!(profile.port, 27017);
        assert!(!profile.use_srv);
        assert_eq!(profile.connection_uri(), "mongodb://localhost");
    }
}
