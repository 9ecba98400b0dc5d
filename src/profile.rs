//! Connection profiles and the URI derived from them.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PORT: u16 = 27017;

const REDACTED_PASSWORD: &str = "****";

/// A saved way to reach a MongoDB deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub id: Uuid,
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub auth_database: Option<String>,
    #[serde(default)]
    pub use_srv: bool,
    #[serde(default)]
    pub use_ssl: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_connected_at: Option<DateTime<Utc>>,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Returns the value only when it holds at least one character.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

impl ConnectionProfile {
    /// Create a profile with the default port and both flags off.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            database: None,
            auth_database: None,
            use_srv: false,
            use_ssl: false,
            created_at: Utc::now(),
            last_connected_at: None,
        }
    }

    /// Connection string handed to the driver.
    ///
    /// Credentials are percent-encoded; host, database and auth database are
    /// inserted as typed. The port is elided for SRV profiles and for 27017.
    pub fn connection_uri(&self) -> String {
        self.build_uri(false)
    }

    /// Same as [`connection_uri`](Self::connection_uri) with the password masked.
    pub fn redacted_uri(&self) -> String {
        self.build_uri(true)
    }

    fn build_uri(&self, redact_password: bool) -> String {
        let mut uri = String::from(if self.use_srv { "mongodb+srv://" } else { "mongodb://" });

        if let Some(username) = non_empty(self.username.as_ref()) {
            uri.push_str(&urlencoding::encode(username));
            if let Some(password) = non_empty(self.password.as_ref()) {
                uri.push(':');
                if redact_password {
                    uri.push_str(REDACTED_PASSWORD);
                } else {
                    uri.push_str(&urlencoding::encode(password));
                }
            }
            uri.push('@');
        }

        uri.push_str(&self.host);

        if !self.use_srv && self.port != DEFAULT_PORT {
            uri.push(':');
            uri.push_str(&self.port.to_string());
        }

        if let Some(database) = non_empty(self.database.as_ref()) {
            uri.push('/');
            uri.push_str(database);
        }

        let mut query_params = Vec::new();
        if let Some(auth_database) = non_empty(self.auth_database.as_ref()) {
            query_params.push(format!("authSource={auth_database}"));
        }
        if self.use_ssl {
            query_params.push("ssl=true".to_string());
        }

        if !query_params.is_empty() {
            uri.push('?');
            uri.push_str(&query_params.join("&"));
        }

        uri
    }

    /// Short address for listings: `host (SRV)` or `host:port`.
    pub fn address_label(&self) -> String {
        if self.use_srv {
            format!("{} (SRV)", self.host)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Raw text inputs used to create or edit a profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: String,
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub auth_database: String,
    pub use_srv: bool,
    pub use_ssl: bool,
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl ProfileForm {
    /// Pre-fill a form from an existing profile.
    pub fn from_profile(profile: &ConnectionProfile) -> Self {
        Self {
            name: profile.name.clone(),
            host: profile.host.clone(),
            port: profile.port.to_string(),
            username: profile.username.clone().unwrap_or_default(),
            password: profile.password.clone().unwrap_or_default(),
            database: profile.database.clone().unwrap_or_default(),
            auth_database: profile.auth_database.clone().unwrap_or_default(),
            use_srv: profile.use_srv,
            use_ssl: profile.use_ssl,
        }
    }

    /// Parsed port; anything that is not a valid port number falls back to 27017.
    pub fn port_number(&self) -> u16 {
        self.port.trim().parse().unwrap_or(DEFAULT_PORT)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Connection name cannot be empty");
        }
        if self.host.trim().is_empty() {
            bail!("Host cannot be empty");
        }
        Ok(())
    }

    /// Build a new profile from the form.
    pub fn into_profile(self) -> Result<ConnectionProfile> {
        let mut profile = ConnectionProfile::new(String::new(), String::new());
        self.apply_to(&mut profile)?;
        Ok(profile)
    }

    /// Overwrite the editable fields of `profile`, keeping its identity and timestamps.
    pub fn apply_to(&self, profile: &mut ConnectionProfile) -> Result<()> {
        self.validate()?;

        profile.name = self.name.clone();
        profile.host = self.host.clone();
        profile.port = self.port_number();
        profile.username = optional(&self.username);
        profile.password = optional(&self.password);
        profile.database = optional(&self.database);
        profile.auth_database = optional(&self.auth_database);
        profile.use_srv = self.use_srv;
        profile.use_ssl = self.use_ssl;

        Ok(())
    }
}
