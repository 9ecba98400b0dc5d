//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::profile::ProfileForm;

/// Browse MongoDB databases, collections and documents through saved connection profiles.
#[derive(Parser)]
#[command(name = "mongodesk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Browse MongoDB deployments through saved connection profiles", long_about = None)]
pub struct Cli {
    /// Use this configuration file instead of the default one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage saved connection profiles
    #[command(subcommand)]
    Profile(ProfileCommand),

    #[command(flatten)]
    Query(QueryCommand),
}

/// Commands that talk to a server through a saved profile.
#[derive(Subcommand)]
pub enum QueryCommand {
    /// Open a session and check that the server answers
    Connect { profile: String },

    /// List database names
    Databases { profile: String },

    /// List collection names of a database
    Collections { profile: String, database: String },

    /// Count documents in a collection
    Count {
        profile: String,
        database: String,
        collection: String,
    },

    /// Show one page of documents
    Find {
        profile: String,
        database: String,
        collection: String,
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: u64,
        /// Documents per page (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<u64>,
        /// Print whole documents instead of one-line summaries
        #[arg(long)]
        full: bool,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Save a new profile
    Add {
        name: String,
        #[command(flatten)]
        fields: ProfileFields,
    },

    /// Change fields of a saved profile
    Edit {
        /// Name or id of the profile
        profile: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ProfileFields,
        /// Turn off SRV mode
        #[arg(long, conflicts_with = "srv")]
        no_srv: bool,
        /// Turn off SSL
        #[arg(long, conflicts_with = "ssl")]
        no_ssl: bool,
    },

    /// Delete a profile
    Remove { profile: String },

    /// List profiles sorted by name
    List,

    /// Show one profile and its connection URI (password masked)
    Show { profile: String },
}

/// Form fields shared by `add` and `edit`. Empty strings clear optional fields.
#[derive(Args, Debug, Default)]
pub struct ProfileFields {
    #[arg(long)]
    pub host: Option<String>,
    /// Port number; ignored in SRV mode
    #[arg(long)]
    pub port: Option<String>,
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    /// Default database
    #[arg(long)]
    pub database: Option<String>,
    /// Database holding the user's credentials (authSource)
    #[arg(long)]
    pub auth_database: Option<String>,
    /// Resolve the deployment through DNS SRV records
    #[arg(long)]
    pub srv: bool,
    #[arg(long)]
    pub ssl: bool,
}

impl ProfileFields {
    /// Overlay the given fields on a form; absent flags leave the form untouched.
    pub fn apply(self, form: &mut ProfileForm) {
        if let Some(host) = self.host {
            form.host = host;
        }
        if let Some(port) = self.port {
            form.port = port;
        }
        if let Some(username) = self.username {
            form.username = username;
        }
        if let Some(password) = self.password {
            form.password = password;
        }
        if let Some(database) = self.database {
            form.database = database;
        }
        if let Some(auth_database) = self.auth_database {
            form.auth_database = auth_database;
        }
        if self.srv {
            form.use_srv = true;
        }
        if self.ssl {
            form.use_ssl = true;
        }
    }
}
