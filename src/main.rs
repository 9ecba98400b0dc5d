mod cli;
mod config;
mod document;
mod driver;
mod paging;
mod profile;
mod service;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command, ProfileCommand, QueryCommand};
use config::Config;
use document::DocumentSummary;
use driver::MongoDriver;
use paging::{PageInfo, PageRequest};
use profile::{ConnectionProfile, ProfileForm};
use service::ConnectionManager;
use store::ProfileStore;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

/// Profile as shown to the user: no password, URI redacted.
fn profile_view(profile: &ConnectionProfile) -> serde_json::Value {
    serde_json::json!({
        "id": profile.id,
        "name": profile.name,
        "address": profile.address_label(),
        "uri": profile.redacted_uri(),
        "database": profile.database,
        "auth_database": profile.auth_database,
        "use_srv": profile.use_srv,
        "use_ssl": profile.use_ssl,
        "created_at": profile.created_at,
        "last_connected_at": profile.last_connected_at,
    })
}

fn run_profile_command(store: &mut ProfileStore, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Add { name, fields } => {
            let mut form = ProfileForm {
                name,
                ..Default::default()
            };
            fields.apply(&mut form);
            let profile = form.into_profile()?;
            tracing::info!("Adding connection '{}'", profile.name);
            let view = profile_view(&profile);
            store.insert(profile);
            store.save()?;
            print_json(&view)
        }
        ProfileCommand::Edit {
            profile,
            name,
            fields,
            no_srv,
            no_ssl,
        } => {
            let mut updated = store.get(&profile)?.clone();
            let mut form = ProfileForm::from_profile(&updated);
            if let Some(name) = name {
                form.name = name;
            }
            fields.apply(&mut form);
            if no_srv {
                form.use_srv = false;
            }
            if no_ssl {
                form.use_ssl = false;
            }
            form.apply_to(&mut updated)?;

            tracing::info!("Updating connection '{}'", updated.name);
            let view = profile_view(&updated);
            store.update(updated)?;
            store.save()?;
            print_json(&view)
        }
        ProfileCommand::Remove { profile } => {
            let target = store.get(&profile)?;
            let (id, name) = (target.id, target.name.clone());
            store.delete(id);
            store.save()?;
            tracing::info!("Removed connection '{}'", name);
            print_json(&serde_json::json!({ "removed": name, "id": id }))
        }
        ProfileCommand::List => {
            if store.is_empty() {
                tracing::info!("No connections saved yet, add one with `mongodesk profile add`");
            }
            let profiles: Vec<_> = store.list_sorted().into_iter().map(profile_view).collect();
            print_json(&serde_json::json!({
                "connections": profiles,
                "count": profiles.len()
            }))
        }
        ProfileCommand::Show { profile } => print_json(&profile_view(store.get(&profile)?)),
    }
}

async fn run_query_command(
    config: &Config,
    store: &mut ProfileStore,
    manager: &ConnectionManager,
    command: QueryCommand,
) -> Result<()> {
    match command {
        QueryCommand::Connect { profile } => {
            let profile = store.get(&profile)?.clone();
            let outcome = manager.connect(&profile).await?;
            store.touch_last_connected(profile.id);
            store.save()?;
            print_json(&serde_json::json!({
                "connection": profile.name,
                "address": profile.address_label(),
                "session": outcome,
            }))
        }
        QueryCommand::Databases { profile } => {
            let profile = store.get(&profile)?;
            let databases = manager.list_databases(profile).await?;
            print_json(&serde_json::json!({
                "databases": databases,
                "count": databases.len()
            }))
        }
        QueryCommand::Collections { profile, database } => {
            let profile = store.get(&profile)?;
            let collections = manager.list_collections(&database, profile).await?;
            print_json(&serde_json::json!({
                "database": database,
                "collections": collections,
                "count": collections.len()
            }))
        }
        QueryCommand::Count {
            profile,
            database,
            collection,
        } => {
            let profile = store.get(&profile)?;
            let count = manager
                .count_documents(&collection, &database, profile)
                .await?;
            print_json(&serde_json::json!({
                "database": database,
                "collection": collection,
                "count": count
            }))
        }
        QueryCommand::Find {
            profile,
            database,
            collection,
            page,
            page_size,
            full,
        } => {
            let profile = store.get(&profile)?;
            let request = PageRequest::new(page, page_size.unwrap_or(config.page_size).max(1));

            let total = manager
                .count_documents(&collection, &database, profile)
                .await?;
            let documents = manager
                .find_documents(
                    &collection,
                    &database,
                    profile,
                    request.limit(),
                    request.skip(),
                )
                .await?;

            let info = PageInfo::new(request, total);
            let documents = if full {
                serde_json::to_value(&documents).context("Failed to serialize documents")?
            } else {
                let summaries: Vec<_> = documents.iter().map(DocumentSummary::from_document).collect();
                serde_json::to_value(&summaries).context("Failed to serialize documents")?
            };

            print_json(&serde_json::json!({
                "database": database,
                "collection": collection,
                "page": info,
                "label": info.label(),
                "paginated": info.is_paginated(),
                "documents": documents
            }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mongodesk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let profiles_path = config.profiles_path()?;
    let mut store = ProfileStore::load(&profiles_path)?;
    tracing::debug!("Loaded {} profiles from {:?}", store.len(), profiles_path);

    match cli.command {
        Command::Profile(command) => run_profile_command(&mut store, command),
        Command::Query(command) => {
            let manager = ConnectionManager::new(Arc::new(MongoDriver::new(config.app_name.clone())));
            let result = run_query_command(&config, &mut store, &manager, command).await;
            manager.disconnect().await;
            result
        }
    }
}
