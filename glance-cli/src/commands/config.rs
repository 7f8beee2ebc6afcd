//! Provider configurations, edited directly in the store.

use anyhow::{anyhow, bail, Result};
use glance_common::{ProviderConfig, ProviderKind};
use glance_store::{keys, StoreExt, WriteOptions};

use crate::app::{App, ORIGIN};
use crate::ConfigCommands;

pub async fn run(app: &App, command: ConfigCommands) -> Result<()> {
    let store = &app.store;
    let (mut configs, version) = store
        .load_or_default::<Vec<ProviderConfig>>(keys::PROVIDER_CONFIGS)
        .await?;
    let active_id = store
        .load::<String>(keys::ACTIVE_PROVIDER_CONFIG_ID)
        .await?
        .map(|(id, _)| id);

    match command {
        ConfigCommands::Add {
            name,
            kind,
            key,
            model,
            endpoint,
            activate,
        } => {
            let kind: ProviderKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            let mut config = ProviderConfig::new(name, kind, key, model);
            if let Some(endpoint) = endpoint {
                config = config.with_endpoint(endpoint);
            }
            if let Err(e) = config.validate() {
                println!("Warning: {}", e);
            }

            let id = config.id.clone();
            configs.push(config);
            store
                .save(
                    keys::PROVIDER_CONFIGS,
                    &configs,
                    WriteOptions::new(ORIGIN).expecting(version),
                )
                .await?;
            if activate || active_id.is_none() {
                store
                    .save(keys::ACTIVE_PROVIDER_CONFIG_ID, &id, WriteOptions::new(ORIGIN))
                    .await?;
            }
            println!("Added {}", id);
        }
        ConfigCommands::Use { id } => {
            if !configs.iter().any(|c| c.id == id) {
                bail!("No configuration with id {}", id);
            }
            store
                .save(keys::ACTIVE_PROVIDER_CONFIG_ID, &id, WriteOptions::new(ORIGIN))
                .await?;
            println!("Active configuration: {}", id);
        }
        ConfigCommands::List => {
            if configs.is_empty() {
                println!("No API configuration found.");
            }
            let active = ProviderConfig::resolve_active(&configs, active_id.as_deref())
                .ok()
                .map(|c| c.id.clone());
            for config in &configs {
                let marker = if active.as_deref() == Some(config.id.as_str()) { "*" } else { " " };
                let status = match config.validate() {
                    Ok(()) => "ok".to_string(),
                    Err(e) => e.to_string(),
                };
                println!(
                    "{} {}  {:<20} {:<7} {:<28} {}",
                    marker,
                    config.id,
                    config.display_name,
                    config.provider_kind.as_str(),
                    config.model_name,
                    status
                );
            }
        }
    }
    Ok(())
}
