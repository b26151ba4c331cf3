use crate::commands::{build_flow, load_config, print_notifications};
use clap::Args;
use common::error::StudioError;
use common::types::{ConnectionForm, ConnectionId, ConnectionPatch, Locality};
use orchestrator::{SaveOutcome, TestOutcome};
use std::path::PathBuf;
use tokio::runtime::Runtime;

#[derive(Debug, Args)]
pub struct TestArgs {
    /// Connector kind id from the catalog
    pub kind: String,

    /// Where the liveness check runs (cloud | local)
    #[arg(long, default_value = "cloud")]
    pub locality: String,

    /// Reachable URL of the local agent (local locality only)
    #[arg(long, default_value = "")]
    pub url: String,

    /// Bearer token for the local agent (local locality only)
    #[arg(long, default_value = "")]
    pub token: String,
}

#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Connector kind id from the catalog
    pub kind: String,

    /// Display name; defaults to the kind id
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, default_value = "")]
    pub host: String,
    #[arg(long, default_value = "")]
    pub port: String,
    #[arg(long, default_value = "")]
    pub username: String,
    #[arg(long, default_value = "")]
    pub password: String,
    #[arg(long, default_value = "")]
    pub database: String,

    /// Where the liveness check runs (cloud | local)
    #[arg(long, default_value = "cloud")]
    pub locality: String,
    #[arg(long, default_value = "")]
    pub url: String,
    #[arg(long, default_value = "")]
    pub token: String,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Identifier of the saved connection
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<String>,
    #[arg(long)]
    pub username: Option<String>,
    /// New password; omit to keep the stored secret
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub database: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Identifier of the saved connection
    pub id: String,

    /// Confirm the deletion; nothing is sent without it
    #[arg(long)]
    pub yes: bool,
}

pub fn handle_connections(config_path: Option<PathBuf>) -> Result<(), StudioError> {
    let config = load_config(config_path)?;
    let rt = Runtime::new().map_err(StudioError::startup)?;
    rt.block_on(async {
        let flow = build_flow(&config)?;
        let orch = flow.orchestrator();
        orch.refresh_connections()
            .await
            .map_err(StudioError::request)?;

        for entry in orch.store().list() {
            let record = &entry.record;
            let state = if entry.status.in_use() {
                "in use"
            } else {
                "available"
            };
            println!(
                "{:<24} {:<10} {:<20} {}:{} {}",
                record.connector_id.as_str(),
                record.kind,
                record.name,
                record.host,
                record.port,
                state
            );
        }
        Ok(())
    })
}

pub fn handle_test(args: TestArgs, config_path: Option<PathBuf>) -> Result<(), StudioError> {
    let config = load_config(config_path)?;
    let locality: Locality = args.locality.parse().map_err(StudioError::startup_msg)?;
    let rt = Runtime::new().map_err(StudioError::startup)?;
    rt.block_on(async {
        let flow = build_flow(&config)?;
        let orch = flow.orchestrator();
        orch.select_source(&args.kind)
            .map_err(StudioError::workflow)?;
        orch.set_locality(locality).map_err(StudioError::workflow)?;
        orch.set_form(ConnectionForm {
            url: args.url.clone(),
            token: args.token.clone(),
            ..Default::default()
        })
        .map_err(StudioError::workflow)?;

        let outcome = orch.test_connection().await.map_err(StudioError::workflow)?;
        print_notifications(&flow);
        if outcome == TestOutcome::Failed {
            std::process::exit(1);
        }
        Ok(())
    })
}

pub fn handle_save(args: SaveArgs, config_path: Option<PathBuf>) -> Result<(), StudioError> {
    let config = load_config(config_path)?;
    let locality: Locality = args.locality.parse().map_err(StudioError::startup_msg)?;
    let rt = Runtime::new().map_err(StudioError::startup)?;
    rt.block_on(async {
        let flow = build_flow(&config)?;
        let orch = flow.orchestrator();
        // The mirror backs duplicate prevention, so pull it first.
        orch.refresh_connections()
            .await
            .map_err(StudioError::request)?;

        orch.select_source(&args.kind)
            .map_err(StudioError::workflow)?;
        orch.set_locality(locality).map_err(StudioError::workflow)?;
        orch.set_form(ConnectionForm {
            name: args.name.clone().unwrap_or_default(),
            host: args.host.clone(),
            port: args.port.clone(),
            username: args.username.clone(),
            password: args.password.clone(),
            database: args.database.clone(),
            url: args.url.clone(),
            token: args.token.clone(),
        })
        .map_err(StudioError::workflow)?;

        let tested = orch.test_connection().await.map_err(StudioError::workflow)?;
        if tested == TestOutcome::Failed {
            print_notifications(&flow);
            std::process::exit(1);
        }

        let outcome = orch.save_connection().await.map_err(StudioError::workflow)?;
        print_notifications(&flow);
        if let SaveOutcome::Saved(record) = outcome {
            let json = serde_json::to_string_pretty(&record).map_err(StudioError::workflow)?;
            println!("{json}");
        }
        Ok(())
    })
}

pub fn handle_update(args: UpdateArgs, config_path: Option<PathBuf>) -> Result<(), StudioError> {
    let config = load_config(config_path)?;
    let rt = Runtime::new().map_err(StudioError::startup)?;
    rt.block_on(async {
        let flow = build_flow(&config)?;
        let orch = flow.orchestrator();
        orch.refresh_connections()
            .await
            .map_err(StudioError::request)?;

        let patch = ConnectionPatch {
            name: args.name.clone(),
            host: args.host.clone(),
            port: args.port.clone(),
            username: args.username.clone(),
            // Blank means "keep the stored secret", not "clear it".
            password: args.password.clone().filter(|p| !p.is_empty()),
            database: args.database.clone(),
        };

        let id = ConnectionId::from(args.id.as_str());
        orch.update_existing(&id, &patch)
            .await
            .map_err(StudioError::workflow)?;
        print_notifications(&flow);
        Ok(())
    })
}

pub fn handle_delete(args: DeleteArgs, config_path: Option<PathBuf>) -> Result<(), StudioError> {
    if !args.yes {
        println!("refusing to delete '{}' without --yes", args.id);
        return Ok(());
    }

    let config = load_config(config_path)?;
    let rt = Runtime::new().map_err(StudioError::startup)?;
    rt.block_on(async {
        let flow = build_flow(&config)?;
        let orch = flow.orchestrator();
        orch.refresh_connections()
            .await
            .map_err(StudioError::request)?;

        let id = ConnectionId::from(args.id.as_str());
        orch.request_delete(&id).map_err(StudioError::workflow)?;
        orch.confirm_delete().await.map_err(StudioError::workflow)?;
        print_notifications(&flow);
        Ok(())
    })
}
