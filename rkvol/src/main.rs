//! rkvol — serve configured remotes as host volumes.

mod cli;
mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cli::{Cli, Command, StoreArgs, StoreKind};
use libvolume::mount::CommandMountEngine;
use libvolume::store::{FileRemoteStore, MemoryRemoteStore};
use libvolume::transport::PluginServer;
use libvolume::{Driver, DriverConfig, RemoteStore, VolumePlugin};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match cli.command {
        Command::Serve(args) => {
            let config = args.to_config();
            match args.store.store {
                StoreKind::File => serve(&config, FileRemoteStore::new(&config.store_path)).await,
                StoreKind::Memory => serve(&config, MemoryRemoteStore::new()).await,
            }
        }
        Command::List(args) => list(&args).await,
    }
}

fn build_driver<S: RemoteStore>(config: &DriverConfig, store: S) -> Driver<S, CommandMountEngine> {
    let engine = CommandMountEngine::new(config.mount_command.clone());
    Driver::new(&config.base_dir, store, engine).with_mount_defaults(config.mount.clone())
}

async fn serve<S: RemoteStore + 'static>(config: &DriverConfig, store: S) -> Result<()> {
    info!(
        base_dir = %config.base_dir.display(),
        store = %config.store_path.display(),
        mount_program = %config.mount_command.program,
        "starting volume plugin",
    );

    tokio::fs::create_dir_all(&config.base_dir)
        .await
        .with_context(|| format!("failed to create base directory {}", config.base_dir.display()))?;

    let driver = Arc::new(build_driver(config, store));
    let server = PluginServer::bind(config.socket_path(), config.gid, driver)
        .context("failed to bind plugin socket")?;

    server
        .serve_until(shutdown_signal())
        .await
        .context("plugin server failed")
}

async fn list(args: &StoreArgs) -> Result<()> {
    let config = args.to_config();
    let volumes = match args.store {
        StoreKind::File => {
            build_driver(&config, FileRemoteStore::new(&config.store_path))
                .list()
                .await
        }
        StoreKind::Memory => build_driver(&config, MemoryRemoteStore::new()).list().await,
    }
    .context("failed to list volumes")?;

    for volume in volumes {
        println!("{}\t{}", volume.name, volume.mountpoint.display());
    }
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
