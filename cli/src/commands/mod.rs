//! CLI command definitions and dispatch.

mod create;
mod inspect;
mod login;
mod logout;

use std::path::PathBuf;

use a3s_imagetools_core::ImagetoolsConfig;
use a3s_imagetools_runtime::CredentialStore;
use clap::{Parser, Subcommand};

/// A3S Imagetools — assemble multi-platform manifest lists in a registry.
#[derive(Parser)]
#[command(name = "a3s-imagetools", version, about)]
pub struct Cli {
    /// Config file (default: ~/.a3s/imagetools.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Registry reachable over plain HTTP (repeatable)
    #[arg(long = "insecure-registry", global = true, value_name = "HOST")]
    pub insecure_registries: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Create a new manifest list based on source images
    Create(create::CreateArgs),
    /// Show the manifest behind a reference
    Inspect(inspect::InspectArgs),
    /// Store registry credentials
    Login(login::LoginArgs),
    /// Remove stored registry credentials
    Logout(logout::LogoutArgs),
}

impl Cli {
    /// Load the config file, then apply env and command line overrides.
    pub fn load_config(&self) -> Result<ImagetoolsConfig, Box<dyn std::error::Error>> {
        let mut config = ImagetoolsConfig::resolve(self.config.as_deref())?;
        config.add_insecure_registries(&self.insecure_registries);
        Ok(config)
    }
}

/// Open the credential store selected by `config`.
pub(crate) fn credential_store(
    config: &ImagetoolsConfig,
) -> Result<CredentialStore, Box<dyn std::error::Error>> {
    let store = match config.credentials_path {
        Some(ref path) => CredentialStore::new(path.clone()),
        None => CredentialStore::default_path()?,
    };
    Ok(store)
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(
    cli: Cli,
    config: ImagetoolsConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Create(args) => create::execute(args, config).await,
        Command::Inspect(args) => inspect::execute(args, config).await,
        Command::Login(args) => login::execute(args, config).await,
        Command::Logout(args) => logout::execute(args, config).await,
    }
}
