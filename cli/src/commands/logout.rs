//! `a3s-imagetools logout` command — Remove stored registry credentials.

use a3s_imagetools_core::ImagetoolsConfig;
use clap::Args;

#[derive(Args)]
pub struct LogoutArgs {
    /// Registry server (default: docker.io)
    pub server: Option<String>,
}

pub async fn execute(
    args: LogoutArgs,
    config: ImagetoolsConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let server = args.server.unwrap_or_else(|| "docker.io".to_string());

    let store = super::credential_store(&config)?;
    let removed = store.remove(&server)?;

    if removed {
        println!("Removing login credentials for {}", server);
    } else {
        println!("Not logged in to {}", server);
    }

    Ok(())
}
