//! `a3s-imagetools inspect` command — show a manifest from a registry.

use std::io::Write;

use a3s_imagetools_core::ImagetoolsConfig;
use a3s_imagetools_runtime::oci::combine::index_children;
use a3s_imagetools_runtime::{Descriptor, ImageReference, RegistryAccess};
use clap::Args;

#[derive(Args)]
pub struct InspectArgs {
    /// Image reference to inspect
    pub reference: String,

    /// Print the manifest bytes exactly as stored in the registry
    #[arg(long)]
    pub raw: bool,
}

pub async fn execute(
    args: InspectArgs,
    config: ImagetoolsConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let reference = ImageReference::parse(&args.reference)?;
    let session = RegistryAccess::new(config).session()?;
    let (data, descriptor) = session.fetch_manifest(&reference).await?;

    let mut stdout = std::io::stdout();
    if args.raw {
        stdout.write_all(&data)?;
        writeln!(stdout)?;
        return Ok(());
    }

    let output = summarize(&reference.with_default_tag(), &descriptor, &data)?;
    writeln!(stdout, "{}", serde_json::to_string_pretty(&output)?)?;
    Ok(())
}

/// Inspection summary: the manifest descriptor plus, for lists, each entry.
fn summarize(
    reference: &ImageReference,
    descriptor: &Descriptor,
    data: &[u8],
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let mut output = serde_json::json!({
        "Name": reference.to_string(),
        "MediaType": descriptor.media_type,
        "Digest": descriptor.digest,
        "Size": descriptor.size,
    });

    if descriptor.is_index() {
        let manifests: Vec<serde_json::Value> = index_children(data)?
            .iter()
            .map(|child| {
                serde_json::json!({
                    "Name": format!("{}@{}", reference.name(), child.digest),
                    "MediaType": child.media_type,
                    "Platform": child.platform.as_ref().map(|p| p.to_string()),
                })
            })
            .collect();
        output["Manifests"] = serde_json::Value::Array(manifests);
    }
    Ok(output)
}
