//! File attach command

use std::path::PathBuf;

use anyhow::{anyhow, Context as _};
use bytes::Bytes;
use clap::Args;
use ia_attachments::AttachParams;
use ia_core::validation::parse_timestamp;
use ia_core::EntityRef;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct AttachArgs {
    /// Owner type, e.g. `Billing::Invoice`
    pub owner_type: String,

    /// Owner ID
    pub owner_id: String,

    /// Path to the file to attach
    pub path: PathBuf,

    /// Declared content type; guessed from the file name when omitted
    #[arg(long)]
    pub content_type: Option<String>,

    /// Client-side modification time (RFC 3339)
    #[arg(long)]
    pub modified_at: Option<String>,
}

pub async fn execute(args: &AttachArgs) -> anyhow::Result<()> {
    let file_name = args
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("not a file path: {}", args.path.display()))?
        .to_string();

    let data = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("failed to read {}", args.path.display()))?;

    let content_type = args.content_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });

    let owner = EntityRef::new(args.owner_type.clone(), &args.owner_id);
    let mut params = AttachParams::new(file_name, content_type)
        .file_size(data.len() as i64)
        .owner(&owner);
    if let Some(raw) = &args.modified_at {
        let at = parse_timestamp(raw).ok_or_else(|| anyhow!("invalid timestamp: {}", raw))?;
        params = params.modified_at(at);
    }

    let ctx = Context::connect(&[args.owner_type.as_str()]).await?;
    let service = ctx.attachments();
    let attachment = service.attach(params, Bytes::from(data)).await?;

    println!("Attachment {} created", attachment.id.unwrap_or_default());
    println!("  file:     {} ({})", attachment.file_name, attachment.human_filesize());
    println!(
        "  type:     {}",
        service.mime_type(&attachment).await.unwrap_or_else(|| "unknown".to_string())
    );
    if let Some(url) = service.url(&attachment) {
        println!("  url:      {}", url);
    }
    println!("  revision: {}", service.revision_number(&attachment).await?);
    Ok(())
}
