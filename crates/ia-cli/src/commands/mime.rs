//! MIME inspection command

use anyhow::anyhow;
use clap::Args;
use ia_core::Id;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct MimeArgs {
    /// Attachment ID
    pub id: Id,
}

pub async fn execute(args: &MimeArgs) -> anyhow::Result<()> {
    let ctx = Context::connect(&[]).await?;
    let service = ctx.attachments();

    let attachment = service.find(args.id).await?;
    let detected = service
        .mime_type(&attachment)
        .await
        .ok_or_else(|| anyhow!("stored file for attachment {} is not readable", args.id))?;

    println!("{}", detected);
    if detected != ia_attachments::sniffer::essence(&attachment.content_type) {
        println!("(declared as {})", attachment.content_type);
    }
    Ok(())
}
