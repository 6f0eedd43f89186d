//! Version history commands

use std::time::Duration;

use clap::{Args, Subcommand};
use ia_core::EntityRef;
use ia_versions::Version;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct VersionsArgs {
    #[command(subcommand)]
    pub command: VersionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum VersionsCommand {
    /// Versions of one item, oldest first
    History { item_type: String, item_id: String },
    /// Versions whose snapshot contains a substring
    Grep { pattern: String },
    /// Versions created within the last N seconds
    Recent { seconds: u64 },
}

pub async fn execute(args: &VersionsArgs) -> anyhow::Result<()> {
    let ctx = Context::connect(&[]).await?;

    let versions = match &args.command {
        VersionsCommand::History { item_type, item_id } => {
            ctx.ledger
                .history(&EntityRef::new(item_type.clone(), item_id))
                .await?
        }
        VersionsCommand::Grep { pattern } => ctx.ledger.object_has(pattern).await?,
        VersionsCommand::Recent { seconds } => {
            ctx.ledger.in_the_last(Duration::from_secs(*seconds)).await?
        }
    };

    if versions.is_empty() {
        println!("No versions found");
        return Ok(());
    }
    for version in &versions {
        print_version(version);
    }
    Ok(())
}

fn print_version(version: &Version) {
    println!(
        "#{:<6} {} {}#{} by {} at {}",
        version.id.unwrap_or_default(),
        version.event.as_str(),
        version.item_type,
        version.item_id,
        version.actor.as_deref().unwrap_or("-"),
        version.created_at.to_rfc3339(),
    );
    if let Some(changes) = &version.object_changes {
        for line in changes.lines() {
            println!("    {}", line);
        }
    }
}
