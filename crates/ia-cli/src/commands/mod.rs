//! CLI command definitions and dispatch.

pub mod attach;
pub mod mime;
pub mod schema;
pub mod versions;

use clap::{Parser, Subcommand};

/// Attach files to records, inspect their types and browse version history
#[derive(Debug, Parser)]
#[command(name = "ia-cli", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the attachments and versions tables
    Schema,
    /// Store a file as an attachment of an owner record
    Attach(attach::AttachArgs),
    /// Print the detected MIME type of a stored attachment
    Mime(mime::MimeArgs),
    /// Version history queries
    Versions(versions::VersionsArgs),
}

impl Cli {
    pub async fn execute(&self) -> anyhow::Result<()> {
        match &self.command {
            Commands::Schema => schema::execute().await,
            Commands::Attach(args) => attach::execute(args).await,
            Commands::Mime(args) => mime::execute(args).await,
            Commands::Versions(args) => versions::execute(args).await,
        }
    }
}
