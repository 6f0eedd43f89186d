//! Schema creation

use ia_db::{ensure_schema, Database, DatabaseConfig};

pub async fn execute() -> anyhow::Result<()> {
    let db = Database::connect(&DatabaseConfig::from_env()).await?;
    ensure_schema(db.pool()).await?;
    db.close().await;

    println!("Schema is up to date");
    Ok(())
}
