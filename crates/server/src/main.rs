//! routerag Server - HTTP API for retrieval-augmented chat over PDF and GPX
//! uploads.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;

    server::start_server(config).await?;

    Ok(())
}
