mod catalog;

use crate::client::ApiClient;
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Client for catalog management", long_about = None)]
pub struct Cli {
    /// Catalog server base URL
    #[arg(
        long,
        global = true,
        env = "SHELF_SERVER_URL",
        default_value = "http://localhost:3000"
    )]
    pub server: String,

    /// API key for bearer authentication
    #[arg(long, global = true, env = "SHELF_TOKEN")]
    pub token: Option<String>,

    /// Enable verbose output (debug logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List stored catalogs
    List(catalog::ListArgs),

    /// Upload a catalog to the server
    Upload(catalog::UploadArgs),

    /// Download a catalog
    Download(catalog::DownloadArgs),

    /// Update a catalog
    Update(catalog::UpdateArgs),

    /// Delete a catalog
    Delete(catalog::DeleteArgs),
}

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let client = ApiClient::new(cli.server, cli.token);
    match cli.command {
        Commands::List(args) => catalog::execute_list(&client, args).await,
        Commands::Upload(args) => catalog::execute_upload(&client, args).await,
        Commands::Download(args) => catalog::execute_download(&client, args).await,
        Commands::Update(args) => catalog::execute_update(&client, args).await,
        Commands::Delete(args) => catalog::execute_delete(&client, args).await,
    }
}
