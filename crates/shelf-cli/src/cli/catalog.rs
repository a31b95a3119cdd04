use crate::client::ApiClient;
use anyhow::{Context, Result};
use clap::Args;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use shelf::services::{CatalogDescriptor, CatalogType};
use std::io::Write;
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// Catalog type (site, replica, transformation)
    pub catalog_type: String,
}

#[derive(Args)]
pub struct UploadArgs {
    /// Catalog type (site, replica, transformation)
    pub catalog_type: String,

    /// Catalog name
    pub name: String,

    /// Catalog format
    pub format: String,

    /// File to upload
    pub file: PathBuf,
}

#[derive(Args)]
pub struct DownloadArgs {
    /// Catalog type (site, replica, transformation)
    pub catalog_type: String,

    /// Catalog name
    pub name: String,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Catalog type (site, replica, transformation)
    pub catalog_type: String,

    /// Catalog name
    pub name: String,

    /// New catalog format
    #[arg(long)]
    pub format: Option<String>,

    /// New file contents
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Catalog type (site, replica, transformation)
    pub catalog_type: String,

    /// Catalog name
    pub name: String,
}

pub async fn execute_list(client: &ApiClient, args: ListArgs) -> Result<()> {
    let catalog_type: CatalogType = args.catalog_type.parse()?;

    let response = client.get(&format!("/catalogs/{}/", catalog_type)).await?;
    if response.status() != StatusCode::OK {
        anyhow::bail!("{}", ApiClient::error_message(response).await);
    }

    let descriptors: Vec<CatalogDescriptor> = response
        .json()
        .await
        .context("Failed to parse listing response")?;

    if !descriptors.is_empty() {
        println!("{:<20} {:<8} {:<32} {}", "NAME", "FORMAT", "CREATED", "URL");
    }
    for d in descriptors {
        println!(
            "{:<20} {:<8} {:<32} {}",
            d.name,
            d.format.as_str(),
            d.created.to_rfc3339(),
            d.location
        );
    }
    Ok(())
}

pub async fn execute_upload(client: &ApiClient, args: UploadArgs) -> Result<()> {
    let catalog_type: CatalogType = args.catalog_type.parse()?;

    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.name.clone());

    let form = Form::new()
        .text("name", args.name.clone())
        .text("format", args.format)
        .part("file", Part::bytes(data).file_name(filename));

    let response = client
        .post_multipart(&format!("/catalogs/{}/", catalog_type), form)
        .await?;
    if response.status() != StatusCode::CREATED {
        anyhow::bail!("{}", ApiClient::error_message(response).await);
    }

    println!("Uploaded catalog: /catalogs/{}/{}", catalog_type, args.name);
    Ok(())
}

pub async fn execute_download(client: &ApiClient, args: DownloadArgs) -> Result<()> {
    let catalog_type: CatalogType = args.catalog_type.parse()?;

    let response = client
        .get(&format!("/catalogs/{}/{}", catalog_type, args.name))
        .await?;
    if response.status() != StatusCode::OK {
        anyhow::bail!("{}", ApiClient::error_message(response).await);
    }

    let data = response
        .bytes()
        .await
        .context("Failed to read catalog contents")?;
    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &data)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        },
        None => {
            std::io::stdout()
                .write_all(&data)
                .context("Failed to write to stdout")?;
        },
    }
    Ok(())
}

pub async fn execute_update(client: &ApiClient, args: UpdateArgs) -> Result<()> {
    let catalog_type: CatalogType = args.catalog_type.parse()?;

    let mut form = Form::new();
    if let Some(format) = args.format {
        form = form.text("format", format);
    }
    if let Some(path) = args.file {
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.name.clone());
        form = form.part("file", Part::bytes(data).file_name(filename));
    }

    let response = client
        .put_multipart(&format!("/catalogs/{}/{}", catalog_type, args.name), form)
        .await?;
    if response.status() != StatusCode::OK {
        anyhow::bail!("{}", ApiClient::error_message(response).await);
    }

    let descriptor: CatalogDescriptor = response
        .json()
        .await
        .context("Failed to parse update response")?;
    println!("Updated catalog: {}", descriptor.location);
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

pub async fn execute_delete(client: &ApiClient, args: DeleteArgs) -> Result<()> {
    let catalog_type: CatalogType = args.catalog_type.parse()?;

    let response = client
        .delete(&format!("/catalogs/{}/{}", catalog_type, args.name))
        .await?;
    if response.status() != StatusCode::OK {
        anyhow::bail!("{}", ApiClient::error_message(response).await);
    }

    println!("Deleted catalog: {}", args.name);
    Ok(())
}
