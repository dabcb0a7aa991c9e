use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Downloads `url` to `dest`, creating the file through the runtime.
#[tracing::instrument(skip(runtime, http_client))]
pub async fn download_file(
    runtime: &dyn Runtime,
    url: &str,
    dest: &Path,
    http_client: &HttpClient,
) -> Result<u64> {
    info!("Downloading {}", url);

    let bytes = http_client
        .download(url, || {
            runtime
                .create_file(dest)
                .with_context(|| format!("Failed to create {:?}", dest))
        })
        .await?;

    info!("Downloaded {} bytes to {:?}", bytes, dest);
    Ok(bytes)
}

/// Last path segment of a URL, without query or fragment.
pub fn url_file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    (!name.is_empty()).then_some(name)
}
