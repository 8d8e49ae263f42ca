use std::fs::File;
use std::io::Write;
use std::path::Path;
use anyhow::{Context, Result};
use reqwest::blocking::Client;

/// Where the loader archive is published.
pub const SYNAPSE_URL: &str = "https://cdn.culabs.eu/synapseinstaller/Synapse.zip";
/// File name the downloaded archive is saved under, in the working directory.
pub const SYNAPSE_ARCHIVE: &str = "Synapse.zip";

/// Fetches a remote file to disk.
pub trait Downloader {
    /// Saves the body at `url` to `dest` and returns the number of bytes
    /// written. `dest` is closed when this returns.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// [`Downloader`] using a blocking `reqwest` client.
///
/// The client is built on first use unless one is supplied.
#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: Option<Client>,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client: Some(client) }
    }

    fn client(&self) -> Result<Client> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => Client::builder()
                .build()
                .context("Failed to set up the HTTP client"),
        }
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self
            .client()?
            .get(url)
            .header("User-Agent", "synapse-installer")
            .send()
            .with_context(|| format!("Failed to download {url}"))?
            .error_for_status()
            .with_context(|| format!("Failed to download {url}"))?;

        let mut file = File::create(dest)
            .with_context(|| format!("Failed to create file {}", dest.display()))?;
        let written = response
            .copy_to(&mut file)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        file.flush()
            .and_then(|_| file.sync_all())
            .with_context(|| format!("Failed to close {} properly", dest.display()))?;
        Ok(written)
    }
}
