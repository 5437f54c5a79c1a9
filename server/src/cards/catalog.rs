use std::path::Path;

use bytes::Buf;
use serde::de::DeserializeOwned;

use super::Card;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to fetch card list: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to read card list: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode card list: {0}")]
    Decode(#[from] serde_json::Error),
}

async fn get_bytes(uri: &str) -> Result<bytes::Bytes, CatalogError> {
    Ok(reqwest::get(uri).await?.error_for_status()?.bytes().await?)
}

fn decode_json<T: DeserializeOwned>(bytes: bytes::Bytes) -> Result<T, CatalogError> {
    Ok(serde_json::de::from_reader(bytes.reader())?)
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Load the card list from either a local JSON file or an http(s) URL. The
/// list is read once and is never partially used: any failure is returned.
pub async fn load_cards(source: &str) -> Result<Vec<Card>, CatalogError> {
    let raw = if is_remote(source) {
        tracing::debug!("Fetching card list from {source}.");
        get_bytes(source).await?
    } else {
        tracing::debug!("Reading card list from {}.", Path::new(source).display());
        bytes::Bytes::from(tokio::fs::read(source).await?)
    };

    tracing::debug!("Read {} bytes of card data. Parsing JSON.", raw.len());
    decode_json(raw)
}
