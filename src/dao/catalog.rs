//! Person catalog providers: baked-in list, JSON file, or remote JSON endpoint.

use std::{collections::HashSet, path::PathBuf, time::Duration};

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::dao::models::PersonEntity;

const BUILTIN_CATALOG_SIZE: u32 = 25;
const BUILTIN_IMAGE_API: &str = "https://picsum.photos/200/300";
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5_000;

/// Where the person catalog comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CatalogSource {
    /// Catalog shipped with the binary.
    #[default]
    Builtin,
    /// JSON array of persons stored on disk.
    File {
        /// Location of the file.
        path: PathBuf,
    },
    /// JSON array of persons served by a remote endpoint (plain GET, no parameters).
    Http {
        /// Endpoint returning the array.
        url: String,
        /// Request timeout in milliseconds.
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

/// Failures while loading the person catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read catalog file `{path}`")]
    Read {
        /// Catalog file.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The catalog file is not a JSON array of persons.
    #[error("failed to parse catalog file `{path}`")]
    Parse {
        /// Catalog file.
        path: PathBuf,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Building the HTTP client failed.
    #[error("failed to build catalog HTTP client")]
    ClientBuilder {
        /// Client error.
        #[source]
        source: reqwest::Error,
    },
    /// The catalog endpoint could not be reached.
    #[error("failed to fetch catalog from `{url}`")]
    Request {
        /// Catalog endpoint.
        url: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The catalog endpoint answered with an error status.
    #[error("unexpected catalog response status {status} from `{url}`")]
    Status {
        /// Catalog endpoint.
        url: String,
        /// Status returned.
        status: StatusCode,
    },
    /// The catalog endpoint returned something other than a JSON array of persons.
    #[error("failed to decode catalog response from `{url}`")]
    Decode {
        /// Catalog endpoint.
        url: String,
        /// Decoding error.
        #[source]
        source: reqwest::Error,
    },
    /// Two persons share the same identifier.
    #[error("duplicate person id {id} in catalog")]
    DuplicateId {
        /// Repeated id.
        id: u32,
    },
}

/// Fetch the catalog from `source`, in provider order.
pub async fn fetch(source: &CatalogSource) -> Result<Vec<PersonEntity>, CatalogError> {
    let persons = match source {
        CatalogSource::Builtin => builtin_persons(),
        CatalogSource::File { path } => {
            let contents =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CatalogError::Read {
                        path: path.clone(),
                        source,
                    })?;
            serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
                path: path.clone(),
                source,
            })?
        }
        CatalogSource::Http { url, timeout_ms } => fetch_remote(url, *timeout_ms).await?,
    };

    ensure_unique_ids(&persons)?;
    info!(count = persons.len(), source = ?source, "person catalog fetched");
    Ok(persons)
}

async fn fetch_remote(url: &str, timeout_ms: u64) -> Result<Vec<PersonEntity>, CatalogError> {
    let client = Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|source| CatalogError::ClientBuilder { source })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| CatalogError::Request {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(CatalogError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    response
        .json::<Vec<PersonEntity>>()
        .await
        .map_err(|source| CatalogError::Decode {
            url: url.to_string(),
            source,
        })
}

fn ensure_unique_ids(persons: &[PersonEntity]) -> Result<(), CatalogError> {
    let mut seen = HashSet::with_capacity(persons.len());
    for person in persons {
        if !seen.insert(person.id) {
            return Err(CatalogError::DuplicateId { id: person.id });
        }
    }
    Ok(())
}

/// Built-in catalog shipped with the binary.
pub fn builtin_persons() -> Vec<PersonEntity> {
    (1..=BUILTIN_CATALOG_SIZE)
        .map(|id| PersonEntity {
            id,
            name: format!("Person {id}"),
            description: "A famous personality known for great achievements.".into(),
            image: format!("{BUILTIN_IMAGE_API}?random={id}"),
        })
        .collect()
}
