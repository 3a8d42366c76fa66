use async_trait::async_trait;
use housing_core::{Entity, EntityKind};
use thiserror::Error;
use tracing::debug;

use crate::config::RemoteConfig;

/// Why a collection could not be fetched. Callers must treat any of these
/// as "remote state unknown", never as "remote is empty".
#[derive(Debug, Error)]
pub enum FetchError {
	#[error("request to {url} failed: {reason}")]
	Transport { url: String, reason: String },

	#[error("{url} answered HTTP {status}")]
	Status { url: String, status: u16 },

	#[error("could not decode response from {url}: {reason}")]
	Decode { url: String, reason: String },
}

/// Source of the full current collection of an entity kind.
#[async_trait]
pub trait RemoteSource: Send + Sync + 'static {
	async fn fetch<T: Entity>(&self) -> Result<Vec<T>, FetchError>;
}

/// Fetches `GET {base}/api/{model}` and decodes a JSON array.
#[derive(Clone)]
pub struct HttpSource {
	http: reqwest::Client,
	base: String,
}

impl HttpSource {
	pub fn new(config: &RemoteConfig) -> Result<Self, FetchError> {
		let base = config.base();
		let http = reqwest::Client::builder()
			.timeout(config.timeout())
			.build()
			.map_err(|e| FetchError::Transport { url: base.clone(), reason: e.to_string() })?;

		Ok(Self { http, base })
	}

	pub fn endpoint(&self, kind: EntityKind) -> String {
		format!("{}/api/{}", self.base, kind.model())
	}
}

#[async_trait]
impl RemoteSource for HttpSource {
	async fn fetch<T: Entity>(&self) -> Result<Vec<T>, FetchError> {
		let url = self.endpoint(T::KIND);

		let response = self
			.http
			.get(&url)
			.send()
			.await
			.map_err(|e| FetchError::Transport { url: url.clone(), reason: e.to_string() })?;

		if !response.status().is_success() {
			return Err(FetchError::Status { url, status: response.status().as_u16() });
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| FetchError::Transport { url: url.clone(), reason: e.to_string() })?;

		let rows: Vec<T> = serde_json::from_slice(&body)
			.map_err(|e| FetchError::Decode { url: url.clone(), reason: e.to_string() })?;

		debug!(kind = %T::KIND, count = rows.len(), "fetched remote collection");
		Ok(rows)
	}
}
