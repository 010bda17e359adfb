pub mod answer;
pub mod index;
pub mod quota;
pub mod search;

use std::{future::Future, pin::Pin, sync::Arc};

pub use answer::{AnswerRequest, AnswerResult};
use dowser_config::{Config, EmbeddingProviderConfig, GenerationProviderConfig};
use dowser_providers::{embedding, generation};
use dowser_storage::db::Db;
pub use index::{
	EntitySource, ReindexReport, ReindexRequest, RemoveRequest, RemoveResponse, UpsertRequest,
	UpsertResponse,
};
pub use quota::QuotaKind;
pub use search::{DegradedReason, SearchItem, SearchRequest, SearchResponse};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		system: &'a str,
		user: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
	RateLimited { message: String },
	Upstream { message: String },
	Storage(dowser_storage::Error),
	Provider(color_eyre::Report),
}

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::RateLimited { message } => write!(f, "Rate limited: {message}"),
			Self::Upstream { message } => write!(f, "Upstream provider unavailable: {message}"),
			Self::Storage(err) => write!(f, "Storage error: {err}"),
			Self::Provider(err) => write!(f, "Provider error: {err}"),
		}
	}
}

impl std::error::Error for ServiceError {}

impl From<dowser_storage::Error> for ServiceError {
	fn from(err: dowser_storage::Error) -> Self {
		Self::Storage(err)
	}
}

impl From<color_eyre::Report> for ServiceError {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider(err)
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl GenerationProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		system: &'a str,
		user: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(generation::complete(cfg, system, user))
	}
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		generation: Arc<dyn GenerationProvider>,
	) -> Self {
		Self { embedding, generation }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self { embedding: provider.clone(), generation: provider }
	}
}

pub struct DowserService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
}

impl DowserService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, db, providers }
	}
}

/// Shared request validation for the retrieval entry points. Returns the
/// effective `top_k`, clamped to `search.max_top_k`.
pub(crate) fn validate_query(
	cfg: &Config,
	tenant_id: &str,
	query: &str,
	top_k: Option<u32>,
) -> ServiceResult<u32> {
	if tenant_id.trim().is_empty() {
		return Err(ServiceError::InvalidRequest {
			message: "tenant_id must be non-empty.".to_string(),
		});
	}
	if query.trim().is_empty() {
		return Err(ServiceError::InvalidRequest {
			message: "query must be non-empty.".to_string(),
		});
	}

	let top_k = top_k.unwrap_or(cfg.search.default_top_k);

	if top_k == 0 {
		return Err(ServiceError::InvalidRequest {
			message: "top_k must be greater than zero.".to_string(),
		});
	}

	Ok(top_k.min(cfg.search.max_top_k))
}
