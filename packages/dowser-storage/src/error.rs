#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Failed to prepare database path: {0}")]
	Io(#[from] std::io::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Index integrity violation: {0}")]
	IndexIntegrity(String),
}
