pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
	#[error("Invalid filter: {message}")]
	InvalidFilter { message: String },
	#[error("Invalid weights: {message}")]
	InvalidWeight { message: String },
	#[error("Vector dimension mismatch: expected {expected}, got {actual}.")]
	DimensionMismatch { expected: usize, actual: usize },
}
