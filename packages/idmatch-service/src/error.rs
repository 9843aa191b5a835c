use idmatch_domain::fusion::Modality;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("Invalid filter: {message}")]
	InvalidFilter { message: String },
	#[error("At least one embedding (face or text) must be provided.")]
	NoEmbeddingProvided,
	#[error("Invalid weights: {message}")]
	InvalidWeight { message: String },
	#[error("The {modality} index is unavailable: {message}")]
	IndexUnavailable { modality: Modality, message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl ServiceError {
	/// Whether the caller can fix the failure by changing the request.
	pub fn is_caller_error(&self) -> bool {
		matches!(
			self,
			Self::InvalidFilter { .. }
				| Self::NoEmbeddingProvided
				| Self::InvalidWeight { .. }
				| Self::InvalidRequest { .. }
				| Self::NotFound { .. }
		)
	}
}

impl From<idmatch_domain::Error> for ServiceError {
	fn from(err: idmatch_domain::Error) -> Self {
		match err {
			idmatch_domain::Error::InvalidFilter { message } => Self::InvalidFilter { message },
			idmatch_domain::Error::InvalidWeight { message } => Self::InvalidWeight { message },
			err @ idmatch_domain::Error::DimensionMismatch { .. } =>
				Self::InvalidRequest { message: err.to_string() },
		}
	}
}
