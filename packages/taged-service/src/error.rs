pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Permission denied: {message}")]
	PermissionDenied { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Repository error: {message}")]
	Repository { message: String },
	#[error("Search engine unavailable: {message}")]
	Unavailable { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	/// Engine failures on index, update and delete, transport failures included. Only a
	/// missing document keeps its own kind.
	pub(crate) fn write(err: taged_storage::Error) -> Self {
		match err {
			taged_storage::Error::NotFound(message) => Self::NotFound { message },
			err => Self::Repository { message: err.to_string() },
		}
	}
}

impl From<taged_storage::Error> for Error {
	fn from(err: taged_storage::Error) -> Self {
		if err.is_unavailable() {
			return Self::Unavailable { message: err.to_string() };
		}

		match err {
			taged_storage::Error::NotFound(message) => Self::NotFound { message },
			taged_storage::Error::InvalidArgument(message)
			| taged_storage::Error::Definition(message) => Self::InvalidRequest { message },
			err => Self::Storage { message: err.to_string() },
		}
	}
}
