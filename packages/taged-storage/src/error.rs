#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Search engine returned {status}: {message}")]
	Engine { status: u16, message: String },
	#[error("Search engine is unavailable: {0}")]
	Unavailable(String),
	#[error("Invalid index definition: {0}")]
	Definition(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}
impl Error {
	/// Transport level failures: the engine could not be reached or did not answer in time.
	pub fn is_unavailable(&self) -> bool {
		match self {
			Self::Http(err) => err.is_connect() || err.is_timeout(),
			Self::Unavailable(_) => true,
			_ => false,
		}
	}
}
