use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read config file at {path:?}.")]
	ReadConfig { path: PathBuf, source: std::io::Error },
	#[error("Failed to parse config file at {path:?}.")]
	ParseConfig { path: PathBuf, source: toml::de::Error },
	#[error("{field} {message}")]
	Validation { field: &'static str, message: String },
}
impl Error {
	pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
		Self::Validation { field, message: message.into() }
	}
}
