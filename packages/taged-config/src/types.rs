use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	pub storage: Storage,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub links: Links,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// Connection and query defaults for the full-text search engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	pub url: String,
	/// Request timeout passed through to every engine call.
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_notes_index")]
	pub notes_index: String,
	#[serde(default = "default_books_index")]
	pub books_index: String,
	#[serde(default = "default_per_page")]
	pub per_page: u64,
	/// Extend search strings with their keyboard-layout transliterations.
	#[serde(default)]
	pub translate_layout: bool,
	pub username: Option<String>,
	pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
	pub notes_page_ttl_secs: u64,
	pub notes_count_ttl_secs: u64,
	/// Upper bound on cached listings, counts and drafts held in memory.
	#[serde(default = "default_max_entries")]
	pub max_entries: u64,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			notes_page_ttl_secs: 60 * 5,
			notes_count_ttl_secs: 60 * 10,
			max_entries: default_max_entries(),
		}
	}
}

/// Signed, expiring share links to single notes.
#[derive(Debug, Clone, Deserialize)]
pub struct Links {
	/// HMAC key for link tokens. Links are disabled without one.
	pub signing_key: Option<String>,
	#[serde(default = "default_link_max_minutes")]
	pub max_minutes: u64,
}
impl Default for Links {
	fn default() -> Self {
		Self { signing_key: None, max_minutes: default_link_max_minutes() }
	}
}

fn default_link_max_minutes() -> u64 {
	60 * 24 * 7
}

fn default_max_entries() -> u64 {
	10_000
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_timeout_ms() -> u64 {
	5_000
}

fn default_notes_index() -> String {
	"notes".to_string()
}

fn default_books_index() -> String {
	"books".to_string()
}

fn default_per_page() -> u64 {
	24
}
