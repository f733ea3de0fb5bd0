mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Cache, Config, Links, Postgres, Search, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::validation("service.http_bind", "must be non-empty."));
	}
	if cfg.search.url.trim().is_empty() {
		return Err(Error::validation("search.url", "must be non-empty."));
	}
	if cfg.search.timeout_ms == 0 {
		return Err(Error::validation("search.timeout_ms", "must be greater than zero."));
	}

	for (field, value) in
		[("search.notes_index", &cfg.search.notes_index), ("search.books_index", &cfg.search.books_index)]
	{
		if value.trim().is_empty() {
			return Err(Error::validation(field, "must be non-empty."));
		}
		if value.chars().any(|c| c.is_ascii_uppercase() || c.is_whitespace()) {
			return Err(Error::validation(field, "must be lowercase without whitespace."));
		}
	}

	if cfg.search.notes_index == cfg.search.books_index {
		return Err(Error::validation("search.books_index", "must differ from search.notes_index."));
	}
	if cfg.search.per_page == 0 {
		return Err(Error::validation("search.per_page", "must be greater than zero."));
	}
	if cfg.search.password.is_some() && cfg.search.username.is_none() {
		return Err(Error::validation("search.password", "requires search.username."));
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::validation("storage.postgres.dsn", "must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::validation(
			"storage.postgres.pool_max_conns",
			"must be greater than zero.",
		));
	}
	if cfg.cache.notes_page_ttl_secs == 0 {
		return Err(Error::validation("cache.notes_page_ttl_secs", "must be greater than zero."));
	}
	if cfg.cache.notes_count_ttl_secs == 0 {
		return Err(Error::validation("cache.notes_count_ttl_secs", "must be greater than zero."));
	}
	if cfg.cache.max_entries == 0 {
		return Err(Error::validation("cache.max_entries", "must be greater than zero."));
	}
	if cfg.links.max_minutes == 0 {
		return Err(Error::validation("links.max_minutes", "must be greater than zero."));
	}
	if cfg.links.signing_key.as_deref().is_some_and(|key| key.len() < 32) {
		return Err(Error::validation("links.signing_key", "must be at least 32 bytes."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.search.username.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
		cfg.search.username = None;
	}
	if cfg.search.password.as_deref().map(|value| value.is_empty()).unwrap_or(false) {
		cfg.search.password = None;
	}

	if cfg.links.signing_key.as_deref().map(|value| value.trim().is_empty()).unwrap_or(false) {
		cfg.links.signing_key = None;
	}

	let trimmed = cfg.search.url.trim().trim_end_matches('/').to_string();

	cfg.search.url = trimmed;
}
