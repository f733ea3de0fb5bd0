//! Post-processing of raw note hits: exact tag re-validation and score normalisation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use taged_domain::{score, tags};
use taged_storage::{
	client::{SearchHits, Source},
	paginator::FilterContext,
};

/// One listed note. Fields that were not requested stay empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default, with = "crate::time_serde::option", skip_serializing_if = "Option::is_none")]
	pub published_at: Option<OffsetDateTime>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub preview_image: Option<String>,
	pub score: f64,
}

pub fn filter_and_score(hits: SearchHits, context: &FilterContext) -> Vec<NoteRecord> {
	let max = score::max_score(hits.hits.iter().map(|hit| hit.score));

	hits.hits
		.into_iter()
		.filter_map(|hit| {
			let note_tags = tags::normalize_tags(hit.source.get("tags").unwrap_or(&Value::Null));

			if !tags::matches_constraints(&note_tags, &context.tags_in, &context.tags_off) {
				return None;
			}

			Some(NoteRecord {
				title: text(&hit.source, "title"),
				content: text(&hit.source, "content"),
				tags: note_tags,
				published_at: timestamp(&hit.source, "published_at"),
				preview_image: text(&hit.source, "preview_image").filter(|url| !url.is_empty()),
				score: score::normalize(hit.score, max),
				id: hit.id,
			})
		})
		.collect()
}

pub(crate) fn text(source: &Source, field: &str) -> Option<String> {
	match source.get(field)? {
		Value::String(value) => Some(value.clone()),
		Value::Null => None,
		other => Some(other.to_string()),
	}
}

pub(crate) fn timestamp(source: &Source, field: &str) -> Option<OffsetDateTime> {
	let raw = source.get(field)?.as_str()?;
	let parsed = crate::time_serde::parse(raw);

	if parsed.is_none() {
		tracing::warn!(field, raw, "Ignoring unparsable timestamp in search document.");
	}

	parsed
}
