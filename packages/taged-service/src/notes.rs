//! The notes document shape and the repository over the notes index.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use taged_domain::tags;
use taged_storage::{
	client::{SearchClient, Source},
	paginator::{self, FilterContext, Paginator},
	query::{self, QueryDescriptor, Sort, SortOrder},
};

use crate::{
	Error, Result,
	records::{self, NoteRecord},
};

/// Title matches weigh more than content matches.
const TITLE_BOOST: f64 = 2.0;
/// Autocomplete never returns more titles than this.
const TITLE_SUGGESTIONS: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteField {
	Title,
	Content,
	Tags,
	PublishedAt,
	PreviewImage,
}
impl NoteField {
	pub const ALL: [Self; 5] =
		[Self::Title, Self::Content, Self::Tags, Self::PublishedAt, Self::PreviewImage];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Title => "title",
			Self::Content => "content",
			Self::Tags => "tags",
			Self::PublishedAt => "published_at",
			Self::PreviewImage => "preview_image",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
	pub id: String,
	pub title: String,
	pub content: String,
	pub tags: Vec<String>,
	#[serde(default, with = "crate::time_serde::option")]
	pub published_at: Option<OffsetDateTime>,
	pub preview_image: Option<String>,
}
impl Note {
	/// Builds a note from an engine document. Tags are normalised here and nowhere else.
	pub fn from_source(id: impl Into<String>, source: &Source) -> Self {
		Self {
			id: id.into(),
			title: records::text(source, "title").unwrap_or_default(),
			content: records::text(source, "content").unwrap_or_default(),
			tags: tags::normalize_tags(source.get("tags").unwrap_or(&Value::Null)),
			published_at: records::timestamp(source, "published_at"),
			preview_image: records::text(source, "preview_image").filter(|url| !url.is_empty()),
		}
	}

	/// The engine document restricted to `fields`.
	pub fn document(&self, fields: &[NoteField]) -> Result<Source> {
		let mut source = Source::new();

		for field in fields {
			let value = match field {
				NoteField::Title => Value::from(self.title.as_str()),
				NoteField::Content => Value::from(self.content.as_str()),
				NoteField::Tags => Value::from(self.tags.clone()),
				NoteField::PublishedAt => match self.published_at {
					Some(at) => Value::from(at.format(&Rfc3339).map_err(|err| {
						Error::InvalidRequest { message: format!("Unformattable published_at: {err}.") }
					})?),
					None => Value::Null,
				},
				NoteField::PreviewImage =>
					Value::from(self.preview_image.clone().unwrap_or_default()),
			};

			source.insert(field.as_str().to_string(), value);
		}

		Ok(source)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewNote {
	pub title: String,
	pub content: String,
	pub tags: Vec<String>,
	pub preview_image: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NotesFilter {
	pub tags_in: Vec<String>,
	pub tags_off: Vec<String>,
	pub search: String,
	/// Source fields to return; `None` returns every field.
	pub fields: Option<Vec<NoteField>>,
	/// Overrides the default order: relevance with a search string, newest first without.
	pub sort: Option<NoteField>,
	pub sort_desc: bool,
	/// Lists every note when no other constraint applies instead of matching nothing.
	pub match_all: bool,
}

#[derive(Clone)]
pub struct NotesRepository {
	client: Arc<dyn SearchClient>,
	index: String,
	timeout: Duration,
	per_page: u64,
}
impl NotesRepository {
	pub fn new(client: Arc<dyn SearchClient>, cfg: &taged_config::Search) -> Self {
		Self {
			client,
			index: cfg.notes_index.clone(),
			timeout: Duration::from_millis(cfg.timeout_ms),
			per_page: cfg.per_page,
		}
	}

	pub fn index(&self) -> &str {
		&self.index
	}

	pub async fn get(&self, id: &str, fields: Option<&[NoteField]>) -> Result<Note> {
		let includes = fields.map(source_fields);
		let found = self.client.get(&self.index, id, includes.as_deref(), self.timeout).await?;

		Ok(Note::from_source(found.id, &found.source))
	}

	pub async fn create(&self, new: NewNote) -> Result<Note> {
		let mut note = Note {
			id: String::new(),
			title: new.title,
			content: new.content,
			tags: new.tags,
			published_at: Some(OffsetDateTime::now_utc()),
			preview_image: new.preview_image,
		};
		let document = note.document(&NoteField::ALL)?;
		let written = self
			.client
			.index(&self.index, None, &document, self.timeout)
			.await
			.map_err(Error::write)?;

		ensure_applied(written.shards.failed, "index", &written.id)?;

		note.id = written.id;

		Ok(note)
	}

	/// Sends only `fields` of `note`; everything else is left untouched in the engine.
	pub async fn update(&self, note: &Note, fields: &[NoteField]) -> Result<Note> {
		if fields.is_empty() {
			return Ok(note.clone());
		}

		let partial = note.document(fields)?;
		let written = self
			.client
			.update(&self.index, &note.id, &partial, self.timeout)
			.await
			.map_err(Error::write)?;

		ensure_applied(written.shards.failed, "update", &note.id)?;

		Ok(note.clone())
	}

	/// True when no shard failed. Deleting an absent note is not an error.
	pub async fn delete(&self, id: &str) -> Result<bool> {
		let written =
			self.client.delete(&self.index, id, self.timeout).await.map_err(Error::write)?;

		if written.shards.failed > 0 {
			tracing::warn!(id, failed = written.shards.failed, "Note delete reported failed shards.");
		}

		Ok(written.shards.failed == 0)
	}

	pub fn filter_query(&self, filter: &NotesFilter) -> QueryDescriptor {
		let mut descriptor = QueryDescriptor::new(self.index.clone(), self.timeout);
		let search = filter.search.trim();

		if let Some(fields) = &filter.fields {
			descriptor.fields = source_fields(fields);
		}
		if !filter.tags_in.is_empty() {
			descriptor.query.must.push(query::match_text("tags", &filter.tags_in.join(" ")));
		}
		if !search.is_empty() {
			descriptor.query.should.push(query::fuzzy_match("title", search, Some(TITLE_BOOST)));
			descriptor.query.should.push(query::fuzzy_match("content", search, None));
			descriptor.query.minimum_should_match = Some(1);
		}
		if !filter.tags_off.is_empty() {
			descriptor.query.must_not.push(query::match_text("tags", &filter.tags_off.join(" ")));
		}
		if filter.match_all && descriptor.query.must.is_empty() && descriptor.query.should.is_empty()
		{
			descriptor.query.must.push(query::match_all());
		}

		descriptor.sort = match filter.sort {
			Some(field) => Some(Sort::new(field.as_str(), SortOrder::from_desc(filter.sort_desc))),
			None if search.is_empty() =>
				Some(Sort::new(NoteField::PublishedAt.as_str(), SortOrder::Desc)),
			None => None,
		};

		descriptor
	}

	pub async fn filter(&self, filter: NotesFilter) -> Result<Paginator<NoteRecord>> {
		let descriptor = self.filter_query(&filter);
		let context = FilterContext { tags_in: filter.tags_in, tags_off: filter.tags_off };
		let pager = Paginator::new(
			self.client.clone(),
			descriptor,
			self.per_page,
			records::filter_and_score,
			context,
		)
		.await?;

		Ok(pager)
	}

	/// Titles fuzzily matching `query`, skipping notes tagged with anything unavailable.
	pub async fn get_titles(&self, query: &str, unavailable_tags: &[String]) -> Result<Vec<String>> {
		let query = query.trim();

		if query.is_empty() {
			return Ok(Vec::new());
		}

		let mut descriptor = QueryDescriptor::new(self.index.clone(), self.timeout);

		descriptor.fields = source_fields(&[NoteField::Title]);
		descriptor.query.must.push(query::fuzzy_match("title", query, None));

		if !unavailable_tags.is_empty() {
			descriptor.query.must_not.push(query::match_text("tags", &unavailable_tags.join(" ")));
		}

		let hits = paginator::search(self.client.as_ref(), &descriptor, 0, TITLE_SUGGESTIONS).await?;

		Ok(hits
			.hits
			.into_iter()
			.filter(|hit| {
				let note_tags = tags::normalize_tags(hit.source.get("tags").unwrap_or(&Value::Null));

				!tags::intersects(&note_tags, unavailable_tags)
			})
			.filter_map(|hit| records::text(&hit.source, "title"))
			.collect())
	}

	pub async fn tags_count(&self, tag: &str) -> Result<u64> {
		let mut descriptor = QueryDescriptor::new(self.index.clone(), self.timeout);

		if !tag.trim().is_empty() {
			descriptor.query.must.push(query::match_text("tags", tag.trim()));
		}

		Ok(paginator::count(self.client.as_ref(), &descriptor).await?)
	}
}

/// Requested fields as engine source names; tags are always included.
fn source_fields(fields: &[NoteField]) -> Vec<String> {
	let mut names = fields.iter().map(|field| field.as_str().to_string()).collect::<Vec<_>>();

	if !fields.contains(&NoteField::Tags) {
		names.push(NoteField::Tags.as_str().to_string());
	}

	names
}

fn ensure_applied(failed: u64, op: &str, id: &str) -> Result<()> {
	if failed == 0 {
		return Ok(());
	}

	Err(Error::Repository { message: format!("Note {op} for {id:?} failed on {failed} shards.") })
}
