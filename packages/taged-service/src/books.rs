use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use taged_domain::score;
use taged_storage::{
	client::{SearchClient, SearchHits, Source},
	paginator::{FilterContext, Paginator},
	query::{self, QueryDescriptor, Sort, SortOrder},
};

use crate::{Error, Result, records};

const SEARCH_FIELDS: [&str; 3] = ["title^2", "about", "author"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookField {
	Title,
	Author,
	Year,
	About,
	PublishedAt,
}
impl BookField {
	pub const ALL: [Self; 5] = [Self::Title, Self::Author, Self::Year, Self::About, Self::PublishedAt];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Title => "title",
			Self::Author => "author",
			Self::Year => "year",
			Self::About => "about",
			Self::PublishedAt => "published_at",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Book {
	pub id: String,
	pub title: String,
	pub author: String,
	pub year: String,
	pub about: String,
	#[serde(default, with = "crate::time_serde::option")]
	pub published_at: Option<OffsetDateTime>,
}
impl Book {
	pub fn from_source(id: impl Into<String>, source: &Source) -> Self {
		Self {
			id: id.into(),
			title: records::text(source, "title").unwrap_or_default(),
			author: records::text(source, "author").unwrap_or_default(),
			year: records::text(source, "year").unwrap_or_default(),
			about: records::text(source, "about").unwrap_or_default(),
			published_at: records::timestamp(source, "published_at"),
		}
	}

	fn document(&self) -> Result<Source> {
		let published_at = match self.published_at {
			Some(at) => Value::from(at.format(&Rfc3339).map_err(|err| Error::InvalidRequest {
				message: format!("Unformattable published_at: {err}."),
			})?),
			None => Value::Null,
		};
		let mut source = Source::new();

		source.insert("title".to_string(), Value::from(self.title.as_str()));
		source.insert("author".to_string(), Value::from(self.author.as_str()));
		source.insert("year".to_string(), Value::from(self.year.as_str()));
		source.insert("about".to_string(), Value::from(self.about.as_str()));
		source.insert("published_at".to_string(), published_at);

		Ok(source)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
	pub title: String,
	#[serde(default)]
	pub author: String,
	#[serde(default)]
	pub year: String,
	#[serde(default)]
	pub about: String,
}

/// A listed book with its normalised relevance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
	#[serde(flatten)]
	pub book: Book,
	pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BooksFilter {
	pub search: String,
	pub year: String,
	pub fields: Option<Vec<BookField>>,
	pub sort: Option<BookField>,
	pub sort_desc: bool,
	/// Lists every book, newest first unless sorted otherwise, when nothing else is asked.
	pub match_all: bool,
}

pub fn book_records(hits: SearchHits, _: &FilterContext) -> Vec<BookRecord> {
	let max = score::max_score(hits.hits.iter().map(|hit| hit.score));

	hits.hits
		.into_iter()
		.map(|hit| BookRecord {
			score: score::normalize(hit.score, max),
			book: Book::from_source(hit.id, &hit.source),
		})
		.collect()
}

#[derive(Clone)]
pub struct BooksRepository {
	client: Arc<dyn SearchClient>,
	index: String,
	timeout: Duration,
	per_page: u64,
}
impl BooksRepository {
	pub fn new(client: Arc<dyn SearchClient>, cfg: &taged_config::Search) -> Self {
		Self {
			client,
			index: cfg.books_index.clone(),
			timeout: Duration::from_millis(cfg.timeout_ms),
			per_page: cfg.per_page,
		}
	}

	pub fn index(&self) -> &str {
		&self.index
	}

	pub async fn get(&self, id: &str) -> Result<Book> {
		let found = self.client.get(&self.index, id, None, self.timeout).await?;

		Ok(Book::from_source(found.id, &found.source))
	}

	pub async fn create(&self, new: NewBook) -> Result<Book> {
		let mut book = Book {
			id: String::new(),
			title: new.title,
			author: new.author,
			year: new.year,
			about: new.about,
			published_at: Some(OffsetDateTime::now_utc()),
		};
		let document = book.document()?;
		let written = self
			.client
			.index(&self.index, None, &document, self.timeout)
			.await
			.map_err(Error::write)?;

		if written.shards.failed > 0 {
			return Err(Error::Repository {
				message: format!("Book index failed on {} shards.", written.shards.failed),
			});
		}

		book.id = written.id;

		Ok(book)
	}

	/// Rewrites every field of `book` and refreshes `published_at`.
	pub async fn update(&self, book: &Book) -> Result<Book> {
		let mut next = book.clone();

		next.published_at = Some(OffsetDateTime::now_utc());

		let document = next.document()?;
		let written = self
			.client
			.update(&self.index, &next.id, &document, self.timeout)
			.await
			.map_err(Error::write)?;

		if written.shards.failed > 0 {
			return Err(Error::Repository {
				message: format!("Book update failed on {} shards.", written.shards.failed),
			});
		}

		Ok(next)
	}

	pub async fn delete(&self, id: &str) -> Result<bool> {
		let written =
			self.client.delete(&self.index, id, self.timeout).await.map_err(Error::write)?;

		Ok(written.shards.failed == 0)
	}

	pub fn filter_query(&self, filter: &BooksFilter) -> QueryDescriptor {
		let mut descriptor = QueryDescriptor::new(self.index.clone(), self.timeout);
		let search = filter.search.trim();
		let year = filter.year.trim();

		descriptor.fields = filter
			.fields
			.as_deref()
			.unwrap_or(&BookField::ALL)
			.iter()
			.map(|field| field.as_str().to_string())
			.collect();

		if !search.is_empty() {
			descriptor.query.must.push(query::simple_query_string(search, &SEARCH_FIELDS));
		}
		if !year.is_empty() {
			descriptor.query.must.push(query::term("year", year));
		}

		let listing = filter.match_all && descriptor.query.is_empty();

		if listing {
			descriptor.query.must.push(query::match_all());
		}

		descriptor.sort = match filter.sort {
			Some(field) => Some(Sort::new(field.as_str(), SortOrder::from_desc(filter.sort_desc))),
			None if listing => Some(Sort::new(BookField::PublishedAt.as_str(), SortOrder::Desc)),
			None => None,
		};

		descriptor
	}

	pub async fn filter(&self, filter: BooksFilter) -> Result<Paginator<BookRecord>> {
		let descriptor = self.filter_query(&filter);
		let pager = Paginator::new(
			self.client.clone(),
			descriptor,
			self.per_page,
			book_records,
			FilterContext::default(),
		)
		.await?;

		Ok(pager)
	}
}
