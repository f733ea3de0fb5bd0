use std::time::Duration;

use serde::{Deserialize, Serialize};

use taged_domain::{layout, tags};
use taged_storage::{
	cache::{self, CacheKey, CacheVersion},
	models::User,
	paginator::Paginator,
};

use crate::{
	Error, NOTES_COUNT_VERSION, NOTES_VERSION, Result, TagedService,
	notes::{NoteField, NotesFilter},
	records::NoteRecord,
};

const LISTING_FIELDS: [NoteField; 4] =
	[NoteField::Title, NoteField::Tags, NoteField::PublishedAt, NoteField::PreviewImage];

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListNotesRequest {
	#[serde(default)]
	pub search: String,
	#[serde(default)]
	pub tags_in: Vec<String>,
	#[serde(default)]
	pub page: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
	pub current_page: u64,
	pub max_pages: u64,
	pub per_page: u64,
	pub total_records: u64,
	pub has_previous: bool,
	pub has_next: bool,
}
impl PageInfo {
	pub fn from_paginator<T>(pager: &Paginator<T>) -> Self {
		Self {
			current_page: pager.page(),
			max_pages: pager.max_pages(),
			per_page: pager.per_page(),
			total_records: pager.count(),
			has_previous: pager.has_previous(),
			has_next: pager.has_next(),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotesPage {
	pub records: Vec<NoteRecord>,
	pub paginator: PageInfo,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUsage {
	pub name: String,
	pub count: u64,
}

impl TagedService {
	/// One page of the notes `user` may see. The unfiltered first page is served from cache.
	pub async fn list_notes(&self, user: &User, req: ListNotesRequest) -> Result<NotesPage> {
		let search = self.search_string(&req.search);
		let tags_in = tags::clean_tags(&req.tags_in);
		let cacheable = search.is_empty() && tags_in.is_empty();
		let filter = NotesFilter {
			tags_in,
			tags_off: self.unavailable_tags(user).await?,
			search,
			fields: Some(LISTING_FIELDS.to_vec()),
			match_all: true,
			..Default::default()
		};
		let mut pager = self.notes.filter(filter).await?;
		let records = if cacheable && pager.validate_number(req.page.as_str()) == 1 {
			let ttl = Duration::from_secs(self.cfg.cache.notes_page_ttl_secs);
			let version =
				CacheVersion::new(NOTES_VERSION).get_version(self.cache.as_ref()).await?;
			let key = CacheKey::scoped(NOTES_VERSION, user.username.as_str());
			let first_page = &mut pager;

			cache::get_or_cache(self.cache.as_ref(), &key, version, ttl, move || async move {
				first_page.get_page(1_u64).await
			})
			.await?
		} else {
			pager.get_page(req.page.as_str()).await?
		};

		Ok(NotesPage { records, paginator: PageInfo::from_paginator(&pager) })
	}

	/// How many notes `user` may see, cached per user.
	pub async fn notes_count(&self, user: &User) -> Result<u64> {
		let ttl = Duration::from_secs(self.cfg.cache.notes_count_ttl_secs);
		let version =
			CacheVersion::new(NOTES_COUNT_VERSION).get_version(self.cache.as_ref()).await?;
		let key = CacheKey::scoped(NOTES_COUNT_VERSION, user.username.as_str());

		cache::get_or_cache(self.cache.as_ref(), &key, version, ttl, move || async move {
			let filter = NotesFilter {
				tags_off: self.unavailable_tags(user).await?,
				match_all: true,
				..Default::default()
			};
			let pager = self.notes.filter(filter).await?;

			Ok::<_, Error>(pager.count())
		})
		.await
	}

	pub async fn note_titles(&self, user: &User, search: &str) -> Result<Vec<String>> {
		let unavailable = self.unavailable_tags(user).await?;

		self.notes.get_titles(&self.search_string(search), &unavailable).await
	}

	/// Tags visible to `user` with the number of notes carrying each.
	pub async fn tags_overview(&self, user: &User) -> Result<Vec<TagUsage>> {
		let mut usage = Vec::new();

		for name in self.available_tags(user).await? {
			let count = self.notes.tags_count(&name).await?;

			usage.push(TagUsage { name, count });
		}

		Ok(usage)
	}

	fn search_string(&self, raw: &str) -> String {
		let raw = raw.trim();

		if raw.is_empty() || !self.cfg.search.translate_layout {
			return raw.to_string();
		}

		layout::expand_search(raw)
	}
}
