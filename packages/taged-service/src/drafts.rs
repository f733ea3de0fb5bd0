//! Unsaved notes kept per user in the cache store until they are published or discarded.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use taged_domain::{content, tags};
use taged_storage::models::User;

use crate::{Error, Result, TagedService};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DraftInput {
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub content: String,
	#[serde(default)]
	pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
	pub id: String,
	pub title: String,
	pub content: String,
	pub tags: Vec<String>,
	pub preview_image: Option<String>,
}
impl Draft {
	fn summary(&self) -> DraftSummary {
		DraftSummary {
			id: self.id.clone(),
			title: self.title.clone(),
			tags: self.tags.clone(),
			preview_image: self.preview_image.clone(),
		}
	}
}

/// A listed draft. Bodies are only returned by [`TagedService::get_draft`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSummary {
	pub id: String,
	pub title: String,
	pub tags: Vec<String>,
	pub preview_image: Option<String>,
}

impl TagedService {
	/// Drafts of `user`, most recently changed first.
	pub async fn list_drafts(&self, user: &User) -> Result<Vec<DraftSummary>> {
		Ok(self.read_draft_value(&list_key(user)).await?.unwrap_or_default())
	}

	pub async fn create_draft(&self, user: &User, input: DraftInput) -> Result<Draft> {
		self.store_draft(user, Uuid::new_v4().to_string(), input).await
	}

	pub async fn get_draft(&self, user: &User, id: &str) -> Result<Draft> {
		let id = draft_id(id)?;

		self.read_draft_value(&draft_key(user, id))
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Draft {id:?}.") })
	}

	/// Creates or replaces the draft stored under `id`.
	pub async fn save_draft(&self, user: &User, id: &str, input: DraftInput) -> Result<Draft> {
		let id = draft_id(id)?;

		self.store_draft(user, id.to_string(), input).await
	}

	pub async fn delete_draft(&self, user: &User, id: &str) -> Result<()> {
		let id = draft_id(id)?;

		self.cache.delete(&draft_key(user, id)).await?;

		let remaining = self
			.list_drafts(user)
			.await?
			.into_iter()
			.filter(|summary| summary.id != id)
			.collect::<Vec<_>>();

		self.write_draft_value(&list_key(user), &remaining).await
	}

	async fn store_draft(&self, user: &User, id: String, input: DraftInput) -> Result<Draft> {
		let draft = Draft {
			preview_image: content::first_image_url(&input.content),
			title: input.title.trim().to_string(),
			tags: tags::clean_tags(&input.tags),
			content: input.content,
			id,
		};
		let previous: Option<Draft> = self.read_draft_value(&draft_key(user, &draft.id)).await?;

		self.write_draft_value(&draft_key(user, &draft.id), &draft).await?;

		let summary = draft.summary();

		// Body edits alone keep the listing order.
		if previous.map(|previous| previous.summary()) != Some(summary.clone()) {
			let mut listing = vec![summary];

			listing.extend(self.list_drafts(user).await?.into_iter().filter(|s| s.id != draft.id));

			self.write_draft_value(&list_key(user), &listing).await?;
		}

		tracing::debug!(draft_id = %draft.id, username = %user.username, "Draft saved.");

		Ok(draft)
	}

	async fn read_draft_value<T>(&self, key: &str) -> Result<Option<T>>
	where
		T: DeserializeOwned,
	{
		match self.cache.get(key).await? {
			Some(value) =>
				Ok(Some(serde_json::from_value(value).map_err(taged_storage::Error::from)?)),
			None => Ok(None),
		}
	}

	async fn write_draft_value<T>(&self, key: &str, value: &T) -> Result<()>
	where
		T: Serialize,
	{
		let value = serde_json::to_value(value).map_err(taged_storage::Error::from)?;

		Ok(self.cache.set(key, value, None).await?)
	}
}

fn list_key(user: &User) -> String {
	format!("drafts:{}", user.username)
}

fn draft_key(user: &User, id: &str) -> String {
	format!("drafts:{}:{id}", user.username)
}

fn draft_id(raw: &str) -> Result<&str> {
	let id = raw.trim();

	if id.is_empty() || id.contains(':') {
		return Err(Error::InvalidRequest { message: format!("Invalid draft id {raw:?}.") });
	}

	Ok(id)
}
