use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use taged_domain::{content, tags};
use taged_storage::models::{UPDATE_NOTES, User};

use crate::{
	Error, NOTES_VERSION, Result, TagedService,
	notes::{Note, NoteField},
};

/// Fields to change; absent fields keep their stored value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NotePatch {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub content: Option<String>,
	#[serde(default)]
	pub tags: Option<Vec<String>>,
}

impl TagedService {
	/// Applies the fields of `patch` that differ from the stored note and refreshes
	/// `published_at`. Only those fields reach the engine.
	pub async fn update_note(&self, user: &User, id: &str, patch: NotePatch) -> Result<Note> {
		self.require_perm(user, UPDATE_NOTES)?;

		let stored = self.get_note_for_user(id, user, None).await?;
		let (next, fields) = diff(&stored, patch)?;

		if fields.contains(&NoteField::Tags) {
			self.add_tags_to_user_if_not_exist(&next.tags, user).await?;
		}

		let updated = self.notes.update(&next, &fields).await?;

		self.bump_versions(&[NOTES_VERSION]).await;

		tracing::info!(
			note_id = %updated.id,
			username = %user.username,
			fields = fields.len(),
			"Note updated."
		);

		Ok(updated)
	}
}

/// The note after the patch and the fields that must be sent for it.
fn diff(stored: &Note, patch: NotePatch) -> Result<(Note, Vec<NoteField>)> {
	let mut next = stored.clone();
	let mut fields = Vec::new();

	if let Some(title) = patch.title {
		let title = title.trim();

		if title.is_empty() {
			return Err(Error::InvalidRequest { message: "title must be non-empty.".to_string() });
		}
		if title != stored.title {
			next.title = title.to_string();

			fields.push(NoteField::Title);
		}
	}
	if let Some(body) = patch.content
		&& body != stored.content
	{
		next.preview_image = content::first_image_url(&body);
		next.content = body;

		fields.push(NoteField::Content);
		fields.push(NoteField::PreviewImage);
	}
	if let Some(raw) = patch.tags {
		let cleaned = tags::clean_tags(&raw);

		if cleaned != stored.tags {
			next.tags = cleaned;

			fields.push(NoteField::Tags);
		}
	}

	next.published_at = Some(OffsetDateTime::now_utc());

	fields.push(NoteField::PublishedAt);

	Ok((next, fields))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn stored() -> Note {
		Note {
			id: "n1".to_string(),
			title: "Docker".to_string(),
			content: "<p>x</p>".to_string(),
			tags: vec!["Docker".to_string()],
			published_at: None,
			preview_image: None,
		}
	}

	#[test]
	fn unchanged_fields_are_not_sent() {
		let patch = NotePatch {
			title: Some("Docker".to_string()),
			content: Some("<p>x</p>".to_string()),
			tags: Some(vec![" Docker ".to_string()]),
		};
		let (next, fields) = diff(&stored(), patch).expect("Diff should succeed.");

		assert_eq!(fields, vec![NoteField::PublishedAt]);
		assert!(next.published_at.is_some());
	}

	#[test]
	fn content_changes_recompute_the_preview() {
		let patch = NotePatch {
			content: Some(r#"<p><img src="/media/n1/a.png"></p>"#.to_string()),
			..Default::default()
		};
		let (next, fields) = diff(&stored(), patch).expect("Diff should succeed.");

		assert_eq!(fields, vec![NoteField::Content, NoteField::PreviewImage, NoteField::PublishedAt]);
		assert_eq!(next.preview_image.as_deref(), Some("/media/n1/a.png"));
	}

	#[test]
	fn blank_titles_are_rejected() {
		let patch = NotePatch { title: Some("  ".to_string()), ..Default::default() };

		assert!(matches!(diff(&stored(), patch), Err(Error::InvalidRequest { .. })));
	}
}
