use serde::{Deserialize, Serialize};

use taged_domain::{content, tags};
use taged_storage::models::{CREATE_NOTES, User};

use crate::{
	Error, NOTES_COUNT_VERSION, NOTES_VERSION, Result, TagedService,
	notes::{NewNote, Note},
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NoteInput {
	pub title: String,
	#[serde(default)]
	pub content: String,
	#[serde(default)]
	pub tags: Vec<String>,
}

impl TagedService {
	pub async fn create_note(&self, user: &User, input: NoteInput) -> Result<Note> {
		self.require_perm(user, CREATE_NOTES)?;

		let title = input.title.trim();

		if title.is_empty() {
			return Err(Error::InvalidRequest { message: "title must be non-empty.".to_string() });
		}

		let tags = tags::clean_tags(&input.tags);
		let note = self
			.notes
			.create(NewNote {
				title: title.to_string(),
				preview_image: content::first_image_url(&input.content),
				content: input.content,
				tags: tags.clone(),
			})
			.await?;

		self.add_tags_to_user_if_not_exist(&tags, user).await?;
		self.bump_versions(&[NOTES_VERSION, NOTES_COUNT_VERSION]).await;

		tracing::info!(note_id = %note.id, username = %user.username, "Note created.");

		Ok(note)
	}
}
