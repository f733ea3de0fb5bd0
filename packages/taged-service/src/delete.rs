use serde::{Deserialize, Serialize};

use taged_storage::models::{DELETE_NOTES, User};

use crate::{NOTES_COUNT_VERSION, NOTES_VERSION, Result, TagedService, notes::NoteField};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
	/// Attachments stored under this id can be discarded once `deleted` is true.
	pub id: String,
	pub deleted: bool,
}

impl TagedService {
	pub async fn delete_note(&self, user: &User, id: &str) -> Result<DeleteResponse> {
		self.require_perm(user, DELETE_NOTES)?;
		self.get_note_for_user(id, user, Some(&[NoteField::Tags])).await?;

		let deleted = self.notes.delete(id).await?;

		if deleted {
			self.bump_versions(&[NOTES_VERSION, NOTES_COUNT_VERSION]).await;

			tracing::info!(note_id = id, username = %user.username, "Note deleted.");
		}

		Ok(DeleteResponse { id: id.to_string(), deleted })
	}
}
