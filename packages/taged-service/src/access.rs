//! Which tags, and therefore which notes, a user may see.

use std::collections::HashSet;

use taged_domain::tags;
use taged_storage::models::User;

use crate::{
	Error, Result, TagedService,
	notes::{Note, NoteField},
};

impl TagedService {
	pub async fn resolve_user(&self, username: &str) -> Result<User> {
		let username = username.trim();

		if username.is_empty() {
			return Err(Error::PermissionDenied { message: "A user is required.".to_string() });
		}

		self.tags
			.find_user(username)
			.await?
			.ok_or_else(|| Error::PermissionDenied { message: format!("Unknown user {username:?}.") })
	}

	/// Every tag for superusers, the granted ones otherwise.
	pub async fn available_tags(&self, user: &User) -> Result<Vec<String>> {
		if user.is_superuser {
			return Ok(self.tags.all_tags().await?);
		}

		Ok(self.tags.user_tags(&user.username).await?)
	}

	pub async fn unavailable_tags(&self, user: &User) -> Result<Vec<String>> {
		if user.is_superuser {
			return Ok(Vec::new());
		}

		let available = self.available_tags(user).await?.into_iter().collect::<HashSet<_>>();
		let mut unavailable = self
			.tags
			.all_tags()
			.await?
			.into_iter()
			.filter(|tag| !available.contains(tag))
			.collect::<Vec<_>>();

		unavailable.sort();

		Ok(unavailable)
	}

	/// Creates unknown tags and grants them to `user`. Existing tags keep their owners.
	pub async fn add_tags_to_user_if_not_exist(&self, names: &[String], user: &User) -> Result<()> {
		for name in names {
			if self.tags.ensure_tag(name).await? {
				self.tags.grant_tag(name, &user.username).await?;

				tracing::debug!(tag = %name, username = %user.username, "Granted new tag.");
			}
		}

		Ok(())
	}

	/// Fetches a note, reporting notes hidden from `user` as missing.
	pub async fn get_note_for_user(
		&self,
		id: &str,
		user: &User,
		fields: Option<&[NoteField]>,
	) -> Result<Note> {
		let note = self.notes.get(id, fields).await?;
		let unavailable = self.unavailable_tags(user).await?;

		if tags::intersects(&note.tags, &unavailable) {
			return Err(Error::NotFound { message: format!("Note {id:?}.") });
		}

		Ok(note)
	}

	pub(crate) fn require_perm(&self, user: &User, perm: &str) -> Result<()> {
		if user.has_perm(perm) {
			return Ok(());
		}

		Err(Error::PermissionDenied {
			message: format!("User {:?} lacks the {perm} permission.", user.username),
		})
	}
}
