use serde::{Deserialize, Serialize};

pub const CREATE_NOTES: &str = "create_notes";
pub const UPDATE_NOTES: &str = "update_notes";
pub const DELETE_NOTES: &str = "delete_notes";
/// Adding, editing and removing books. Held implicitly by superusers only.
pub const MANAGE_BOOKS: &str = "manage_books";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
	pub username: String,
	pub is_superuser: bool,
	pub permissions: Vec<String>,
}
impl User {
	pub fn new(username: impl Into<String>) -> Self {
		Self { username: username.into(), is_superuser: false, permissions: Vec::new() }
	}

	pub fn superuser(username: impl Into<String>) -> Self {
		Self { is_superuser: true, ..Self::new(username) }
	}

	pub fn with_perm(mut self, perm: &str) -> Self {
		if !self.permissions.iter().any(|p| p == perm) {
			self.permissions.push(perm.to_string());
		}

		self
	}

	/// Superusers hold every permission.
	pub fn has_perm(&self, perm: &str) -> bool {
		self.is_superuser || self.permissions.iter().any(|p| p == perm)
	}
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct Tag {
	pub tag_id: i64,
	pub tag_name: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn superusers_hold_every_permission() {
		let admin = User::superuser("root");
		let writer = User::new("alice").with_perm(CREATE_NOTES);

		assert!(admin.has_perm(DELETE_NOTES));
		assert!(writer.has_perm(CREATE_NOTES));
		assert!(!writer.has_perm(UPDATE_NOTES));
		assert!(admin.has_perm(MANAGE_BOOKS));
		assert!(!writer.has_perm(MANAGE_BOOKS));
	}
}
