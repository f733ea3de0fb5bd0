//! Signed, expiring links that expose a single note without a session.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use taged_storage::models::User;

use crate::{
	Error, Result, TagedService,
	notes::{Note, NoteField},
};

#[derive(Debug, Serialize, Deserialize)]
struct LinkClaims {
	id: String,
	exp: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempLink {
	pub token: String,
	pub path: String,
	#[serde(with = "crate::time_serde")]
	pub expires_at: OffsetDateTime,
}

/// Signs a link to note `id` that stops working at `expires_at`.
pub fn sign_link(key: &str, id: &str, expires_at: OffsetDateTime) -> Result<TempLink> {
	let claims = LinkClaims { id: id.to_string(), exp: expires_at.unix_timestamp() };
	let token = jsonwebtoken::encode(
		&Header::new(Algorithm::HS256),
		&claims,
		&EncodingKey::from_secret(key.as_bytes()),
	)
	.map_err(|err| Error::InvalidRequest { message: format!("Failed to sign link: {err}.") })?;

	Ok(TempLink { path: format!("/api/v1/temp/{token}"), token, expires_at })
}

/// The note id carried by a valid, unexpired token.
pub fn verify_link(key: &str, token: &str) -> Result<String> {
	let mut validation = Validation::new(Algorithm::HS256);

	validation.leeway = 0;

	let data = jsonwebtoken::decode::<LinkClaims>(
		token,
		&DecodingKey::from_secret(key.as_bytes()),
		&validation,
	)
	.map_err(|err| match err.kind() {
		ErrorKind::ExpiredSignature =>
			Error::InvalidRequest { message: "The link has expired.".to_string() },
		_ => Error::InvalidRequest { message: "Invalid link token.".to_string() },
	})?;

	Ok(data.claims.id)
}

impl TagedService {
	/// A share link to a note `user` can see, valid for `minutes`.
	pub async fn create_temp_link(&self, user: &User, id: &str, minutes: u64) -> Result<TempLink> {
		let key = self.link_key()?;

		if minutes == 0 || minutes > self.cfg.links.max_minutes {
			return Err(Error::InvalidRequest {
				message: format!("minutes must be between 1 and {}.", self.cfg.links.max_minutes),
			});
		}

		let note = self.get_note_for_user(id, user, Some(&[NoteField::Title])).await?;
		let expires_at = OffsetDateTime::now_utc() + Duration::minutes(minutes as i64);
		let link = sign_link(key, &note.id, expires_at)?;

		tracing::info!(note_id = %note.id, username = %user.username, minutes, "Temporary link created.");

		Ok(link)
	}

	pub async fn note_from_temp_link(&self, token: &str) -> Result<Note> {
		let id = verify_link(self.link_key()?, token)?;

		self.notes.get(&id, None).await
	}

	fn link_key(&self) -> Result<&str> {
		self.cfg.links.signing_key.as_deref().ok_or_else(|| Error::InvalidRequest {
			message: "Temporary links are disabled.".to_string(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "0123456789abcdef0123456789abcdef";

	#[test]
	fn signed_links_carry_the_note_id() {
		let expires_at = OffsetDateTime::now_utc() + Duration::minutes(5);
		let link = sign_link(KEY, "n1", expires_at).expect("Sign link.");

		assert_eq!(link.path, format!("/api/v1/temp/{}", link.token));
		assert_eq!(verify_link(KEY, &link.token).expect("Verify link."), "n1");
	}

	#[test]
	fn expired_links_are_rejected() {
		let link = sign_link(KEY, "n1", OffsetDateTime::now_utc() - Duration::minutes(5))
			.expect("Sign link.");
		let err = verify_link(KEY, &link.token).expect_err("Expired link must fail.");

		assert!(err.to_string().contains("expired"), "Unexpected error: {err}");
	}

	#[test]
	fn links_signed_with_another_key_are_rejected() {
		let link = sign_link(KEY, "n1", OffsetDateTime::now_utc() + Duration::minutes(5))
			.expect("Sign link.");

		assert!(matches!(
			verify_link("fedcba9876543210fedcba9876543210", &link.token),
			Err(Error::InvalidRequest { .. })
		));
		assert!(matches!(verify_link(KEY, "not-a-token"), Err(Error::InvalidRequest { .. })));
	}
}
