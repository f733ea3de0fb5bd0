//! Tag ownership and the users that may see them.

use sqlx::PgExecutor;

use crate::{
	BoxFuture, Result,
	db::Db,
	models::{Tag, User},
};

pub trait TagStore
where
	Self: Send + Sync,
{
	fn find_user<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<Option<User>>>;

	fn all_tags<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>>;

	fn user_tags<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<Vec<String>>>;

	/// Creates the tag when absent and reports whether it did.
	fn ensure_tag<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>>;

	fn grant_tag<'a>(&'a self, name: &'a str, username: &'a str) -> BoxFuture<'a, Result<()>>;
}

pub async fn find_user<'e, E>(executor: E, username: &str) -> Result<Option<User>>
where
	E: PgExecutor<'e>,
{
	let user = sqlx::query_as::<_, User>(
		"SELECT username, is_superuser, permissions FROM users WHERE username = $1",
	)
	.bind(username)
	.fetch_optional(executor)
	.await?;

	Ok(user)
}

pub async fn upsert_user<'e, E>(executor: E, user: &User) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO users (username, is_superuser, permissions)
VALUES ($1, $2, $3)
ON CONFLICT (username) DO UPDATE
SET is_superuser = EXCLUDED.is_superuser, permissions = EXCLUDED.permissions",
	)
	.bind(&user.username)
	.bind(user.is_superuser)
	.bind(&user.permissions)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn all_tag_names<'e, E>(executor: E) -> Result<Vec<String>>
where
	E: PgExecutor<'e>,
{
	let names = sqlx::query_scalar::<_, String>("SELECT tag_name FROM tags ORDER BY tag_name")
		.fetch_all(executor)
		.await?;

	Ok(names)
}

pub async fn user_tag_names<'e, E>(executor: E, username: &str) -> Result<Vec<String>>
where
	E: PgExecutor<'e>,
{
	let names = sqlx::query_scalar::<_, String>(
		"\
SELECT t.tag_name
FROM tags t
JOIN tag_users tu ON tu.tag_id = t.tag_id
WHERE tu.username = $1
ORDER BY t.tag_name",
	)
	.bind(username)
	.fetch_all(executor)
	.await?;

	Ok(names)
}

/// Inserts the tag when absent. The flag is true only for the call that created it.
pub async fn get_or_create_tag(db: &Db, name: &str) -> Result<(Tag, bool)> {
	let inserted = sqlx::query_as::<_, Tag>(
		"\
INSERT INTO tags (tag_name)
VALUES ($1)
ON CONFLICT (tag_name) DO NOTHING
RETURNING tag_id, tag_name",
	)
	.bind(name)
	.fetch_optional(&db.pool)
	.await?;

	if let Some(tag) = inserted {
		return Ok((tag, true));
	}

	let existing =
		sqlx::query_as::<_, Tag>("SELECT tag_id, tag_name FROM tags WHERE tag_name = $1")
			.bind(name)
			.fetch_one(&db.pool)
			.await?;

	Ok((existing, false))
}

pub async fn add_tag_user<'e, E>(executor: E, tag_id: i64, username: &str) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO tag_users (tag_id, username)
VALUES ($1, $2)
ON CONFLICT DO NOTHING",
	)
	.bind(tag_id)
	.bind(username)
	.execute(executor)
	.await?;

	Ok(())
}

impl TagStore for Db {
	fn find_user<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
		Box::pin(find_user(&self.pool, username))
	}

	fn all_tags<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(all_tag_names(&self.pool))
	}

	fn user_tags<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(user_tag_names(&self.pool, username))
	}

	fn ensure_tag<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let (_, created) = get_or_create_tag(self, name).await?;

			Ok(created)
		})
	}

	fn grant_tag<'a>(&'a self, name: &'a str, username: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let (tag, _) = get_or_create_tag(self, name).await?;

			add_tag_user(&self.pool, tag.tag_id, username).await
		})
	}
}
