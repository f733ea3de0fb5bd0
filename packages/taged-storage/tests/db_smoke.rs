use taged_config::Postgres;
use taged_storage::{
	db::Db,
	models::{CREATE_NOTES, User},
	tags::{self, TagStore},
};
use taged_testkit::TestDatabase;

#[tokio::test]
#[ignore = "Requires external Postgres. Set TAGED_PG_DSN to run."]
async fn tags_are_created_once_and_granted_per_user() {
	let Some(base_dsn) = taged_testkit::env_dsn() else {
		eprintln!("Skipping tags_are_created_once_and_granted_per_user; set TAGED_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");
	db.ensure_schema().await.expect("Schema bootstrap should be idempotent.");

	tags::upsert_user(&db.pool, &User::new("alice").with_perm(CREATE_NOTES))
		.await
		.expect("Failed to insert user.");

	assert!(db.ensure_tag("Docker").await.expect("Failed to create tag."));
	assert!(!db.ensure_tag("Docker").await.expect("Failed to re-read tag."));

	db.grant_tag("Docker", "alice").await.expect("Failed to grant tag.");
	db.grant_tag("Docker", "alice").await.expect("Granting twice should be a no-op.");

	let user = db.find_user("alice").await.expect("Failed to load user.").expect("User exists.");

	assert!(user.has_perm(CREATE_NOTES));
	assert_eq!(db.user_tags("alice").await.expect("Failed to list tags."), vec!["Docker"]);
	assert_eq!(db.all_tags().await.expect("Failed to list tags."), vec!["Docker"]);
	assert!(db.find_user("bob").await.expect("Failed to query user.").is_none());

	drop(db);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
