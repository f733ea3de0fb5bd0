use std::sync::Arc;

use serde_json::json;

use taged_service::{Error, ListNotesRequest, NoteInput, NotePatch, TagedService};
use taged_storage::{
	cache::MemoryCache,
	models::{CREATE_NOTES, DELETE_NOTES, UPDATE_NOTES, User},
};
use taged_testkit::{FakeSearchEngine, MemoryTagStore};

struct Harness {
	service: TagedService,
	engine: Arc<FakeSearchEngine>,
	tags: Arc<MemoryTagStore>,
}

fn writer(name: &str) -> User {
	User::new(name).with_perm(CREATE_NOTES).with_perm(UPDATE_NOTES).with_perm(DELETE_NOTES)
}

fn harness() -> Harness {
	let mut cfg = taged_testkit::sample_config();

	cfg.search.per_page = 24;

	let engine = Arc::new(FakeSearchEngine::new());
	let tags = Arc::new(
		MemoryTagStore::new()
			.with_user(writer("alice"))
			.with_user(writer("bob"))
			.with_user(User::new("reader"))
			.with_user(User::superuser("root")),
	);
	let service =
		TagedService::new(cfg, engine.clone(), Arc::new(MemoryCache::new()), tags.clone());

	Harness { service, engine, tags }
}

fn input(title: &str, tags: &[&str], content: &str) -> NoteInput {
	NoteInput {
		title: title.to_string(),
		content: content.to_string(),
		tags: tags.iter().map(|tag| tag.to_string()).collect(),
	}
}

async fn user(h: &Harness, name: &str) -> User {
	h.service.resolve_user(name).await.expect("Known user.")
}

#[tokio::test]
async fn create_derives_preview_and_registers_tags() {
	let h = harness();
	let alice = user(&h, "alice").await;
	let note = h
		.service
		.create_note(
			&alice,
			input(" Docker ", &["Docker", " Docker"], r#"<p><img src="/media/a.png"></p>"#),
		)
		.await
		.expect("Failed to create note.");

	assert_eq!(note.title, "Docker");
	assert_eq!(note.tags, vec!["Docker".to_string()]);
	assert_eq!(note.preview_image.as_deref(), Some("/media/a.png"));
	assert_eq!(h.service.available_tags(&alice).await.expect("Tags."), vec!["Docker"]);
}

#[tokio::test]
async fn missing_permissions_are_rejected() {
	let h = harness();
	let reader = user(&h, "reader").await;

	assert!(matches!(
		h.service.create_note(&reader, input("x", &[], "")).await,
		Err(Error::PermissionDenied { .. })
	));
	assert!(matches!(h.service.resolve_user("ghost").await, Err(Error::PermissionDenied { .. })));
	assert_eq!(h.engine.index_calls(), 0);
}

#[tokio::test]
async fn existing_tags_are_not_granted_to_other_users() {
	let h = harness();
	let alice = user(&h, "alice").await;
	let bob = user(&h, "bob").await;

	h.service.create_note(&alice, input("a", &["Secret"], "")).await.expect("Create.");
	h.service.create_note(&bob, input("b", &["Secret", "Shared"], "")).await.expect("Create.");

	assert_eq!(h.service.available_tags(&bob).await.expect("Tags."), vec!["Shared"]);
	assert_eq!(h.service.unavailable_tags(&bob).await.expect("Tags."), vec!["Secret"]);
	assert!(h.service.unavailable_tags(&user(&h, "root").await).await.expect("Tags.").is_empty());
}

#[tokio::test]
async fn hidden_notes_look_missing() {
	let h = harness();
	let alice = user(&h, "alice").await;
	let bob = user(&h, "bob").await;
	let secret = h
		.service
		.create_note(&alice, input("Docker secret", &["Secret"], ""))
		.await
		.expect("Create.");

	h.service.create_note(&alice, input("Docker public", &[], "")).await.expect("Create.");

	assert!(matches!(
		h.service.get_note_for_user(&secret.id, &bob, None).await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(
		h.service.delete_note(&bob, &secret.id).await,
		Err(Error::NotFound { .. })
	));

	let page = h.service.list_notes(&bob, ListNotesRequest::default()).await.expect("List.");

	assert_eq!(page.records.len(), 1);
	assert_eq!(page.records[0].title.as_deref(), Some("Docker public"));
	assert_eq!(h.service.notes_count(&bob).await.expect("Count."), 1);
	assert_eq!(
		h.service.note_titles(&bob, "docker").await.expect("Titles."),
		vec!["Docker public".to_string()]
	);

	let root = user(&h, "root").await;

	assert_eq!(h.service.notes_count(&root).await.expect("Count."), 2);
	assert!(h.service.get_note_for_user(&secret.id, &root, None).await.is_ok());
}

#[tokio::test]
async fn update_sends_only_changed_fields() {
	let h = harness();
	let alice = user(&h, "alice").await;
	let note = h
		.service
		.create_note(&alice, input("Docker", &["Docker"], "<p>x</p>"))
		.await
		.expect("Create.");
	let updated = h
		.service
		.update_note(&alice, &note.id, NotePatch {
			title: Some("Docker Swarm".to_string()),
			content: Some("<p>x</p>".to_string()),
			tags: Some(vec!["Docker".to_string()]),
		})
		.await
		.expect("Update.");
	let sent = h.engine.updates().pop().expect("An update was sent.");
	let mut keys = sent.partial.keys().cloned().collect::<Vec<_>>();

	keys.sort();

	assert_eq!(keys, vec!["published_at".to_string(), "title".to_string()]);
	assert_eq!(updated.title, "Docker Swarm");
	assert_eq!(updated.content, "<p>x</p>");
	assert!(updated.published_at >= note.published_at);
	assert_eq!(sent.partial["title"], json!("Docker Swarm"));
}

#[tokio::test]
async fn update_with_new_tags_grants_them() {
	let h = harness();
	let alice = user(&h, "alice").await;
	let note = h.service.create_note(&alice, input("a", &[], "")).await.expect("Create.");

	h.service
		.update_note(&alice, &note.id, NotePatch {
			tags: Some(vec!["Rust".to_string()]),
			..Default::default()
		})
		.await
		.expect("Update.");

	assert_eq!(h.tags.tag_names(), vec!["Rust".to_string()]);
	assert_eq!(h.service.available_tags(&alice).await.expect("Tags."), vec!["Rust"]);
}

#[tokio::test]
async fn first_page_and_counts_are_cached_until_versions_change() {
	let h = harness();
	let alice = user(&h, "alice").await;

	let first = h.service.create_note(&alice, input("first", &[], "")).await.expect("Create.");
	let listed = h.service.list_notes(&alice, ListNotesRequest::default()).await.expect("List.");

	assert_eq!(listed.records.len(), 1);
	assert_eq!(h.service.notes_count(&alice).await.expect("Count."), 1);

	// Written behind the service's back, so no version moves.
	h.engine.insert("notes", "raw", json!({ "title": "raw", "tags": [], "published_at": "2000-01-01T00:00:00Z" }));

	let cached = h.service.list_notes(&alice, ListNotesRequest::default()).await.expect("List.");

	assert_eq!(cached.records, listed.records);
	assert_eq!(h.service.notes_count(&alice).await.expect("Count."), 1);

	let searched = h
		.service
		.list_notes(&alice, ListNotesRequest { search: "raw".to_string(), ..Default::default() })
		.await
		.expect("List.");

	assert_eq!(searched.records.len(), 1);

	// Updates refresh listings but leave counts alone.
	h.service
		.update_note(&alice, &first.id, NotePatch {
			title: Some("first!".to_string()),
			..Default::default()
		})
		.await
		.expect("Update.");

	let refreshed = h.service.list_notes(&alice, ListNotesRequest::default()).await.expect("List.");

	assert_eq!(refreshed.records.len(), 2);
	assert_eq!(h.service.notes_count(&alice).await.expect("Count."), 1);

	let deleted = h.service.delete_note(&alice, &first.id).await.expect("Delete.");

	assert!(deleted.deleted);
	assert_eq!(deleted.id, first.id);
	assert_eq!(h.service.notes_count(&alice).await.expect("Count."), 1);

	let after_delete =
		h.service.list_notes(&alice, ListNotesRequest::default()).await.expect("List.");

	assert_eq!(after_delete.records.len(), 1);
	assert_eq!(after_delete.records[0].id, "raw");
}

#[tokio::test]
async fn pages_report_navigation() {
	let h = harness();
	let alice = user(&h, "alice").await;

	for i in 0..30 {
		h.engine.insert(
			"notes",
			&format!("n{i:02}"),
			json!({ "title": format!("note {i}"), "tags": [], "published_at": format!("2024-01-01T00:00:{i:02}Z") }),
		);
	}

	let second = h
		.service
		.list_notes(&alice, ListNotesRequest { page: "2".to_string(), ..Default::default() })
		.await
		.expect("List.");

	assert_eq!(second.paginator.current_page, 2);
	assert_eq!(second.paginator.max_pages, 2);
	assert_eq!(second.paginator.total_records, 30);
	assert!(second.paginator.has_previous);
	assert!(!second.paginator.has_next);
	assert_eq!(second.records.len(), 6);

	let clamped = h
		.service
		.list_notes(&alice, ListNotesRequest { page: "abc".to_string(), ..Default::default() })
		.await
		.expect("List.");

	assert_eq!(clamped.paginator.current_page, 1);
	assert_eq!(clamped.records[0].id, "n29");
}

#[tokio::test]
async fn keyboard_layout_search_finds_mistyped_queries() {
	let mut h = harness();
	let alice = user(&h, "alice").await;

	h.service.cfg.search.translate_layout = true;
	h.service.create_note(&alice, input("докер", &[], "")).await.expect("Create.");

	let found = h
		.service
		.list_notes(&alice, ListNotesRequest { search: "ljrth".to_string(), ..Default::default() })
		.await
		.expect("List.");

	assert_eq!(found.records.len(), 1);
}

#[tokio::test]
async fn engine_outages_surface_as_unavailable() {
	let h = harness();
	let alice = user(&h, "alice").await;

	h.engine.set_offline(true);

	assert!(matches!(
		h.service.list_notes(&alice, ListNotesRequest::default()).await,
		Err(Error::Unavailable { .. })
	));
}

#[tokio::test]
async fn writes_during_an_outage_are_repository_errors() {
	let h = harness();
	let alice = user(&h, "alice").await;
	let note = h.service.create_note(&alice, input("kept", &[], "")).await.expect("Create.");

	h.engine.set_offline(true);

	assert!(matches!(
		h.service.create_note(&alice, input("lost", &["Offline"], "")).await,
		Err(Error::Repository { .. })
	));
	assert!(h.tags.tag_names().is_empty());

	h.engine.set_offline(false);

	let stored = h.service.get_note_for_user(&note.id, &alice, None).await.expect("Get.");

	h.engine.set_offline(true);

	assert!(matches!(
		h.service.notes.update(&stored, &[taged_service::NoteField::Title]).await,
		Err(Error::Repository { .. })
	));
	assert!(matches!(h.service.notes.delete(&note.id).await, Err(Error::Repository { .. })));
}

#[tokio::test]
async fn deleting_a_missing_note_reports_not_found() {
	let h = harness();
	let alice = user(&h, "alice").await;

	assert!(matches!(
		h.service.delete_note(&alice, "does-not-exist").await,
		Err(Error::NotFound { .. })
	));
	assert_eq!(h.engine.delete_calls(), 0);
}

#[tokio::test]
async fn temporary_links_expose_visible_notes_only() {
	let h = harness();
	let alice = user(&h, "alice").await;
	let bob = user(&h, "bob").await;
	let secret =
		h.service.create_note(&alice, input("Secret", &["Secret"], "")).await.expect("Create.");
	let link = h.service.create_temp_link(&alice, &secret.id, 30).await.expect("Link.");

	assert!(link.path.ends_with(&link.token));

	let shared = h.service.note_from_temp_link(&link.token).await.expect("Follow link.");

	assert_eq!(shared.id, secret.id);
	assert!(matches!(
		h.service.create_temp_link(&bob, &secret.id, 30).await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(
		h.service.create_temp_link(&alice, &secret.id, 0).await,
		Err(Error::InvalidRequest { .. })
	));
	assert!(matches!(
		h.service.create_temp_link(&alice, &secret.id, 61).await,
		Err(Error::InvalidRequest { .. })
	));
	assert!(matches!(
		h.service.note_from_temp_link("garbage").await,
		Err(Error::InvalidRequest { .. })
	));
}

#[tokio::test]
async fn temporary_links_require_a_signing_key() {
	let mut h = harness();
	let alice = user(&h, "alice").await;
	let note = h.service.create_note(&alice, input("n", &[], "")).await.expect("Create.");

	h.service.cfg.links.signing_key = None;

	assert!(matches!(
		h.service.create_temp_link(&alice, &note.id, 5).await,
		Err(Error::InvalidRequest { .. })
	));
}
