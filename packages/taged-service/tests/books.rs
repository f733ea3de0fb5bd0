use std::sync::Arc;

use serde_json::json;

use taged_service::{Error, ListBooksRequest, NewBook, TagedService};
use taged_storage::{
	cache::MemoryCache,
	models::{CREATE_NOTES, MANAGE_BOOKS, User},
};
use taged_testkit::{FakeSearchEngine, MemoryTagStore};

fn service() -> (TagedService, Arc<FakeSearchEngine>) {
	let engine = Arc::new(FakeSearchEngine::new());
	let service = TagedService::new(
		taged_testkit::sample_config(),
		engine.clone(),
		Arc::new(MemoryCache::new()),
		Arc::new(MemoryTagStore::new()),
	);

	(service, engine)
}

fn shelve(engine: &FakeSearchEngine, id: &str, title: &str, year: &str, published_at: &str) {
	engine.insert(
		"books",
		id,
		json!({
			"title": title,
			"author": "Anon",
			"year": year,
			"about": format!("<p>About {title}</p>"),
			"published_at": published_at,
		}),
	);
}

#[tokio::test]
async fn added_books_can_be_fetched_and_deleted() {
	let (service, _) = service();
	let book = service
		.add_book(&User::superuser("root"), NewBook {
			title: " Programming Rust ".to_string(),
			author: "Blandy".to_string(),
			year: "2021".to_string(),
			about: "Systems programming.".to_string(),
		})
		.await
		.expect("Failed to add book.");

	assert_eq!(book.title, "Programming Rust");
	assert!(book.published_at.is_some());

	let fetched = service.get_book(&book.id).await.expect("Failed to fetch book.");

	assert_eq!(fetched.author, "Blandy");
	assert_eq!(fetched.year, "2021");

	let deleted =
		service.delete_book(&User::superuser("root"), &book.id).await.expect("Failed to delete book.");

	assert!(deleted.deleted);
	assert!(matches!(service.get_book(&book.id).await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn blank_titles_are_rejected() {
	let (service, engine) = service();

	assert!(matches!(
		service
			.add_book(&User::superuser("root"), NewBook { title: "  ".to_string(), ..Default::default() })
			.await,
		Err(Error::InvalidRequest { .. })
	));
	assert_eq!(engine.index_calls(), 0);
}

#[tokio::test]
async fn listing_is_newest_first_and_paged() {
	let (service, engine) = service();

	shelve(&engine, "a", "Dune", "1965", "2024-01-01T00:00:00Z");
	shelve(&engine, "b", "Solaris", "1961", "2024-03-01T00:00:00Z");
	shelve(&engine, "c", "Roadside Picnic", "1972", "2024-02-01T00:00:00Z");

	let first = service.list_books(ListBooksRequest::default()).await.expect("List.");
	let ids = first.records.iter().map(|record| record.book.id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, vec!["b", "c"]);
	assert_eq!(first.paginator.max_pages, 2);
	assert!(first.paginator.has_next);

	let second = service
		.list_books(ListBooksRequest { page: "9".to_string(), ..Default::default() })
		.await
		.expect("List.");

	assert_eq!(second.paginator.current_page, 2);
	assert_eq!(second.records.len(), 1);
	assert_eq!(second.records[0].book.id, "a");
}

#[tokio::test]
async fn search_prefers_title_matches_and_year_filters() {
	let (service, engine) = service();

	shelve(&engine, "a", "Solaris", "1961", "2024-01-01T00:00:00Z");
	engine.insert(
		"books",
		"b",
		json!({
			"title": "Lem",
			"author": "Solaris Press",
			"year": "1970",
			"about": "",
			"published_at": "2024-02-01T00:00:00Z",
		}),
	);

	let found = service
		.list_books(ListBooksRequest { search: "solaris".to_string(), ..Default::default() })
		.await
		.expect("Search.");

	assert_eq!(found.records.len(), 2);
	assert_eq!(found.records[0].book.id, "a");
	assert_eq!(found.records[0].score, 1.0);
	assert!(found.records[1].score < 1.0);

	let by_year = service
		.list_books(ListBooksRequest { year: "1970".to_string(), ..Default::default() })
		.await
		.expect("Filter.");

	assert_eq!(by_year.records.len(), 1);
	assert_eq!(by_year.records[0].book.title, "Lem");

	let none = service
		.list_books(ListBooksRequest {
			search: "solaris".to_string(),
			year: "1999".to_string(),
			..Default::default()
		})
		.await
		.expect("Filter.");

	assert!(none.records.is_empty());
	assert_eq!(none.paginator.total_records, 0);
}

#[tokio::test]
async fn only_book_managers_may_write() {
	let (service, engine) = service();
	let writer = User::new("alice").with_perm(CREATE_NOTES);
	let librarian = User::new("librarian").with_perm(MANAGE_BOOKS);
	let book = NewBook { title: "Solaris".to_string(), ..Default::default() };

	shelve(&engine, "a", "Dune", "1965", "2024-01-01T00:00:00Z");

	assert!(matches!(
		service.add_book(&writer, book.clone()).await,
		Err(Error::PermissionDenied { .. })
	));
	assert!(matches!(
		service.update_book(&writer, "a", book.clone()).await,
		Err(Error::PermissionDenied { .. })
	));
	assert!(matches!(service.delete_book(&writer, "a").await, Err(Error::PermissionDenied { .. })));
	assert_eq!(engine.index_calls(), 0);
	assert_eq!(engine.update_calls(), 0);
	assert_eq!(engine.delete_calls(), 0);

	service.add_book(&librarian, book).await.expect("Librarians may add books.");
}

#[tokio::test]
async fn updates_rewrite_fields_and_refresh_the_timestamp() {
	let (service, engine) = service();
	let root = User::superuser("root");

	shelve(&engine, "a", "Dune", "1965", "2024-01-01T00:00:00Z");

	let stored = service.get_book("a").await.expect("Get.");
	let updated = service
		.update_book(&root, "a", NewBook {
			title: "Dune Messiah".to_string(),
			author: " Herbert ".to_string(),
			year: "1969".to_string(),
			about: String::new(),
		})
		.await
		.expect("Update.");

	assert_eq!(updated.id, "a");
	assert_eq!(updated.author, "Herbert");
	assert!(updated.published_at > stored.published_at);

	let sent = engine.updates().pop().expect("An update was sent.");

	assert_eq!(sent.partial["title"], json!("Dune Messiah"));
	assert_eq!(sent.partial["year"], json!("1969"));
	assert_eq!(service.get_book("a").await.expect("Get.").title, "Dune Messiah");

	assert!(matches!(
		service.update_book(&root, "missing", NewBook { title: "x".to_string(), ..Default::default() }).await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(service.delete_book(&root, "missing").await, Err(Error::NotFound { .. })));
}
