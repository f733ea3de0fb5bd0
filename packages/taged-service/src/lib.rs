pub mod access;
pub mod add_note;
pub mod books;
pub mod delete;
pub mod drafts;
pub mod library;
pub mod links;
pub mod list;
pub mod notes;
pub mod records;
pub mod time_serde;
pub mod update;

mod error;

pub use add_note::NoteInput;
pub use books::{Book, BookField, BookRecord, BooksFilter, BooksRepository, NewBook};
pub use delete::DeleteResponse;
pub use drafts::{Draft, DraftInput, DraftSummary};
pub use error::{Error, Result};
pub use library::{BooksPage, ListBooksRequest};
pub use links::TempLink;
pub use list::{ListNotesRequest, NotesPage, PageInfo, TagUsage};
pub use notes::{NewNote, Note, NoteField, NotesFilter, NotesRepository};
pub use records::NoteRecord;
pub use update::NotePatch;

use std::sync::Arc;

use taged_config::Config;
use taged_storage::{
	cache::{CacheStore, CacheVersion},
	client::SearchClient,
	index,
	tags::TagStore,
};

/// Version counter shared by every cached first page of the notes listing.
pub const NOTES_VERSION: &str = "notes";
/// Version counter shared by every cached per-user notes count.
pub const NOTES_COUNT_VERSION: &str = "notesCount";

pub struct TagedService {
	pub cfg: Config,
	pub search: Arc<dyn SearchClient>,
	pub cache: Arc<dyn CacheStore>,
	pub tags: Arc<dyn TagStore>,
	pub notes: NotesRepository,
	pub books: BooksRepository,
}
impl TagedService {
	pub fn new(
		cfg: Config,
		search: Arc<dyn SearchClient>,
		cache: Arc<dyn CacheStore>,
		tags: Arc<dyn TagStore>,
	) -> Self {
		let notes = NotesRepository::new(search.clone(), &cfg.search);
		let books = BooksRepository::new(search.clone(), &cfg.search);

		Self { cfg, search, cache, tags, notes, books }
	}

	/// Creates the notes and books indexes when they are missing.
	pub async fn register_indexes(&self) -> Result<()> {
		for definition in [
			index::notes_index(&self.cfg.search.notes_index)?,
			index::books_index(&self.cfg.search.books_index)?,
		] {
			index::register(self.search.as_ref(), &definition).await?;
		}

		Ok(())
	}

	/// Orphans cached entries rendered with the current versions. Failures only cost staleness.
	pub(crate) async fn bump_versions(&self, names: &[&str]) {
		for name in names {
			if let Err(err) = CacheVersion::new(*name).increment_version(self.cache.as_ref()).await {
				tracing::warn!(version = name, error = %err, "Failed to bump cache version.");
			}
		}
	}
}
