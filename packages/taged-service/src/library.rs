use serde::{Deserialize, Serialize};

use taged_storage::models::{MANAGE_BOOKS, User};

use crate::{
	DeleteResponse, Error, Result, TagedService,
	books::{Book, BookRecord, BooksFilter, NewBook},
	list::PageInfo,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListBooksRequest {
	#[serde(default)]
	pub search: String,
	#[serde(default)]
	pub year: String,
	#[serde(default)]
	pub page: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BooksPage {
	pub records: Vec<BookRecord>,
	pub paginator: PageInfo,
}

impl TagedService {
	pub async fn list_books(&self, req: ListBooksRequest) -> Result<BooksPage> {
		let filter = BooksFilter {
			search: req.search.trim().to_string(),
			year: req.year.trim().to_string(),
			match_all: true,
			..Default::default()
		};
		let mut pager = self.books.filter(filter).await?;
		let records = pager.get_page(req.page.as_str()).await?;

		Ok(BooksPage { records, paginator: PageInfo::from_paginator(&pager) })
	}

	pub async fn add_book(&self, user: &User, new: NewBook) -> Result<Book> {
		self.require_perm(user, MANAGE_BOOKS)?;

		let new = validate_book(new)?;
		let book = self.books.create(new).await?;

		tracing::info!(book_id = %book.id, username = %user.username, "Book created.");

		Ok(book)
	}

	/// Replaces the title, author, year and description of a stored book.
	pub async fn update_book(&self, user: &User, id: &str, input: NewBook) -> Result<Book> {
		self.require_perm(user, MANAGE_BOOKS)?;

		let input = validate_book(input)?;
		let stored = self.books.get(id).await?;
		let book = self
			.books
			.update(&Book {
				title: input.title,
				author: input.author,
				year: input.year,
				about: input.about,
				..stored
			})
			.await?;

		tracing::info!(book_id = %book.id, username = %user.username, "Book updated.");

		Ok(book)
	}

	pub async fn get_book(&self, id: &str) -> Result<Book> {
		self.books.get(id).await
	}

	pub async fn delete_book(&self, user: &User, id: &str) -> Result<DeleteResponse> {
		self.require_perm(user, MANAGE_BOOKS)?;
		self.books.get(id).await?;

		let deleted = self.books.delete(id).await?;

		if deleted {
			tracing::info!(book_id = id, username = %user.username, "Book deleted.");
		}

		Ok(DeleteResponse { id: id.to_string(), deleted })
	}
}

fn validate_book(new: NewBook) -> Result<NewBook> {
	let title = new.title.trim();

	if title.is_empty() {
		return Err(Error::InvalidRequest { message: "title must be non-empty.".to_string() });
	}

	Ok(NewBook {
		title: title.to_string(),
		author: new.author.trim().to_string(),
		year: new.year.trim().to_string(),
		about: new.about,
	})
}
