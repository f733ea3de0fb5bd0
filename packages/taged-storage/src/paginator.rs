//! Count-once pagination over a `QueryDescriptor`.

use std::sync::Arc;

use crate::{
	Error, Result,
	client::{Hit, SearchClient, SearchHits},
	query::QueryDescriptor,
};

/// Tag constraints handed to converters for client-side re-validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterContext {
	pub tags_in: Vec<String>,
	pub tags_off: Vec<String>,
}

/// Turns raw hits into records of one document type.
pub type Converter<T> = fn(SearchHits, &FilterContext) -> Vec<T>;

/// Anything a caller may pass as a page number. Unparsable input yields `None`.
pub trait PageNumber {
	fn page_number(&self) -> Option<i64>;
}
impl PageNumber for i64 {
	fn page_number(&self) -> Option<i64> {
		Some(*self)
	}
}
impl PageNumber for u64 {
	fn page_number(&self) -> Option<i64> {
		i64::try_from(*self).ok().or(Some(i64::MAX))
	}
}
impl PageNumber for i32 {
	fn page_number(&self) -> Option<i64> {
		Some(i64::from(*self))
	}
}
impl PageNumber for str {
	fn page_number(&self) -> Option<i64> {
		self.trim().parse().ok()
	}
}
impl PageNumber for String {
	fn page_number(&self) -> Option<i64> {
		self.as_str().page_number()
	}
}
impl<T> PageNumber for &T
where
	T: PageNumber + ?Sized,
{
	fn page_number(&self) -> Option<i64> {
		(**self).page_number()
	}
}

/// Counts documents; an empty query counts zero without touching the engine.
pub async fn count(client: &dyn SearchClient, descriptor: &QueryDescriptor) -> Result<u64> {
	if descriptor.is_empty() {
		return Ok(0);
	}

	client.count(&descriptor.index, &descriptor.query_value(), descriptor.timeout).await
}

pub async fn search(
	client: &dyn SearchClient,
	descriptor: &QueryDescriptor,
	offset: u64,
	limit: u64,
) -> Result<SearchHits> {
	if descriptor.is_empty() {
		return Ok(SearchHits::default());
	}

	let request = descriptor.search_request(offset, limit);
	let response = client.search(&descriptor.index, &request).await?;

	Ok(response.hits)
}

/// Converter that keeps hits as they are.
pub fn raw_hits(hits: SearchHits, _: &FilterContext) -> Vec<Hit> {
	hits.hits
}

pub struct Paginator<T> {
	client: Arc<dyn SearchClient>,
	descriptor: QueryDescriptor,
	converter: Converter<T>,
	context: FilterContext,
	per_page: u64,
	count: u64,
	max_pages: u64,
	page: u64,
}
impl<T> Paginator<T> {
	/// Runs the count query once; pages are fetched lazily by `get_page`.
	pub async fn new(
		client: Arc<dyn SearchClient>,
		descriptor: QueryDescriptor,
		per_page: u64,
		converter: Converter<T>,
		context: FilterContext,
	) -> Result<Self> {
		if per_page == 0 {
			return Err(Error::InvalidArgument("per_page must be greater than zero.".to_string()));
		}

		let count = count(client.as_ref(), &descriptor).await?;
		let max_pages = count.div_ceil(per_page);

		Ok(Self { client, descriptor, converter, context, per_page, count, max_pages, page: 1 })
	}

	pub fn count(&self) -> u64 {
		self.count
	}

	pub fn max_pages(&self) -> u64 {
		self.max_pages
	}

	pub fn per_page(&self) -> u64 {
		self.per_page
	}

	/// The page most recently requested through `get_page`.
	pub fn page(&self) -> u64 {
		self.page
	}

	pub fn has_previous(&self) -> bool {
		self.page > 1
	}

	pub fn has_next(&self) -> bool {
		self.page < self.max_pages
	}

	pub fn descriptor(&self) -> &QueryDescriptor {
		&self.descriptor
	}

	/// Clamps any input into `[1, max_pages]`; with no results every page is the first.
	pub fn validate_number<P>(&self, page: P) -> u64
	where
		P: PageNumber,
	{
		let Some(number) = page.page_number() else {
			return 1;
		};

		if number <= 0 || self.max_pages == 0 {
			return 1;
		}

		(number as u64).min(self.max_pages)
	}

	pub async fn get_page<P>(&mut self, page: P) -> Result<Vec<T>>
	where
		P: PageNumber,
	{
		self.page = self.validate_number(page);

		if self.count == 0 {
			return Ok(Vec::new());
		}

		let offset = (self.page - 1) * self.per_page;
		let hits = search(self.client.as_ref(), &self.descriptor, offset, self.per_page).await?;

		Ok((self.converter)(hits, &self.context))
	}
}
