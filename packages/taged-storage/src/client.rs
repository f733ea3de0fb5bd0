//! The narrow search-engine contract the repositories are written against.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BoxFuture, Result};

pub type Source = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateIndex {
	Created,
	AlreadyExists,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shards {
	#[serde(default)]
	pub total: u64,
	#[serde(default)]
	pub successful: u64,
	#[serde(default)]
	pub failed: u64,
}

/// Response to index, update and delete calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteResponse {
	#[serde(rename = "_id")]
	pub id: String,
	#[serde(default)]
	pub result: String,
	#[serde(rename = "_shards", default)]
	pub shards: Shards,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
	#[serde(rename = "_id")]
	pub id: String,
	#[serde(default)]
	pub found: bool,
	#[serde(rename = "_source", default)]
	pub source: Source,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
	#[serde(rename = "_id")]
	pub id: String,
	#[serde(rename = "_score", default)]
	pub score: Option<f64>,
	#[serde(rename = "_source", default)]
	pub source: Source,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HitsTotal {
	pub value: u64,
	#[serde(default)]
	pub relation: TotalRelation,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalRelation {
	#[default]
	Eq,
	Gte,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
	#[serde(default)]
	pub total: Option<HitsTotal>,
	#[serde(default)]
	pub max_score: Option<f64>,
	#[serde(default)]
	pub hits: Vec<Hit>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	pub hits: SearchHits,
}

/// Body of a search call. The timeout travels beside the body, not inside it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchRequest {
	pub query: Value,
	#[serde(rename = "_source", skip_serializing_if = "Vec::is_empty")]
	pub source: Vec<String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub sort: Vec<Value>,
	pub from: u64,
	pub size: u64,
	#[serde(skip)]
	pub timeout: Duration,
}

pub trait SearchClient
where
	Self: Send + Sync,
{
	fn ping<'a>(&'a self) -> BoxFuture<'a, Result<bool>>;

	fn create_index<'a>(
		&'a self,
		index: &'a str,
		body: &'a Value,
	) -> BoxFuture<'a, Result<CreateIndex>>;

	/// Fails with `Error::NotFound` when the document or the index is absent.
	fn get<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
		fields: Option<&'a [String]>,
		timeout: Duration,
	) -> BoxFuture<'a, Result<GetResponse>>;

	/// Stores a full document, letting the engine assign the id when `id` is `None`.
	fn index<'a>(
		&'a self,
		index: &'a str,
		id: Option<&'a str>,
		document: &'a Source,
		timeout: Duration,
	) -> BoxFuture<'a, Result<WriteResponse>>;

	fn update<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
		partial: &'a Source,
		timeout: Duration,
	) -> BoxFuture<'a, Result<WriteResponse>>;

	/// A missing document is reported through the response, not as an error.
	fn delete<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
		timeout: Duration,
	) -> BoxFuture<'a, Result<WriteResponse>>;

	fn count<'a>(
		&'a self,
		index: &'a str,
		query: &'a Value,
		timeout: Duration,
	) -> BoxFuture<'a, Result<u64>>;

	fn search<'a>(
		&'a self,
		index: &'a str,
		request: &'a SearchRequest,
	) -> BoxFuture<'a, Result<SearchResponse>>;
}
