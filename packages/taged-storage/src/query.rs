use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::client::SearchRequest;

pub fn match_all() -> Value {
	json!({ "match_all": {} })
}

pub fn match_text(field: &str, text: &str) -> Value {
	json!({ "match": { field: text } })
}

/// A `match` with automatic edit-distance fuzziness.
pub fn fuzzy_match(field: &str, text: &str, boost: Option<f64>) -> Value {
	let mut inner = Map::new();

	inner.insert("query".to_string(), Value::from(text));
	inner.insert("fuzziness".to_string(), Value::from("auto"));

	if let Some(boost) = boost {
		inner.insert("boost".to_string(), Value::from(boost));
	}

	json!({ "match": { field: inner } })
}

pub fn term(field: &str, value: &str) -> Value {
	json!({ "term": { field: value } })
}

pub fn simple_query_string(query: &str, fields: &[&str]) -> Value {
	json!({ "simple_query_string": { "query": query, "fields": fields } })
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolQuery {
	pub must: Vec<Value>,
	pub should: Vec<Value>,
	pub must_not: Vec<Value>,
	pub filter: Vec<Value>,
	pub minimum_should_match: Option<u32>,
}
impl BoolQuery {
	pub fn is_empty(&self) -> bool {
		self.must.is_empty()
			&& self.should.is_empty()
			&& self.must_not.is_empty()
			&& self.filter.is_empty()
	}

	pub fn to_value(&self) -> Value {
		let mut clauses = Map::new();

		for (name, list) in [
			("must", &self.must),
			("should", &self.should),
			("must_not", &self.must_not),
			("filter", &self.filter),
		] {
			if !list.is_empty() {
				clauses.insert(name.to_string(), Value::Array(list.clone()));
			}
		}

		if let Some(minimum) = self.minimum_should_match
			&& !self.should.is_empty()
		{
			clauses.insert("minimum_should_match".to_string(), Value::from(minimum));
		}

		json!({ "bool": clauses })
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
	Asc,
	#[default]
	Desc,
}
impl SortOrder {
	pub fn from_desc(desc: bool) -> Self {
		if desc { Self::Desc } else { Self::Asc }
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
	pub field: String,
	pub order: SortOrder,
}
impl Sort {
	pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
		Self { field: field.into(), order }
	}

	pub fn to_value(&self) -> Value {
		json!({ self.field.as_str(): { "order": self.order.as_str() } })
	}
}

/// Everything needed to count and page through one search.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDescriptor {
	pub index: String,
	/// Source fields returned with each hit; empty means all of them.
	pub fields: Vec<String>,
	pub query: BoolQuery,
	pub sort: Option<Sort>,
	pub timeout: Duration,
}
impl QueryDescriptor {
	pub fn new(index: impl Into<String>, timeout: Duration) -> Self {
		Self {
			index: index.into(),
			fields: Vec::new(),
			query: BoolQuery::default(),
			sort: None,
			timeout,
		}
	}

	/// An empty descriptor matches nothing and is never sent to the engine.
	pub fn is_empty(&self) -> bool {
		self.query.is_empty()
	}

	pub fn query_value(&self) -> Value {
		self.query.to_value()
	}

	pub fn search_request(&self, from: u64, size: u64) -> SearchRequest {
		SearchRequest {
			query: self.query_value(),
			source: self.fields.clone(),
			sort: self.sort.iter().map(Sort::to_value).collect(),
			from,
			size,
			timeout: self.timeout,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_bool_query_renders_no_clauses() {
		let query = BoolQuery { minimum_should_match: Some(1), ..Default::default() };

		assert!(query.is_empty());
		assert_eq!(query.to_value(), json!({ "bool": {} }));
	}

	#[test]
	fn search_request_serializes_engine_body() {
		let mut descriptor = QueryDescriptor::new("notes", Duration::from_secs(5));

		descriptor.fields = vec!["title".to_string(), "tags".to_string()];
		descriptor.query.must.push(match_text("tags", "Docker"));
		descriptor.sort = Some(Sort::new("published_at", SortOrder::Desc));

		let body = serde_json::to_value(descriptor.search_request(24, 24))
			.expect("Search request should serialize.");

		assert_eq!(
			body,
			json!({
				"query": { "bool": { "must": [{ "match": { "tags": "Docker" } }] } },
				"_source": ["title", "tags"],
				"sort": [{ "published_at": { "order": "desc" } }],
				"from": 24,
				"size": 24,
			})
		);
	}

	#[test]
	fn fuzzy_match_carries_boost() {
		assert_eq!(
			fuzzy_match("title", "dokcer", Some(2.0)),
			json!({ "match": { "title": { "query": "dokcer", "fuzziness": "auto", "boost": 2.0 } } })
		);
	}
}
