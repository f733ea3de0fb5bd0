//! An in-memory search engine that understands the query shapes the workspace emits.

use std::{
	cmp::Ordering,
	collections::{BTreeMap, HashMap},
	sync::{
		Mutex, MutexGuard,
		atomic::{AtomicUsize, Ordering as AtomicOrdering},
	},
	time::Duration,
};

use serde_json::Value;
use taged_storage::{
	BoxFuture, Error, Result,
	client::{
		CreateIndex, GetResponse, Hit, HitsTotal, SearchClient, SearchHits, SearchRequest,
		SearchResponse, Shards, Source, TotalRelation, WriteResponse,
	},
};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedUpdate {
	pub index: String,
	pub id: String,
	pub partial: Source,
}

#[derive(Default)]
struct StoredDoc {
	seq: u64,
	source: Source,
}

#[derive(Default)]
struct FakeIndex {
	body: Option<Value>,
	docs: HashMap<String, StoredDoc>,
}

#[derive(Default)]
struct State {
	indices: BTreeMap<String, FakeIndex>,
	seq: u64,
	offline: bool,
	failed_shards: u64,
	updates: Vec<RecordedUpdate>,
	last_search: Option<Value>,
}

#[derive(Default)]
struct Calls {
	get: AtomicUsize,
	index: AtomicUsize,
	update: AtomicUsize,
	delete: AtomicUsize,
	count: AtomicUsize,
	search: AtomicUsize,
}

#[derive(Default)]
pub struct FakeSearchEngine {
	state: Mutex<State>,
	calls: Calls,
}
impl FakeSearchEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// While offline every call fails as if the engine could not be reached.
	pub fn set_offline(&self, offline: bool) {
		self.lock().offline = offline;
	}

	/// Makes subsequent writes report this many failed shards.
	pub fn set_failed_shards(&self, failed: u64) {
		self.lock().failed_shards = failed;
	}

	/// Stores a raw document, bypassing any repository.
	pub fn insert(&self, index: &str, id: &str, source: Value) {
		let mut state = self.lock();
		let source = match source {
			Value::Object(map) => map,
			_ => Source::new(),
		};

		state.seq += 1;

		let seq = state.seq;

		state
			.indices
			.entry(index.to_string())
			.or_default()
			.docs
			.insert(id.to_string(), StoredDoc { seq, source });
	}

	pub fn document(&self, index: &str, id: &str) -> Option<Source> {
		self.lock().indices.get(index)?.docs.get(id).map(|doc| doc.source.clone())
	}

	pub fn index_body(&self, index: &str) -> Option<Value> {
		self.lock().indices.get(index)?.body.clone()
	}

	pub fn updates(&self) -> Vec<RecordedUpdate> {
		self.lock().updates.clone()
	}

	pub fn last_search(&self) -> Option<Value> {
		self.lock().last_search.clone()
	}

	pub fn get_calls(&self) -> usize {
		self.calls.get.load(AtomicOrdering::SeqCst)
	}

	pub fn index_calls(&self) -> usize {
		self.calls.index.load(AtomicOrdering::SeqCst)
	}

	pub fn update_calls(&self) -> usize {
		self.calls.update.load(AtomicOrdering::SeqCst)
	}

	pub fn delete_calls(&self) -> usize {
		self.calls.delete.load(AtomicOrdering::SeqCst)
	}

	pub fn count_calls(&self) -> usize {
		self.calls.count.load(AtomicOrdering::SeqCst)
	}

	pub fn search_calls(&self) -> usize {
		self.calls.search.load(AtomicOrdering::SeqCst)
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn online(&self) -> Result<MutexGuard<'_, State>> {
		let state = self.lock();

		if state.offline {
			return Err(Error::Unavailable("Fake search engine is offline.".to_string()));
		}

		Ok(state)
	}

	fn get_sync(&self, index: &str, id: &str, fields: Option<&[String]>) -> Result<GetResponse> {
		self.calls.get.fetch_add(1, AtomicOrdering::SeqCst);

		let state = self.online()?;
		let Some(doc) = state.indices.get(index).and_then(|idx| idx.docs.get(id)) else {
			return Err(Error::NotFound(format!("Document {id:?} in index {index:?}.")));
		};
		let source = match fields {
			Some(fields) => project(&doc.source, fields),
			None => doc.source.clone(),
		};

		Ok(GetResponse { id: id.to_string(), found: true, source })
	}

	fn index_sync(&self, index: &str, id: Option<&str>, document: &Source) -> Result<WriteResponse> {
		self.calls.index.fetch_add(1, AtomicOrdering::SeqCst);

		let mut state = self.online()?;
		let id = id.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().simple().to_string());

		state.seq += 1;

		let seq = state.seq;
		let shards = shards(state.failed_shards);
		let previous = state
			.indices
			.entry(index.to_string())
			.or_default()
			.docs
			.insert(id.clone(), StoredDoc { seq, source: document.clone() });
		let result = if previous.is_some() { "updated" } else { "created" };

		Ok(WriteResponse { id, result: result.to_string(), shards })
	}

	fn update_sync(&self, index: &str, id: &str, partial: &Source) -> Result<WriteResponse> {
		self.calls.update.fetch_add(1, AtomicOrdering::SeqCst);

		let mut state = self.online()?;
		let shards = shards(state.failed_shards);

		state.updates.push(RecordedUpdate {
			index: index.to_string(),
			id: id.to_string(),
			partial: partial.clone(),
		});

		let Some(doc) = state.indices.get_mut(index).and_then(|idx| idx.docs.get_mut(id)) else {
			return Err(Error::NotFound(format!("Document {id:?} in index {index:?}.")));
		};

		if shards.failed == 0 {
			for (key, value) in partial {
				doc.source.insert(key.clone(), value.clone());
			}
		}

		Ok(WriteResponse { id: id.to_string(), result: "updated".to_string(), shards })
	}

	fn delete_sync(&self, index: &str, id: &str) -> Result<WriteResponse> {
		self.calls.delete.fetch_add(1, AtomicOrdering::SeqCst);

		let mut state = self.online()?;
		let shards = shards(state.failed_shards);

		if shards.failed > 0 {
			return Ok(WriteResponse { id: id.to_string(), result: "noop".to_string(), shards });
		}

		let removed = state.indices.get_mut(index).and_then(|idx| idx.docs.remove(id));
		let result = if removed.is_some() { "deleted" } else { "not_found" };

		Ok(WriteResponse { id: id.to_string(), result: result.to_string(), shards })
	}

	fn count_sync(&self, index: &str, query: &Value) -> Result<u64> {
		self.calls.count.fetch_add(1, AtomicOrdering::SeqCst);

		let state = self.online()?;
		let Some(idx) = state.indices.get(index) else {
			return Ok(0);
		};

		Ok(idx.docs.values().filter(|doc| evaluate(query, &doc.source).is_some()).count() as u64)
	}

	fn search_sync(&self, index: &str, request: &SearchRequest) -> Result<SearchResponse> {
		self.calls.search.fetch_add(1, AtomicOrdering::SeqCst);

		let mut state = self.online()?;

		state.last_search = serde_json::to_value(request).ok();

		let Some(idx) = state.indices.get(index) else {
			return Ok(SearchResponse::default());
		};
		let mut matched = idx
			.docs
			.iter()
			.filter_map(|(id, doc)| evaluate(&request.query, &doc.source).map(|score| (score, id, doc)))
			.collect::<Vec<_>>();
		let sort = request.sort.first().and_then(sort_spec);

		match &sort {
			Some((field, desc)) => matched.sort_by(|a, b| {
				let ordering = compare_values(a.2.source.get(field), b.2.source.get(field));
				let ordering = if *desc { ordering.reverse() } else { ordering };

				ordering.then(a.2.seq.cmp(&b.2.seq))
			}),
			None => matched.sort_by(|a, b| {
				b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal).then(a.2.seq.cmp(&b.2.seq))
			}),
		}

		let total = matched.len() as u64;
		let scored = sort.is_none();
		let max_score = if scored { matched.iter().map(|(score, ..)| *score).reduce(f64::max) } else { None };
		let hits = matched
			.into_iter()
			.skip(request.from as usize)
			.take(request.size as usize)
			.map(|(score, id, doc)| Hit {
				id: id.clone(),
				score: scored.then_some(score),
				source: if request.source.is_empty() {
					doc.source.clone()
				} else {
					project(&doc.source, &request.source)
				},
			})
			.collect();

		Ok(SearchResponse {
			hits: SearchHits {
				total: Some(HitsTotal { value: total, relation: TotalRelation::Eq }),
				max_score,
				hits,
			},
		})
	}

	fn create_index_sync(&self, index: &str, body: &Value) -> Result<CreateIndex> {
		let mut state = self.online()?;
		let idx = state.indices.entry(index.to_string()).or_default();

		if idx.body.is_some() {
			return Ok(CreateIndex::AlreadyExists);
		}

		idx.body = Some(body.clone());

		Ok(CreateIndex::Created)
	}
}
impl SearchClient for FakeSearchEngine {
	fn ping<'a>(&'a self) -> BoxFuture<'a, Result<bool>> {
		let online = !self.lock().offline;

		Box::pin(async move { Ok(online) })
	}

	fn create_index<'a>(
		&'a self,
		index: &'a str,
		body: &'a Value,
	) -> BoxFuture<'a, Result<CreateIndex>> {
		let result = self.create_index_sync(index, body);

		Box::pin(async move { result })
	}

	fn get<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
		fields: Option<&'a [String]>,
		_: Duration,
	) -> BoxFuture<'a, Result<GetResponse>> {
		let result = self.get_sync(index, id, fields);

		Box::pin(async move { result })
	}

	fn index<'a>(
		&'a self,
		index: &'a str,
		id: Option<&'a str>,
		document: &'a Source,
		_: Duration,
	) -> BoxFuture<'a, Result<WriteResponse>> {
		let result = self.index_sync(index, id, document);

		Box::pin(async move { result })
	}

	fn update<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
		partial: &'a Source,
		_: Duration,
	) -> BoxFuture<'a, Result<WriteResponse>> {
		let result = self.update_sync(index, id, partial);

		Box::pin(async move { result })
	}

	fn delete<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
		_: Duration,
	) -> BoxFuture<'a, Result<WriteResponse>> {
		let result = self.delete_sync(index, id);

		Box::pin(async move { result })
	}

	fn count<'a>(
		&'a self,
		index: &'a str,
		query: &'a Value,
		_: Duration,
	) -> BoxFuture<'a, Result<u64>> {
		let result = self.count_sync(index, query);

		Box::pin(async move { result })
	}

	fn search<'a>(
		&'a self,
		index: &'a str,
		request: &'a SearchRequest,
	) -> BoxFuture<'a, Result<SearchResponse>> {
		let result = self.search_sync(index, request);

		Box::pin(async move { result })
	}
}

fn shards(failed: u64) -> Shards {
	Shards { total: 1, successful: if failed > 0 { 0 } else { 1 }, failed }
}

fn project(source: &Source, fields: &[String]) -> Source {
	source
		.iter()
		.filter(|(key, _)| fields.iter().any(|field| field == *key))
		.map(|(key, value)| (key.clone(), value.clone()))
		.collect()
}

fn sort_spec(sort: &Value) -> Option<(String, bool)> {
	let (field, spec) = sort.as_object()?.iter().next()?;
	let desc = spec.get("order").and_then(Value::as_str) == Some("desc");

	Some((field.clone(), desc))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
	match (a, b) {
		(Some(Value::Number(a)), Some(Value::Number(b))) =>
			a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
		(Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		_ => Ordering::Equal,
	}
}

/// Scores a document against a query; `None` means it does not match.
fn evaluate(query: &Value, doc: &Source) -> Option<f64> {
	let (kind, body) = query.as_object()?.iter().next()?;

	match kind.as_str() {
		"bool" => evaluate_bool(body, doc),
		"match" => evaluate_match(body, doc),
		"match_all" => Some(1.0),
		"term" => evaluate_term(body, doc),
		"simple_query_string" => evaluate_simple_query_string(body, doc),
		_ => None,
	}
}

fn clauses<'a>(body: &'a Value, name: &str) -> &'a [Value] {
	body.get(name).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn evaluate_bool(body: &Value, doc: &Source) -> Option<f64> {
	let must = clauses(body, "must");
	let filter = clauses(body, "filter");
	let should = clauses(body, "should");
	let mut score = 0.0;

	for clause in must {
		score += evaluate(clause, doc)?;
	}
	for clause in filter {
		evaluate(clause, doc)?;
	}
	for clause in clauses(body, "must_not") {
		if evaluate(clause, doc).is_some() {
			return None;
		}
	}

	let mut matched = 0_u64;

	for clause in should {
		if let Some(clause_score) = evaluate(clause, doc) {
			matched += 1;
			score += clause_score;
		}
	}

	let default_minimum = if must.is_empty() && filter.is_empty() && !should.is_empty() { 1 } else { 0 };
	let minimum =
		body.get("minimum_should_match").and_then(Value::as_u64).unwrap_or(default_minimum);

	if matched < minimum {
		return None;
	}

	Some(score)
}

fn evaluate_match(body: &Value, doc: &Source) -> Option<f64> {
	let (field, spec) = body.as_object()?.iter().next()?;
	let (text, fuzzy, boost) = match spec {
		Value::String(text) => (text.as_str(), false, 1.0),
		Value::Object(spec) => (
			spec.get("query")?.as_str()?,
			spec.contains_key("fuzziness"),
			spec.get("boost").and_then(Value::as_f64).unwrap_or(1.0),
		),
		_ => return None,
	};

	match_score(text, &field_tokens(doc.get(field)), fuzzy).map(|score| score * boost)
}

fn evaluate_term(body: &Value, doc: &Source) -> Option<f64> {
	let (field, spec) = body.as_object()?.iter().next()?;
	let expected = match spec {
		Value::Object(spec) => spec.get("value")?,
		value => value,
	};
	let same = |value: &Value| scalar_text(value) == scalar_text(expected);
	let found = match doc.get(field)? {
		Value::Array(values) => values.iter().any(same),
		value => same(value),
	};

	found.then_some(1.0)
}

fn evaluate_simple_query_string(body: &Value, doc: &Source) -> Option<f64> {
	let query = body.get("query")?.as_str()?;
	let mut score = 0.0;

	for field in clauses(body, "fields").iter().filter_map(Value::as_str) {
		let (name, boost) = match field.split_once('^') {
			Some((name, boost)) => (name, boost.parse().unwrap_or(1.0)),
			None => (field, 1.0),
		};

		score += match_score(query, &field_tokens(doc.get(name)), false).unwrap_or(0.0) * boost;
	}

	(score > 0.0).then_some(score)
}

fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(text) => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		Value::Bool(flag) => Some(flag.to_string()),
		_ => None,
	}
}

fn tokenize(text: &str) -> Vec<String> {
	text.split(|c: char| !c.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(str::to_lowercase)
		.collect()
}

fn field_tokens(value: Option<&Value>) -> Vec<String> {
	match value {
		Some(Value::Array(values)) => values.iter().filter_map(scalar_text).flat_map(|t| tokenize(&t)).collect(),
		Some(value) => scalar_text(value).map(|text| tokenize(&text)).unwrap_or_default(),
		None => Vec::new(),
	}
}

/// Counts query tokens present in the field, one point each.
fn match_score(query: &str, tokens: &[String], fuzzy: bool) -> Option<f64> {
	let matched = tokenize(query)
		.iter()
		.filter(|wanted| {
			tokens.iter().any(|token| {
				token == *wanted || (fuzzy && edit_distance(token, wanted) <= max_edits(wanted))
			})
		})
		.count();

	(matched > 0).then_some(matched as f64)
}

fn max_edits(token: &str) -> usize {
	match token.chars().count() {
		0..=2 => 0,
		3..=5 => 1,
		_ => 2,
	}
}

fn edit_distance(a: &str, b: &str) -> usize {
	let b = b.chars().collect::<Vec<_>>();
	let mut previous = (0..=b.len()).collect::<Vec<_>>();

	for (i, ca) in a.chars().enumerate() {
		let mut current = vec![i + 1; b.len() + 1];

		for (j, cb) in b.iter().enumerate() {
			let substitution = previous[j] + usize::from(ca != *cb);

			current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
		}

		previous = current;
	}

	previous[b.len()]
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn fuzzy_matches_allow_one_edit_on_short_tokens() {
		assert_eq!(edit_distance("dokcer", "docker"), 2);
		assert_eq!(edit_distance("docke", "docker"), 1);
		assert!(match_score("dockr", &tokenize("Docker swarm"), true).is_some());
		assert!(match_score("dockr", &tokenize("Docker swarm"), false).is_none());
	}

	#[test]
	fn bool_queries_combine_clauses() {
		let doc = json!({ "title": "Docker", "tags": ["Docker", "IaC"] });
		let doc = doc.as_object().expect("Object document.");
		let keep = json!({ "bool": { "must": [{ "match": { "tags": "Docker" } }] } });
		let drop = json!({ "bool": { "must_not": [{ "match": { "tags": "IaC Ansible" } }] } });
		let should = json!({
			"bool": {
				"should": [{ "match": { "title": "Ansible" } }],
				"minimum_should_match": 1,
			}
		});

		assert!(evaluate(&keep, doc).is_some());
		assert!(evaluate(&drop, doc).is_none());
		assert!(evaluate(&should, doc).is_none());
	}

	#[test]
	fn terms_match_exact_values() {
		let doc = json!({ "year": "2020" });
		let doc = doc.as_object().expect("Object document.");

		assert!(evaluate(&json!({ "term": { "year": "2020" } }), doc).is_some());
		assert!(evaluate(&json!({ "term": { "year": "2021" } }), doc).is_none());
	}
}
