//! `SearchClient` over the Elasticsearch REST API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::{
	BoxFuture, Error, Result,
	client::{
		CreateIndex, GetResponse, SearchClient, SearchRequest, SearchResponse, Source,
		WriteResponse,
	},
};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

#[derive(Clone, Debug)]
pub struct ElasticsearchClient {
	http: Client,
	base: Url,
	credentials: Option<(String, Option<String>)>,
	timeout: Duration,
}
impl ElasticsearchClient {
	pub fn new(cfg: &taged_config::Search) -> Result<Self> {
		let base = Url::parse(&cfg.url)
			.map_err(|err| Error::InvalidArgument(format!("Invalid search url {:?}: {err}.", cfg.url)))?;
		let timeout = Duration::from_millis(cfg.timeout_ms);
		let http = Client::builder().timeout(timeout).build()?;
		let credentials = cfg.username.clone().map(|username| (username, cfg.password.clone()));

		Ok(Self { http, base, credentials, timeout })
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	fn url(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.base.clone();

		url.path_segments_mut()
			.map_err(|_| Error::InvalidArgument(format!("Search url {} cannot be a base.", self.base)))?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
		match &self.credentials {
			Some((username, password)) => request.basic_auth(username, password.as_deref()),
			None => request,
		}
	}

	async fn send(&self, request: RequestBuilder, timeout: Duration) -> Result<Response> {
		Ok(self.authorize(request).timeout(timeout).send().await?)
	}

	async fn get_impl(
		&self,
		index: &str,
		id: &str,
		fields: Option<&[String]>,
		timeout: Duration,
	) -> Result<GetResponse> {
		let mut url = self.url(&[index, "_doc", id])?;

		if let Some(fields) = fields {
			url.query_pairs_mut().append_pair("_source_includes", &fields.join(","));
		}

		tracing::debug!(index, id, "Fetching search document.");

		let response = self.send(self.http.get(url), timeout).await?;

		if response.status() == StatusCode::NOT_FOUND {
			return Err(Error::NotFound(format!("Document {id:?} in index {index:?}.")));
		}

		let found: GetResponse = decode(response).await?;

		if !found.found {
			return Err(Error::NotFound(format!("Document {id:?} in index {index:?}.")));
		}

		Ok(found)
	}

	async fn index_impl(
		&self,
		index: &str,
		id: Option<&str>,
		document: &Source,
		timeout: Duration,
	) -> Result<WriteResponse> {
		let request = match id {
			Some(id) => self.http.put(self.url(&[index, "_doc", id])?),
			None => self.http.post(self.url(&[index, "_doc"])?),
		};

		tracing::debug!(index, id, "Indexing search document.");

		let response = self.send(request.json(document), timeout).await?;

		decode(response).await
	}

	async fn update_impl(
		&self,
		index: &str,
		id: &str,
		partial: &Source,
		timeout: Duration,
	) -> Result<WriteResponse> {
		let url = self.url(&[index, "_update", id])?;

		tracing::debug!(index, id, fields = partial.len(), "Updating search document.");

		let response = self.send(self.http.post(url).json(&json!({ "doc": partial })), timeout).await?;

		if response.status() == StatusCode::NOT_FOUND {
			return Err(Error::NotFound(format!("Document {id:?} in index {index:?}.")));
		}

		decode(response).await
	}

	async fn delete_impl(&self, index: &str, id: &str, timeout: Duration) -> Result<WriteResponse> {
		let url = self.url(&[index, "_doc", id])?;

		tracing::debug!(index, id, "Deleting search document.");

		let response = self.send(self.http.delete(url), timeout).await?;

		if response.status() == StatusCode::NOT_FOUND {
			let body = response.text().await?;

			return Ok(serde_json::from_str(&body).unwrap_or_else(|_| WriteResponse {
				id: id.to_string(),
				result: "not_found".to_string(),
				..Default::default()
			}));
		}

		decode(response).await
	}

	async fn count_impl(&self, index: &str, query: &Value, timeout: Duration) -> Result<u64> {
		let url = self.url(&[index, "_count"])?;

		tracing::debug!(index, "Counting search documents.");

		let response = self.send(self.http.post(url).json(&json!({ "query": query })), timeout).await?;
		let body: Value = decode(response).await?;

		body.get("count").and_then(Value::as_u64).ok_or_else(|| Error::Engine {
			status: StatusCode::OK.as_u16(),
			message: "Count response is missing count.".to_string(),
		})
	}

	async fn search_impl(&self, index: &str, request: &SearchRequest) -> Result<SearchResponse> {
		let url = self.url(&[index, "_search"])?;

		tracing::debug!(index, from = request.from, size = request.size, "Searching documents.");

		let response = self.send(self.http.post(url).json(request), request.timeout).await?;

		decode(response).await
	}

	async fn create_index_impl(&self, index: &str, body: &Value) -> Result<CreateIndex> {
		let url = self.url(&[index])?;
		let response = self.send(self.http.put(url).json(body), self.timeout).await?;
		let status = response.status();

		if status.is_success() {
			return Ok(CreateIndex::Created);
		}

		let message = response.text().await?;

		if status == StatusCode::BAD_REQUEST && message.contains(ALREADY_EXISTS) {
			return Ok(CreateIndex::AlreadyExists);
		}

		Err(Error::Engine { status: status.as_u16(), message })
	}

	async fn ping_impl(&self) -> Result<bool> {
		match self.send(self.http.head(self.base.clone()), self.timeout).await {
			Ok(response) => Ok(response.status().is_success()),
			Err(err) if err.is_unavailable() => {
				tracing::debug!(error = %err, "Search engine ping failed.");

				Ok(false)
			},
			Err(err) => Err(err),
		}
	}
}
impl SearchClient for ElasticsearchClient {
	fn ping<'a>(&'a self) -> BoxFuture<'a, Result<bool>> {
		Box::pin(self.ping_impl())
	}

	fn create_index<'a>(
		&'a self,
		index: &'a str,
		body: &'a Value,
	) -> BoxFuture<'a, Result<CreateIndex>> {
		Box::pin(self.create_index_impl(index, body))
	}

	fn get<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
		fields: Option<&'a [String]>,
		timeout: Duration,
	) -> BoxFuture<'a, Result<GetResponse>> {
		Box::pin(self.get_impl(index, id, fields, timeout))
	}

	fn index<'a>(
		&'a self,
		index: &'a str,
		id: Option<&'a str>,
		document: &'a Source,
		timeout: Duration,
	) -> BoxFuture<'a, Result<WriteResponse>> {
		Box::pin(self.index_impl(index, id, document, timeout))
	}

	fn update<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
		partial: &'a Source,
		timeout: Duration,
	) -> BoxFuture<'a, Result<WriteResponse>> {
		Box::pin(self.update_impl(index, id, partial, timeout))
	}

	fn delete<'a>(
		&'a self,
		index: &'a str,
		id: &'a str,
		timeout: Duration,
	) -> BoxFuture<'a, Result<WriteResponse>> {
		Box::pin(self.delete_impl(index, id, timeout))
	}

	fn count<'a>(
		&'a self,
		index: &'a str,
		query: &'a Value,
		timeout: Duration,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(self.count_impl(index, query, timeout))
	}

	fn search<'a>(
		&'a self,
		index: &'a str,
		request: &'a SearchRequest,
	) -> BoxFuture<'a, Result<SearchResponse>> {
		Box::pin(self.search_impl(index, request))
	}
}

async fn decode<T>(response: Response) -> Result<T>
where
	T: DeserializeOwned,
{
	let status = response.status();
	let body = response.text().await?;

	if !status.is_success() {
		return Err(Error::Engine { status: status.as_u16(), message: body });
	}

	Ok(serde_json::from_str(&body)?)
}
