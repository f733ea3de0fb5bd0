use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use taged_domain::tags;
use taged_service::{
	Book, BooksPage, DeleteResponse, Draft, DraftInput, DraftSummary, Error as ServiceError,
	ListBooksRequest, ListNotesRequest, NewBook, Note, NoteInput, NotePatch, NotesPage, TagUsage,
	TempLink,
};
use taged_storage::models::User;

use crate::state::AppState;

/// Set by the authenticating proxy in front of the service.
pub const USER_HEADER: &str = "x-taged-user";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/v1/notes", get(list_notes).post(create_note))
		.route("/api/v1/notes/count", get(notes_count))
		.route("/api/v1/notes/titles", get(note_titles))
		.route("/api/v1/notes/{id}", get(get_note).put(update_note).delete(delete_note))
		.route("/api/v1/notes/{id}/temp-link", post(create_temp_link))
		.route("/api/v1/temp/{token}", get(temp_note))
		.route("/api/v1/drafts", get(list_drafts).post(create_draft))
		.route("/api/v1/drafts/{id}", get(get_draft).put(save_draft).delete(delete_draft))
		.route("/api/v1/tags", get(tags_overview))
		.route("/api/v1/books", get(list_books).post(create_book))
		.route("/api/v1/books/{id}", get(get_book).put(update_book).delete(delete_book))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Default, Deserialize)]
struct NotesQuery {
	#[serde(default)]
	search: String,
	#[serde(default, rename = "tags-in")]
	tags_in: String,
	#[serde(default)]
	page: String,
}

#[derive(Debug, Default, Deserialize)]
struct TitlesQuery {
	#[serde(default)]
	search: String,
}

#[derive(Debug, Deserialize)]
struct TempLinkRequest {
	minutes: u64,
}

#[derive(Debug, Serialize)]
struct CountBody {
	count: u64,
}

async fn list_notes(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(query): Query<NotesQuery>,
) -> Result<Json<NotesPage>, ApiError> {
	let user = acting_user(&state, &headers).await?;
	let request = ListNotesRequest {
		search: query.search,
		tags_in: tags::parse_tag_list(&query.tags_in),
		page: query.page,
	};

	Ok(Json(state.service.list_notes(&user, request).await?))
}

async fn notes_count(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<CountBody>, ApiError> {
	let user = acting_user(&state, &headers).await?;
	let count = state.service.notes_count(&user).await?;

	Ok(Json(CountBody { count }))
}

async fn note_titles(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(query): Query<TitlesQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.note_titles(&user, &query.search).await?))
}

async fn create_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<NoteInput>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
	let user = acting_user(&state, &headers).await?;
	let note = state.service.create_note(&user, payload).await?;

	Ok((StatusCode::CREATED, Json(note)))
}

async fn get_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.get_note_for_user(&id, &user, None).await?))
}

async fn update_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
	Json(payload): Json<NotePatch>,
) -> Result<Json<Note>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.update_note(&user, &id, payload).await?))
}

async fn delete_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.delete_note(&user, &id).await?))
}

async fn tags_overview(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<TagUsage>>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.tags_overview(&user).await?))
}

async fn create_temp_link(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
	Json(payload): Json<TempLinkRequest>,
) -> Result<(StatusCode, Json<TempLink>), ApiError> {
	let user = acting_user(&state, &headers).await?;
	let link = state.service.create_temp_link(&user, &id, payload.minutes).await?;

	Ok((StatusCode::CREATED, Json(link)))
}

/// Anyone holding a valid link may read the note.
async fn temp_note(
	State(state): State<AppState>,
	Path(token): Path<String>,
) -> Result<Json<Note>, ApiError> {
	Ok(Json(state.service.note_from_temp_link(&token).await?))
}

async fn list_drafts(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<DraftSummary>>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.list_drafts(&user).await?))
}

async fn create_draft(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<DraftInput>,
) -> Result<(StatusCode, Json<Draft>), ApiError> {
	let user = acting_user(&state, &headers).await?;
	let draft = state.service.create_draft(&user, payload).await?;

	Ok((StatusCode::CREATED, Json(draft)))
}

async fn get_draft(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<Draft>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.get_draft(&user, &id).await?))
}

async fn save_draft(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
	Json(payload): Json<DraftInput>,
) -> Result<Json<Draft>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.save_draft(&user, &id, payload).await?))
}

async fn delete_draft(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
	let user = acting_user(&state, &headers).await?;

	state.service.delete_draft(&user, &id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn list_books(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(query): Query<ListBooksRequest>,
) -> Result<Json<BooksPage>, ApiError> {
	acting_user(&state, &headers).await?;

	Ok(Json(state.service.list_books(query).await?))
}

async fn create_book(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
	let user = acting_user(&state, &headers).await?;
	let book = state.service.add_book(&user, payload).await?;

	Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<Book>, ApiError> {
	acting_user(&state, &headers).await?;

	Ok(Json(state.service.get_book(&id).await?))
}

async fn update_book(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
	Json(payload): Json<NewBook>,
) -> Result<Json<Book>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.update_book(&user, &id, payload).await?))
}

async fn delete_book(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let user = acting_user(&state, &headers).await?;

	Ok(Json(state.service.delete_book(&user, &id).await?))
}

async fn acting_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
	let username = headers
		.get(USER_HEADER)
		.and_then(|value| value.to_str().ok())
		.unwrap_or_default();

	Ok(state.service.resolve_user(username).await?)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::PermissionDenied { message } =>
				Self::new(StatusCode::FORBIDDEN, "permission_denied", message),
			ServiceError::NotFound { message } =>
				Self::new(StatusCode::NOT_FOUND, "not_found", message),
			ServiceError::Unavailable { message } =>
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "search_unavailable", message),
			ServiceError::Repository { message } | ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Request failed.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
