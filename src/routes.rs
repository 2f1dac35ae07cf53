use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    http::{HeaderMap, StatusCode, header::HOST, request::Parts},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    AppState,
    config::Config,
    error::{AppError, AppResult},
    filters::Params,
    models::{GenreOut, MovieDetail, MovieSummary, PersonDetail, PersonOut, ReviewOut},
    pagination::{Page, PageLinks, PageRequest},
    payloads::{GenreInput, MovieInput, PersonInput, ReviewInput, WriteMode},
};

type ApiState = State<Arc<AppState>>;

/// JSON request body whose rejections render as `AppError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Payload<T>(pub T);

/// Numeric record id from the path. Anything unparseable is a 404.
pub struct Id(pub i32);

impl<S: Send + Sync> FromRequestParts<S> for Id {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state).await?;
        Ok(Self(id))
    }
}

/// Query parameters of a list request with the page they select.
pub struct ListRequest {
    pub params: Params,
    pub page: PageRequest,
    links: PageLinks,
}

impl FromRequestParts<Arc<AppState>> for ListRequest {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<Params>::try_from_uri(&parts.uri)
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        let page = PageRequest::from_params(
            &params,
            state.config.default_page_size,
            state.config.max_page_size,
        )?;
        let links = PageLinks {
            base: base_url(&state.config, &parts.headers),
            path: parts.uri.path().to_string(),
            params: params.clone(),
        };
        Ok(Self { params, page, links })
    }
}

impl ListRequest {
    fn respond<T: Serialize>(&self, (count, results): (u64, Vec<T>)) -> Json<Page<T>> {
        Json(Page::new(count, results, self.page, &self.links))
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

fn base_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(url) = &config.public_url {
        return url.clone();
    }
    let host = headers.get(HOST).and_then(|h| h.to_str().ok()).unwrap_or("localhost");
    format!("http://{host}")
}

pub async fn api_root(State(state): ApiState, headers: HeaderMap) -> Json<Value> {
    let base = base_url(&state.config, &headers);
    Json(json!({
        "movies": format!("{base}/api/movies"),
        "actors": format!("{base}/api/actors"),
        "directors": format!("{base}/api/directors"),
        "genres": format!("{base}/api/genres"),
        "reviews": format!("{base}/api/reviews"),
    }))
}

pub async fn not_found() -> AppError {
    AppError::not_found()
}

// Genres

pub async fn list_genres(State(state): ApiState, list: ListRequest) -> AppResult<Json<Page<GenreOut>>> {
    Ok(list.respond(state.catalog.list_genres(&list.params, list.page).await?))
}

pub async fn get_genre(State(state): ApiState, Id(id): Id) -> AppResult<Json<GenreOut>> {
    Ok(Json(state.catalog.get_genre(id).await?))
}

pub async fn create_genre(
    State(state): ApiState,
    Payload(input): Payload<GenreInput>,
) -> AppResult<(StatusCode, Json<GenreOut>)> {
    Ok((StatusCode::CREATED, Json(state.catalog.create_genre(input).await?)))
}

pub async fn replace_genre(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<GenreInput>,
) -> AppResult<Json<GenreOut>> {
    Ok(Json(state.catalog.update_genre(id, input, WriteMode::Replace).await?))
}

pub async fn patch_genre(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<GenreInput>,
) -> AppResult<Json<GenreOut>> {
    Ok(Json(state.catalog.update_genre(id, input, WriteMode::Patch).await?))
}

pub async fn delete_genre(State(state): ApiState, Id(id): Id) -> AppResult<StatusCode> {
    state.catalog.delete_genre(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Directors

pub async fn list_directors(State(state): ApiState, list: ListRequest) -> AppResult<Json<Page<PersonOut>>> {
    Ok(list.respond(state.catalog.list_directors(&list.params, list.page).await?))
}

pub async fn get_director(State(state): ApiState, Id(id): Id) -> AppResult<Json<PersonDetail>> {
    Ok(Json(state.catalog.get_director(id).await?))
}

pub async fn create_director(
    State(state): ApiState,
    Payload(input): Payload<PersonInput>,
) -> AppResult<(StatusCode, Json<PersonOut>)> {
    Ok((StatusCode::CREATED, Json(state.catalog.create_director(input).await?)))
}

pub async fn replace_director(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<PersonInput>,
) -> AppResult<Json<PersonOut>> {
    Ok(Json(state.catalog.update_director(id, input, WriteMode::Replace).await?))
}

pub async fn patch_director(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<PersonInput>,
) -> AppResult<Json<PersonOut>> {
    Ok(Json(state.catalog.update_director(id, input, WriteMode::Patch).await?))
}

pub async fn delete_director(State(state): ApiState, Id(id): Id) -> AppResult<StatusCode> {
    state.catalog.delete_director(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Actors

pub async fn list_actors(State(state): ApiState, list: ListRequest) -> AppResult<Json<Page<PersonOut>>> {
    Ok(list.respond(state.catalog.list_actors(&list.params, list.page).await?))
}

pub async fn get_actor(State(state): ApiState, Id(id): Id) -> AppResult<Json<PersonDetail>> {
    Ok(Json(state.catalog.get_actor(id).await?))
}

pub async fn create_actor(
    State(state): ApiState,
    Payload(input): Payload<PersonInput>,
) -> AppResult<(StatusCode, Json<PersonOut>)> {
    Ok((StatusCode::CREATED, Json(state.catalog.create_actor(input).await?)))
}

pub async fn replace_actor(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<PersonInput>,
) -> AppResult<Json<PersonOut>> {
    Ok(Json(state.catalog.update_actor(id, input, WriteMode::Replace).await?))
}

pub async fn patch_actor(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<PersonInput>,
) -> AppResult<Json<PersonOut>> {
    Ok(Json(state.catalog.update_actor(id, input, WriteMode::Patch).await?))
}

pub async fn delete_actor(State(state): ApiState, Id(id): Id) -> AppResult<StatusCode> {
    state.catalog.delete_actor(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Movies

pub async fn list_movies(State(state): ApiState, list: ListRequest) -> AppResult<Json<Page<MovieSummary>>> {
    Ok(list.respond(state.catalog.list_movies(&list.params, list.page).await?))
}

pub async fn movies_by_genre(State(state): ApiState, list: ListRequest) -> AppResult<Json<Page<MovieSummary>>> {
    Ok(list.respond(state.catalog.movies_by_genre(list.param("name"), list.page).await?))
}

pub async fn movies_by_director(State(state): ApiState, list: ListRequest) -> AppResult<Json<Page<MovieSummary>>> {
    Ok(list.respond(state.catalog.movies_by_director(list.param("name"), list.page).await?))
}

pub async fn top_rated(State(state): ApiState) -> AppResult<Json<Vec<MovieSummary>>> {
    Ok(Json(state.catalog.top_rated().await?))
}

pub async fn get_movie(State(state): ApiState, Id(id): Id) -> AppResult<Json<MovieDetail>> {
    Ok(Json(state.catalog.get_movie(id).await?))
}

pub async fn create_movie(
    State(state): ApiState,
    Payload(input): Payload<MovieInput>,
) -> AppResult<(StatusCode, Json<MovieDetail>)> {
    Ok((StatusCode::CREATED, Json(state.catalog.create_movie(input).await?)))
}

pub async fn replace_movie(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<MovieInput>,
) -> AppResult<Json<MovieDetail>> {
    Ok(Json(state.catalog.update_movie(id, input, WriteMode::Replace).await?))
}

pub async fn patch_movie(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<MovieInput>,
) -> AppResult<Json<MovieDetail>> {
    Ok(Json(state.catalog.update_movie(id, input, WriteMode::Patch).await?))
}

pub async fn delete_movie(State(state): ApiState, Id(id): Id) -> AppResult<StatusCode> {
    state.catalog.delete_movie(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Reviews

pub async fn list_reviews(State(state): ApiState, list: ListRequest) -> AppResult<Json<Page<ReviewOut>>> {
    Ok(list.respond(state.catalog.list_reviews(&list.params, list.page).await?))
}

pub async fn featured_reviews(State(state): ApiState, list: ListRequest) -> AppResult<Json<Page<ReviewOut>>> {
    Ok(list.respond(state.catalog.featured_reviews(list.page).await?))
}

pub async fn get_review(State(state): ApiState, Id(id): Id) -> AppResult<Json<ReviewOut>> {
    Ok(Json(state.catalog.get_review(id).await?))
}

pub async fn create_review(
    State(state): ApiState,
    Payload(input): Payload<ReviewInput>,
) -> AppResult<(StatusCode, Json<ReviewOut>)> {
    Ok((StatusCode::CREATED, Json(state.catalog.create_review(input).await?)))
}

pub async fn replace_review(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<ReviewInput>,
) -> AppResult<Json<ReviewOut>> {
    Ok(Json(state.catalog.update_review(id, input, WriteMode::Replace).await?))
}

pub async fn patch_review(
    State(state): ApiState,
    Id(id): Id,
    Payload(input): Payload<ReviewInput>,
) -> AppResult<Json<ReviewOut>> {
    Ok(Json(state.catalog.update_review(id, input, WriteMode::Patch).await?))
}

pub async fn delete_review(State(state): ApiState, Id(id): Id) -> AppResult<StatusCode> {
    state.catalog.delete_review(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Method, Request, header::CONTENT_TYPE},
    };
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::{app, db, store::Catalog};

    async fn test_app() -> Router {
        let config = Config::for_tests();
        let db = db::connect_and_migrate(&config.database_url, config.db_max_connections)
            .await
            .unwrap();
        app(Arc::new(AppState { config: Arc::new(config), catalog: Catalog::new(db) }))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            },
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    async fn post(app: &Router, uri: &str, body: Value) -> Value {
        let (status, value) = send(app, Method::POST, uri, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{value}");
        value
    }

    /// Creates a director and a genre, returning their ids.
    async fn basics(app: &Router) -> (i64, i64) {
        let director = post(app, "/api/directors", json!({ "name": "Christopher Nolan" })).await;
        let genre = post(app, "/api/genres", json!({ "name": "Sci-Fi" })).await;
        (director["id"].as_i64().unwrap(), genre["id"].as_i64().unwrap())
    }

    #[tokio::test]
    async fn index_lists_collections() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["movies"], "http://testserver/api/movies");
        assert_eq!(body["reviews"], "http://testserver/api/reviews");
    }

    #[tokio::test]
    async fn movie_create_returns_detail_shape() {
        let app = test_app().await;
        let (director, genre) = basics(&app).await;
        let body = post(
            &app,
            "/api/movies",
            json!({
                "title": "Inception",
                "release_year": 2010,
                "duration": 148,
                "rating": 8.8,
                "director_id": director,
                "genre_ids": [genre],
            }),
        )
        .await;
        assert_eq!(body["rating"], "8.8");
        assert_eq!(body["director"]["name"], "Christopher Nolan");
        assert_eq!(body["genres"][0]["name"], "Sci-Fi");
        assert_eq!(body["review_count"], 0);
        assert_eq!(body["average_rating"], Value::Null);
        assert_eq!(body["actors"], json!([]));
    }

    #[tokio::test]
    async fn invalid_release_year_is_rejected() {
        let app = test_app().await;
        let (director, genre) = basics(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/movies",
            Some(json!({ "title": "Old", "release_year": 1899, "director_id": director, "genre_ids": [genre] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["release_year"].is_array());
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = test_app().await;
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/genres")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"name\": "))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn by_genre_without_name_is_bad_request() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api/movies/by_genre", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Genre name parameter is required" }));

        let (status, body) = send(&app, Method::GET, "/api/movies/by_director?name=", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Director name parameter is required" }));
    }

    #[tokio::test]
    async fn by_genre_with_no_match_is_empty() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api/movies/by_genre?name=western", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert_eq!(body["results"], json!([]));
    }

    #[tokio::test]
    async fn unknown_and_non_numeric_ids_are_not_found() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api/movies/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Not found." }));

        let (status, _) = send(&app, Method::GET, "/api/actors/abc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_then_delete_again() {
        let app = test_app().await;
        let genre = post(&app, "/api/genres", json!({ "name": "Noir" })).await;
        let uri = format!("/api/genres/{}", genre["id"]);

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fifteen_movies_paginate() {
        let app = test_app().await;
        let (director, genre) = basics(&app).await;
        for i in 0..15 {
            post(
                &app,
                "/api/movies",
                json!({
                    "title": format!("Movie {i}"),
                    "release_year": 2000 + i,
                    "director_id": director,
                    "genre_ids": [genre],
                }),
            )
            .await;
        }

        let (status, body) = send(&app, Method::GET, "/api/movies", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 15);
        assert_eq!(body["results"].as_array().unwrap().len(), 10);
        assert_eq!(body["next"], "http://testserver/api/movies?page=2");
        assert_eq!(body["previous"], Value::Null);

        let (_, body) = send(&app, Method::GET, "/api/movies?page=2", None).await;
        assert_eq!(body["results"].as_array().unwrap().len(), 5);
        assert_eq!(body["next"], Value::Null);
        assert_eq!(body["previous"], "http://testserver/api/movies");

        let (status, body) = send(&app, Method::GET, "/api/movies?page=3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Invalid page." }));
    }

    #[tokio::test]
    async fn review_stats_show_in_list_shape() {
        let app = test_app().await;
        let (director, genre) = basics(&app).await;
        let movie = post(
            &app,
            "/api/movies",
            json!({ "title": "Tenet", "release_year": 2020, "director_id": director, "genre_ids": [genre] }),
        )
        .await;
        for (name, rating) in [("a", 7), ("b", 8), ("c", 8)] {
            post(
                &app,
                "/api/reviews",
                json!({ "movie": movie["id"], "reviewer_name": name, "rating": rating, "comment": "ok" }),
            )
            .await;
        }

        let (_, body) = send(&app, Method::GET, "/api/movies", None).await;
        let summary = &body["results"][0];
        assert_eq!(summary["review_count"], 3);
        assert_eq!(summary["average_rating"], 7.7);
        assert_eq!(summary["genres"], json!(["Sci-Fi"]));
        assert_eq!(summary["director_name"], "Christopher Nolan");
    }

    #[tokio::test]
    async fn unknown_ordering_is_rejected() {
        let app = test_app().await;
        let (status, body) = send(&app, Method::GET, "/api/movies?ordering=budget", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["ordering"].is_array());
    }
}
