mod cli;
mod config;
mod db;
mod entities;
mod error;
mod filters;
mod models;
mod pagination;
mod payloads;
mod ratings;
mod routes;
mod seed;
mod shape;
mod store;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    cli::{CliOptions, SeedMode},
    config::Config,
    store::Catalog,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Catalog,
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api", get(routes::api_root))
        .route("/api/genres", get(routes::list_genres).post(routes::create_genre))
        .route(
            "/api/genres/{id}",
            get(routes::get_genre)
                .put(routes::replace_genre)
                .patch(routes::patch_genre)
                .delete(routes::delete_genre),
        )
        .route("/api/directors", get(routes::list_directors).post(routes::create_director))
        .route(
            "/api/directors/{id}",
            get(routes::get_director)
                .put(routes::replace_director)
                .patch(routes::patch_director)
                .delete(routes::delete_director),
        )
        .route("/api/actors", get(routes::list_actors).post(routes::create_actor))
        .route(
            "/api/actors/{id}",
            get(routes::get_actor)
                .put(routes::replace_actor)
                .patch(routes::patch_actor)
                .delete(routes::delete_actor),
        )
        .route("/api/movies", get(routes::list_movies).post(routes::create_movie))
        .route("/api/movies/by_genre", get(routes::movies_by_genre))
        .route("/api/movies/by_director", get(routes::movies_by_director))
        .route("/api/movies/top_rated", get(routes::top_rated))
        .route(
            "/api/movies/{id}",
            get(routes::get_movie)
                .put(routes::replace_movie)
                .patch(routes::patch_movie)
                .delete(routes::delete_movie),
        )
        .route("/api/reviews", get(routes::list_reviews).post(routes::create_review))
        .route("/api/reviews/featured", get(routes::featured_reviews))
        .route(
            "/api/reviews/{id}",
            get(routes::get_review)
                .put(routes::replace_review)
                .patch(routes::patch_review)
                .delete(routes::delete_review),
        )
        .fallback(routes::not_found)
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movie_catalog=debug,sqlx=warn".to_string()),
        )
        .init();

    let options = CliOptions::from_args();
    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url, config.db_max_connections).await?;
    let catalog = Catalog::new(db);

    if options.seed != SeedMode::Skip {
        seed::load(&catalog).await?;
        if options.seed == SeedMode::SeedOnly {
            return Ok(());
        }
    }

    let state = Arc::new(AppState { config: config.clone(), catalog });

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}
