mod authentication;
mod authorization;
mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod expiry;
mod extractors;
mod handlers;
mod models;
mod tags;
mod validation;

use std::{
    net::{SocketAddr, TcpListener},
    str::FromStr,
    sync::Arc,
};

use anyhow::Context;
pub use anyhow::Result;
use axum::http::StatusCode;
use axum::{routing::*, Extension, Json, Router};
use handlers::*;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use tower_http::trace::TraceLayer;

pub use authentication::TokenService;
pub use config::Config;
pub use data_formats::*;
pub use db_helpers::{CommentStore, PostStore, SqliteStore, Store, TagStore, UserStore};
pub use errors::{RequestError, RequestErrorJson};
pub use expiry::{
    cleanup_old_posts, is_expired, run_expiry_check, spawn_cleanup_sweep, spawn_expiry_worker,
    ExpiryCheck, ExpiryQueue, PendingChecks,
};
pub use models::{
    Comment, CommentWithAuthor, NewPost, NewUser, Post, PostChanges, PostDetails, Tag, TagRemoval,
    User,
};
pub use tags::{parse_tag_list, render_tag_list};

pub type JsonResponse<T> = (StatusCode, Json<T>);

pub async fn run_app(config: Config) -> Result<()> {
    let pool = init_db(&config.database_url).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
    let tokens = Arc::new(TokenService::new(&config.jwt_secret));

    let (expiry_queue, receiver) = ExpiryQueue::new();
    spawn_expiry_worker(store.clone(), receiver);
    spawn_cleanup_sweep(store.clone(), config.cleanup_interval);

    let app = make_router(store, tokens, expiry_queue);
    tracing::info!(address = %config.bind_address, "Server started");
    axum::Server::bind(&config.bind_address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!(db_url, "Creating database");
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("Failed to create database {db_url}"))?;
    } else {
        tracing::info!(db_url, "Database already exists");
    }

    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("Invalid DATABASE_URL {db_url}"))?
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations completed");
    Ok(pool)
}

pub fn get_random_free_port() -> Result<(u16, SocketAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0").context("Could not bind a free port")?;
    let addr = listener
        .local_addr()
        .context("Could not get a free port")?;
    Ok((addr.port(), addr))
}

pub fn make_router(
    store: Arc<dyn Store>,
    tokens: Arc<TokenService>,
    expiry_queue: ExpiryQueue,
) -> Router {
    let api = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/tags", get(list_tags).post(create_tag))
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/:post_id",
            get(get_post)
                .put(update_post)
                .patch(update_post)
                .delete(delete_post),
        )
        .route(
            "/posts/:post_id/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/posts/:post_id/comments/:id",
            put(update_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
        .route("/posts/:post_id/tags/:id", delete(remove_post_tag));

    Router::new()
        .route("/up", get(alive))
        .nest("/api/v1", api)
        .fallback(not_found)
        .layer(Extension(store))
        .layer(Extension(tokens))
        .layer(Extension(expiry_queue))
        .layer(TraceLayer::new_for_http())
}
