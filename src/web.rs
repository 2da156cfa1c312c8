use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Json, Response};
use axum::routing::get;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::objects::ObjectStore;
use crate::store::{ContentStore, WorkSummary};

#[derive(Clone)]
struct WebState {
    store: Arc<ContentStore>,
    objects: Arc<dyn ObjectStore>,
}

#[derive(Debug, Serialize)]
struct ChapterSummary {
    key: String,
    pages: usize,
}

#[derive(Debug, Serialize)]
struct WorkDetail {
    slug: String,
    title: String,
    description: String,
    cover_reference: Option<String>,
    chapters: Vec<ChapterSummary>,
}

#[derive(Debug, Serialize)]
struct ChapterPages {
    slug: String,
    title: String,
    chapter: String,
    pages: Vec<String>,
}

/// Read-only JSON view of the catalog plus an image proxy.
pub fn router(store: Arc<ContentStore>, objects: Arc<dyn ObjectStore>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/works", get(list_works))
        .route("/api/works/:slug", get(get_work))
        .route("/api/works/:slug/chapters/:chapter", get(get_chapter))
        .route("/image/:reference", get(get_image))
        .layer(TraceLayer::new_for_http())
        .with_state(WebState { store, objects })
}

async fn list_works(State(state): State<WebState>) -> Json<Vec<WorkSummary>> {
    Json(state.store.list_works())
}

async fn get_work(
    State(state): State<WebState>,
    Path(slug): Path<String>,
) -> Result<Json<WorkDetail>, StatusCode> {
    let work = state.store.get_work(&slug).ok_or(StatusCode::NOT_FOUND)?;
    let chapters = work
        .chapter_keys()
        .into_iter()
        .map(|key| {
            let pages = work.chapters.get(&key).map_or(0, Vec::len);
            ChapterSummary { key, pages }
        })
        .collect();
    Ok(Json(WorkDetail {
        slug,
        title: work.title,
        description: work.description,
        cover_reference: work.cover_reference,
        chapters,
    }))
}

async fn get_chapter(
    State(state): State<WebState>,
    Path((slug, chapter)): Path<(String, String)>,
) -> Result<Json<ChapterPages>, StatusCode> {
    let work = state.store.get_work(&slug).ok_or(StatusCode::NOT_FOUND)?;
    let pages = work
        .chapters
        .get(&chapter)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ChapterPages {
        slug,
        title: work.title,
        chapter,
        pages,
    }))
}

async fn get_image(
    State(state): State<WebState>,
    Path(reference): Path<String>,
) -> Result<Response, StatusCode> {
    if !state.store.references_image(&reference) {
        return Err(StatusCode::NOT_FOUND);
    }
    let bytes = match state.objects.download(&reference).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(reference = %reference, ?err, "image fetch failed");
            return Err(StatusCode::NOT_FOUND);
        }
    };
    let content_type = sniff_image_type(&bytes);
    let mut resp = Response::new(axum::body::Body::from(bytes));
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );
    Ok(resp)
}

fn sniff_image_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    }
}
