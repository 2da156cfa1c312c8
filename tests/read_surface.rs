use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt as _;
use tower::ServiceExt as _;

use shelfbot::catalog::Work;
use shelfbot::notify::MemoryNotifier;
use shelfbot::objects::{MemoryObjectStore, ObjectStore};
use shelfbot::sink::MemoryDocumentSink;
use shelfbot::store::{ContentStore, StoreLimits};

static PNG_HEADER: &[u8] = &[137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13];

fn app() -> Router {
    let store = Arc::new(ContentStore::new(
        Arc::new(MemoryDocumentSink::new()),
        Arc::new(MemoryNotifier::new()),
        StoreLimits::default(),
    ));
    let mut night = Work::new("Night Shift", "late hours", Some("cover-1".to_owned()));
    night
        .chapters
        .insert("10".to_owned(), vec!["p10".to_owned()]);
    night
        .chapters
        .insert("2".to_owned(), vec!["p2a".to_owned(), "p2b".to_owned()]);
    store.upsert("night-shift", night);
    store.upsert("day-off", Work::new("Day Off", "", None));

    let objects = Arc::new(MemoryObjectStore::new());
    objects.put("cover-1", PNG_HEADER.to_vec());
    objects.put("p2b", PNG_HEADER.to_vec());
    objects.put("stray", PNG_HEADER.to_vec());
    shelfbot::web::router(store, objects as Arc<dyn ObjectStore>)
}

async fn get(app: &Router, uri: &str) -> anyhow::Result<(StatusCode, Option<String>, Vec<u8>)> {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = response.into_body().collect().await?.to_bytes().to_vec();
    Ok((status, content_type, body))
}

async fn get_json(app: &Router, uri: &str) -> anyhow::Result<serde_json::Value> {
    let (status, _, body) = get(app, uri).await?;
    assert_eq!(status, StatusCode::OK, "{uri}");
    Ok(serde_json::from_slice(&body)?)
}

#[tokio::test]
async fn healthz_answers_ok() -> anyhow::Result<()> {
    let (status, _, body) = get(&app(), "/healthz").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok\n");
    Ok(())
}

#[tokio::test]
async fn works_are_listed_by_title() -> anyhow::Result<()> {
    let works = get_json(&app(), "/api/works").await?;
    let works = works.as_array().expect("array");
    assert_eq!(works.len(), 2);
    assert_eq!(works[0]["slug"], "day-off");
    assert_eq!(works[1]["title"], "Night Shift");
    assert_eq!(works[1]["chapter_count"], 2);
    Ok(())
}

#[tokio::test]
async fn work_detail_orders_chapters_numerically() -> anyhow::Result<()> {
    let work = get_json(&app(), "/api/works/night-shift").await?;
    assert_eq!(work["cover_reference"], "cover-1");
    assert_eq!(
        work["chapters"],
        serde_json::json!([{ "key": "2", "pages": 2 }, { "key": "10", "pages": 1 }])
    );
    Ok(())
}

#[tokio::test]
async fn chapter_pages_are_returned_in_order() -> anyhow::Result<()> {
    let chapter = get_json(&app(), "/api/works/night-shift/chapters/2").await?;
    assert_eq!(chapter["pages"], serde_json::json!(["p2a", "p2b"]));
    assert_eq!(chapter["title"], "Night Shift");
    Ok(())
}

#[tokio::test]
async fn unknown_works_and_chapters_are_404() -> anyhow::Result<()> {
    let app = app();
    for uri in [
        "/api/works/missing",
        "/api/works/night-shift/chapters/3",
        "/image/missing",
    ] {
        let (status, _, _) = get(&app, uri).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn images_are_proxied_with_a_sniffed_content_type() -> anyhow::Result<()> {
    let (status, content_type, body) = get(&app(), "/image/cover-1").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(body, PNG_HEADER);
    Ok(())
}

#[tokio::test]
async fn only_catalog_images_are_served() -> anyhow::Result<()> {
    let app = app();
    let (status, _, _) = get(&app, "/image/p2b").await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _, body) = get(&app, "/image/stray").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
    Ok(())
}
