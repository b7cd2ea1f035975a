//! Source listing loops against a local stand-in for the Library of
//! Congress APIs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use harvest::{
    ChroniclingSource, CongressRange, CongressSource, DocumentSource, NewspaperRange, SourceError,
};
use loc_client::LocClient;
use serde_json::{json, Value};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable").into_response()
}

// Newspaper search

#[derive(Clone, Copy)]
enum SearchPage {
    Results(usize),
    Empty,
    Error,
}

struct Search {
    pages: Vec<SearchPage>,
    hits: AtomicUsize,
}

fn page_result(page: usize, n: usize) -> Value {
    json!({
        "id": format!("https://www.loc.gov/resource/sn8302{}/1790-01-0{}/ed-1/", page, n),
        "title": "Pennsylvania Gazette",
        "date": "1790-01-06",
        "image_url": [
            "https://www.loc.gov/static/images/thumb.gif",
            format!("https://tile.loc.gov/image-services/iiif/service:ndnp:pa:{}:{}/pct:6.25/0/default.jpg", page, n)
        ]
    })
}

async fn search(
    State(search): State<Arc<Search>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    search.hits.fetch_add(1, Ordering::SeqCst);
    let page: usize = params.get("sp").and_then(|p| p.parse().ok()).unwrap_or(1);
    match search.pages.get(page - 1).copied().unwrap_or(SearchPage::Empty) {
        SearchPage::Results(n) => {
            Json(json!({"results": (0..n).map(|i| page_result(page, i)).collect::<Vec<_>>()}))
                .into_response()
        }
        SearchPage::Empty => Json(json!({"results": []})).into_response(),
        SearchPage::Error => server_error(),
    }
}

async fn newspapers(pages: Vec<SearchPage>, max_pages: usize) -> (ChroniclingSource, Arc<Search>) {
    let state = Arc::new(Search {
        pages,
        hits: AtomicUsize::new(0),
    });
    let base = serve(
        Router::new()
            .route("/search", get(search))
            .with_state(state.clone()),
    )
    .await;
    let client = LocClient::new(None)
        .unwrap()
        .with_newspaper_url(format!("{}/search", base));
    let range = NewspaperRange::new(1790, 1791).with_max_pages(max_pages);
    (ChroniclingSource::new(client, range), state)
}

#[tokio::test]
async fn newspaper_budget_stops_paging() {
    let (source, search) = newspapers(vec![SearchPage::Results(3); 4], 5).await;

    let listing = source.collect().await.unwrap();

    assert_eq!(listing.items.len(), 5);
    assert!(listing.errors.is_empty());
    assert_eq!(search.hits.load(Ordering::SeqCst), 2);
    assert!(listing.items[0].candidates()[0].url.ends_with("/full/0/default.pdf"));
}

#[tokio::test]
async fn newspaper_empty_page_ends_listing() {
    let (source, search) =
        newspapers(vec![SearchPage::Results(3), SearchPage::Empty, SearchPage::Results(3)], 100)
            .await;

    let listing = source.collect().await.unwrap();

    assert_eq!(listing.items.len(), 3);
    assert!(listing.errors.is_empty());
    assert_eq!(search.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn newspaper_first_page_error_fails_source() {
    let (source, _search) = newspapers(vec![SearchPage::Error], 100).await;

    let err = source.collect().await.unwrap_err();

    assert!(matches!(err, SourceError::Api(_)));
}

#[tokio::test]
async fn newspaper_later_page_error_keeps_earlier_items() {
    let (source, search) = newspapers(
        vec![SearchPage::Results(2), SearchPage::Error, SearchPage::Results(2)],
        100,
    )
    .await;

    let listing = source.collect().await.unwrap();

    assert_eq!(listing.items.len(), 2);
    assert_eq!(listing.errors.len(), 1);
    assert!(listing.errors[0].starts_with("Newspaper search page 2: API error 500"));
    assert_eq!(search.hits.load(Ordering::SeqCst), 2);
}

// Congress bills

async fn bill_list(Path((congress, bill_type)): Path<(u32, String)>) -> Response {
    match (congress, bill_type.as_str()) {
        (1, "hr") => Json(json!({"bills": [
            {"number": "1", "title": "Tonnage Act", "introducedDate": "1789-04-01"},
            {"number": 2, "title": "Collection Act"}
        ]}))
        .into_response(),
        (1, "s") => server_error(),
        _ => Json(json!({"bills": []})).into_response(),
    }
}

async fn bill_text(Path((_congress, _bill_type, number)): Path<(u32, String, String)>) -> Response {
    match number.as_str() {
        "1" => Json(json!({"textVersions": [
            {"type": "Enrolled Bill", "formats": [
                {"type": "Plain Text", "url": "https://www.congress.gov/1/bills/hr1/BILLS-1hr1enr.txt"},
                {"type": "PDF", "url": "https://www.congress.gov/1/bills/hr1/BILLS-1hr1enr.pdf"}
            ]}
        ]}))
        .into_response(),
        _ => server_error(),
    }
}

#[tokio::test]
async fn congress_listing_reports_failed_calls() {
    let base = serve(
        Router::new()
            .route("/bill/:congress/:bill_type", get(bill_list))
            .route("/bill/:congress/:bill_type/:number/text", get(bill_text)),
    )
    .await;
    let client = LocClient::new(Some("test-key".into()))
        .unwrap()
        .with_congress_base_url(base);
    let source = CongressSource::new(client, CongressRange::new(1, 2).with_bill_types(["hr", "s"]));

    let listing = source.collect().await.unwrap();

    assert_eq!(listing.items.len(), 2);
    let first = &listing.items[0];
    assert_eq!(first.id.as_str(), "congress_1_hr_1");
    assert_eq!(first.candidates().len(), 2);
    assert!(first.unavailable().is_none());

    let second = &listing.items[1];
    assert_eq!(second.id.as_str(), "congress_1_hr_2");
    assert!(!second.has_candidates());
    assert!(second
        .unavailable()
        .unwrap()
        .starts_with("text versions unavailable: API error 500"));

    assert_eq!(listing.errors.len(), 1);
    assert!(listing.errors[0].starts_with("Congress 1 s: API error 500"));
}
