//! Paging behavior of the infinite list controller: continuation heuristics,
//! merge idempotence, single in-flight fetch, failure and retry semantics.

#[path = "testutils/mod.rs"]
mod testutils;

use infinilist::{
    ClearMode, Cursor, FetchState, FnFetcher, IdentityFilter, ListClient, ListConfig, ListError,
    LoadOutcome, PageEnvelope, PageRequest, QueryIdentity,
};
use serde_json::json;
use std::sync::Arc;
use testutils::{ids, init_logging, products, until, CatalogFetcher, Product, ScriptedFetcher};

fn client(page_size: usize) -> ListClient<Product> {
    ListClient::new(ListConfig::default().with_page_size(page_size)).unwrap()
}

fn booths() -> QueryIdentity {
    QueryIdentity::from_value("booths", json!({"keyword": "tea"}))
}

#[tokio::test]
async fn test_short_first_page_heuristics_scenario() {
    // Page 1: 3 rows, total 7, no hasNext => more, next cursor 2.
    // Page 2: 1 row (< page size 3) => done regardless of total.
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .page(1, PageEnvelope::new(products(1..=3)).with_total(7))
            .page(2, PageEnvelope::new(products(4..=4)).with_total(7)),
    );
    let client = client(3);
    let list = client.list(booths(), fetcher.clone());

    let outcome = list.initialize().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Fetched { cursor: Cursor::FIRST, rows: 3 });
    let view = list.view();
    assert!(view.has_more);
    assert_eq!(view.total, Some(7));
    let entry = client.entry(&booths()).unwrap();
    assert_eq!(entry.continuation(Some(3)).cursor(), Cursor::new(2));

    list.load_more().await.unwrap();
    let view = list.view();
    assert!(!view.has_more);
    assert_eq!(ids(&view.rows), vec![1, 2, 3, 4]);

    // Exhausted: no further fetch is attempted
    assert_eq!(list.load_more().await.unwrap(), LoadOutcome::Exhausted);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_explicit_end_on_first_page() {
    let fetcher = Arc::new(
        ScriptedFetcher::new().page(
            1,
            PageEnvelope::new(products(1..=5)).with_total(50).with_has_next(false),
        ),
    );
    let list = client(5).list(booths(), fetcher.clone());

    list.initialize().await.unwrap();
    let view = list.view();
    assert!(!view.has_more);
    assert_eq!(view.rows.len(), 5);
    assert_eq!(view.total, Some(50));
    assert_eq!(list.load_more().await.unwrap(), LoadOutcome::Exhausted);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_initialize_twice_is_idempotent() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let client = client(4);
    let list = client.list(booths(), fetcher.clone());

    list.initialize().await.unwrap();
    let first = list.view();
    assert_eq!(list.initialize().await.unwrap(), LoadOutcome::Cached);
    let second = list.view();

    assert_eq!(first, second);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(client.entry(&booths()).unwrap().page_count(), 1);
}

#[tokio::test]
async fn test_cursors_are_unique_and_increasing() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let client = client(3);
    let list = client.list(booths(), fetcher.clone());

    list.initialize().await.unwrap();
    let mut guard = 0;
    while list.load_more().await.unwrap().fetched() {
        guard += 1;
        assert!(guard < 10, "paging did not terminate");
    }

    let entry = client.entry(&booths()).unwrap();
    let cursors: Vec<u32> = entry.cursors().iter().map(|c| c.index()).collect();
    assert_eq!(cursors, vec![1, 2, 3, 4]);
    assert_eq!(fetcher.requested().len(), 4);
    assert_eq!(ids(&list.view().rows), (1..=10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_running_total_stops_paging_without_hint() {
    // 6 items in pages of 3: the second page is full, so only the running
    // total can tell the list is exhausted.
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=6)));
    let config = ListConfig::trusting_server().with_page_size(3);
    let list = ListClient::new(config).unwrap().list(booths(), fetcher.clone());

    list.initialize().await.unwrap();
    assert!(list.view().has_more);
    list.load_more().await.unwrap();
    assert!(!list.view().has_more);

    assert_eq!(list.load_more().await.unwrap(), LoadOutcome::Exhausted);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_has_next_drives_paging() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=5)).without_total().with_has_next());
    let config = ListConfig::trusting_server().with_page_size(2);
    let list = ListClient::new(config).unwrap().list(booths(), fetcher.clone());

    list.initialize().await.unwrap();
    while list.load_more().await.unwrap().fetched() {}

    assert_eq!(list.view().rows.len(), 5);
    assert_eq!(list.view().total, None);
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_concurrent_load_more_issues_one_fetch() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let list = client(3).list(booths(), fetcher.clone());
    let gate = fetcher.hold();

    let (first, second) = tokio::join!(list.load_more(), async {
        until(|| list.state().is_fetching()).await;
        let second = list.load_more().await;
        gate.open();
        second
    });

    assert_eq!(first.unwrap(), LoadOutcome::Fetched { cursor: Cursor::FIRST, rows: 3 });
    assert_eq!(second.unwrap(), LoadOutcome::InFlight);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_lists_for_same_identity_share_the_guard() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let client = client(3);
    let a = client.list(booths(), fetcher.clone());
    let b = client.list(booths(), fetcher.clone());
    let gate = fetcher.hold();

    let (first, second) = tokio::join!(a.initialize(), async {
        until(|| b.state().is_fetching()).await;
        let second = b.initialize().await;
        gate.open();
        second
    });

    assert!(first.unwrap().fetched());
    assert_eq!(second.unwrap(), LoadOutcome::InFlight);
    assert_eq!(b.view().rows.len(), 3);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_different_identities_fetch_independently() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let client = client(3);
    let tea = client.list(booths(), fetcher.clone());
    let mugs = client.list(QueryIdentity::from_value("booths", json!({"keyword": "mug"})), fetcher.clone());

    let (a, b) = tokio::join!(tea.initialize(), mugs.initialize());
    assert!(a.unwrap().fetched());
    assert!(b.unwrap().fetched());
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(client.stats().store.entries, 2);
}

#[tokio::test]
async fn test_loading_flags() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let list = client(3).list(booths(), fetcher.clone());

    let gate = fetcher.hold();
    let (_, initial_view) = tokio::join!(list.initialize(), async {
        until(|| list.state().is_fetching()).await;
        let view = list.view();
        gate.open();
        view
    });
    assert!(initial_view.is_loading_initial);
    assert!(!initial_view.is_loading_more);

    let gate = fetcher.hold();
    let (_, more_view) = tokio::join!(list.load_more(), async {
        until(|| list.state().is_fetching()).await;
        let view = list.view();
        gate.open();
        view
    });
    assert!(!more_view.is_loading_initial);
    assert!(more_view.is_loading_more);
    assert_eq!(more_view.rows.len(), 3);

    let settled = list.view();
    assert!(!settled.is_loading_initial && !settled.is_loading_more);
    assert_eq!(settled.rows.len(), 6);
}

#[tokio::test]
async fn test_failed_initial_fetch_leaves_no_entry_and_retries() {
    init_logging();
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=4)));
    let client = client(3);
    let list = client.list(booths(), fetcher.clone());

    fetcher.fail_next("503 Service Unavailable");
    let err = list.initialize().await.unwrap_err();
    assert!(matches!(
        &err,
        ListError::FetchFailed { cursor, .. } if *cursor == Cursor::FIRST
    ));
    assert!(err.is_retryable());
    assert!(client.entry(&booths()).is_none());

    let view = list.view();
    assert_eq!(view.error, Some(err));
    assert!(view.rows.is_empty());
    assert!(!view.is_loading_initial);

    assert!(list.retry().await.unwrap().fetched());
    let view = list.view();
    assert_eq!(view.error, None);
    assert_eq!(view.rows.len(), 3);
    assert_eq!(list.state(), FetchState::Idle);
}

#[tokio::test]
async fn test_failed_load_more_keeps_rows_and_has_more() {
    init_logging();
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=7)));
    let client = client(3);
    let list = client.list(booths(), fetcher.clone());
    list.initialize().await.unwrap();
    let before = client.entry(&booths()).unwrap();

    fetcher.fail_next("connection reset");
    assert!(list.load_more().await.is_err());

    assert_eq!(client.entry(&booths()).unwrap(), before);
    let view = list.view();
    assert_eq!(view.rows.len(), 3);
    assert!(view.has_more);
    assert!(view.error.is_some());

    assert_eq!(
        list.retry().await.unwrap(),
        LoadOutcome::Fetched { cursor: Cursor::new(2).unwrap(), rows: 3 }
    );
    assert!(list.view().error.is_none());
}

#[tokio::test]
async fn test_clear_while_fetching_discards_stale_page() {
    init_logging();
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let client = client(3);
    let list = client.list(booths(), fetcher.clone());
    list.initialize().await.unwrap();

    let gate = fetcher.hold();
    let (outcome, _) = tokio::join!(list.load_more(), async {
        until(|| list.state().is_fetching()).await;
        let _ = client.mutations().apply_clear_with(&IdentityFilter::exact(&booths()), ClearMode::Reset).commit();
        gate.open();
    });

    assert_eq!(outcome.unwrap(), LoadOutcome::Discarded { cursor: Cursor::new(2).unwrap() });
    let view = list.view();
    assert!(view.rows.is_empty());
    assert_eq!(view.total, Some(0));
    assert!(!view.has_more);
    assert_eq!(list.state(), FetchState::Idle);
}

#[tokio::test]
async fn test_refresh_refetches_first_page() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let client = client(3);
    let list = client.list(booths(), fetcher.clone());
    list.initialize().await.unwrap();
    list.load_more().await.unwrap();
    assert_eq!(list.view().rows.len(), 6);

    assert_eq!(
        list.refresh().await.unwrap(),
        LoadOutcome::Fetched { cursor: Cursor::FIRST, rows: 3 }
    );
    assert_eq!(list.view().rows.len(), 3);
    assert_eq!(client.entry(&booths()).unwrap().cursors(), &[Cursor::FIRST]);
}

#[tokio::test]
async fn test_refresh_during_fetch_is_deferred() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let list = client(3).list(booths(), fetcher.clone());
    list.initialize().await.unwrap();

    let gate = fetcher.hold();
    let (stale, refreshed) = tokio::join!(list.load_more(), async {
        until(|| list.state().is_fetching()).await;
        let refreshed = list.refresh().await;
        gate.open();
        refreshed
    });

    assert_eq!(refreshed.unwrap(), LoadOutcome::RefreshDeferred);
    assert_eq!(stale.unwrap(), LoadOutcome::Discarded { cursor: Cursor::new(2).unwrap() });
    assert!(list.view().is_empty());
    assert!(!list.state().is_fetching());

    fetcher.release();
    assert!(list.initialize().await.unwrap().fetched());
    assert_eq!(ids(&list.view().rows), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_max_entries_evicts_oldest() {
    let fetcher = Arc::new(CatalogFetcher::new(products(1..=10)));
    let client: ListClient<Product> =
        ListClient::new(ListConfig::default().with_page_size(3).with_max_entries(2)).unwrap();

    for keyword in ["a", "b", "c"] {
        let identity = QueryIdentity::from_value("search", json!({ "keyword": keyword }));
        client.list(identity, fetcher.clone()).initialize().await.unwrap();
    }

    let stats = client.stats();
    assert_eq!(stats.store.entries, 2);
    assert_eq!(stats.store.evictions, 1);
    assert!(client
        .entry(&QueryIdentity::from_value("search", json!({"keyword": "c"})))
        .is_some());
}

#[tokio::test]
async fn test_closure_fetcher() {
    let fetcher = FnFetcher::new(|request: PageRequest| async move {
        let rows = if request.cursor.is_first() { products(1..=2) } else { Vec::new() };
        Ok::<_, ListError>(PageEnvelope::new(rows))
    });
    let list = client(2).list(booths(), Arc::new(fetcher));

    list.initialize().await.unwrap();
    assert!(list.view().has_more);
    assert!(list.load_more().await.unwrap().fetched());
    // Empty page ends the list
    assert!(!list.view().has_more);
    assert_eq!(list.view().rows.len(), 2);
}

#[test]
fn test_invalid_config_rejected() {
    let err = ListClient::<Product>::new(ListConfig::default().with_page_size(0)).err();
    assert!(matches!(err, Some(ListError::Config(_))));
}
