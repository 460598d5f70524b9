//! End-to-end tests for subject inspection
//!
//! The engine runs against scripted fakes. Covered here: batching and
//! ordering, per-item error tagging, debounce coalescing, supersession
//! and the navigation surface.

mod common;

use common::{
    collect_until, drain_now, harness, raw_item, raw_item_without_thumbnails, wait_for_event,
    wait_for_inspection_end, FakeCatalog, FakeRipper, DEBOUNCE_MS,
};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tuberip::catalog::RawCatalogItem;
use tuberip::navigation::Navigator;
use tuberip::codec::Codec;
use tuberip::session::{ErrorScope, ExpectedTotal, SessionEvent};

fn numbered_items(count: usize) -> Vec<RawCatalogItem> {
    (1..=count)
        .map(|n| {
            raw_item(
                &format!("vid{n}"),
                &format!("Artist {n} - Song {n}"),
                "Channel",
                "PT3M5S",
            )
        })
        .collect()
}

// ============================================================================
// Batching and ordering
// ============================================================================

#[tokio::test]
async fn test_playlist_is_included_in_batches_of_seven() {
    let mut h = harness(
        FakeCatalog::playlist("mix01", "My Mix", "Curator", numbered_items(16)),
        FakeRipper::new(),
    );

    h.engine.inspect("pmix01").await;
    let events = collect_until(&mut h.events, |event| {
        matches!(event, SessionEvent::InspectionFinished)
    })
    .await;

    let batch_sizes: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::VideosIncluded { uuids } => Some(uuids.len()),
            _ => None,
        })
        .collect();
    assert_eq!(batch_sizes, vec![7, 7, 2]);

    let videos = h.engine.videos().await;
    assert_eq!(videos.len(), 16);
    for (index, video) in videos.iter().enumerate() {
        let n = index + 1;
        assert_eq!(video.details.title, format!("Artist {n} - Song {n}"));
    }
    assert_eq!(videos[0].tags.artist, "Artist 1");
    assert_eq!(videos[0].tags.song, "Song 1");
    assert_eq!(videos[0].details.duration, "3:05");
    assert!(videos.iter().all(|video| video.tags.cover.is_some()));

    let context = h.engine.context().await;
    assert_eq!(context.total, Some(ExpectedTotal::Count(16)));
    assert_eq!(context.subject, "pmix01");
}

#[tokio::test]
async fn test_single_video_url_yields_one_record() {
    let item = raw_item(
        "dQw4w9WgXcQ",
        "Rick Astley - Never Gonna Give You Up",
        "Rick Astley",
        "PT3M33S",
    );
    let mut h = harness(FakeCatalog::single(item), FakeRipper::new());

    h.engine.inspect("https://youtu.be/dQw4w9WgXcQ").await;
    wait_for_inspection_end(&mut h.events).await;

    let videos = h.engine.videos().await;
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].details.video_id, "dQw4w9WgXcQ");
    assert_eq!(videos[0].tags.artist, "Rick Astley");
    assert_eq!(videos[0].tags.song, "Never Gonna Give You Up");
    assert_eq!(
        h.engine.context().await.total,
        Some(ExpectedTotal::Count(1))
    );
    assert_eq!(h.navigator.current_path(), "vdQw4w9WgXcQ");
}

#[tokio::test]
async fn test_resolved_subject_publishes_location_and_title() {
    let mut h = harness(
        FakeCatalog::playlist("mix01", "My Mix", "Curator", numbered_items(2)),
        FakeRipper::new(),
    );

    h.engine
        .inspect("https://www.youtube.com/playlist?list=mix01")
        .await;
    wait_for_inspection_end(&mut h.events).await;

    assert_eq!(h.navigator.current_path(), "pmix01");
    assert_eq!(h.navigator.title(), "Tuberip - \"My Mix\" from Curator");
}

// ============================================================================
// Per-item failures
// ============================================================================

#[tokio::test]
async fn test_unusable_item_becomes_error_not_record() {
    let mut items = numbered_items(8);
    items.push(raw_item_without_thumbnails("vid9", "Broken - Nine"));
    let mut h = harness(
        FakeCatalog::playlist("mix02", "Mixed Bag", "Curator", items),
        FakeRipper::new(),
    );

    h.engine.inspect("pmix02").await;
    let events = collect_until(&mut h.events, |event| {
        matches!(event, SessionEvent::InspectionFinished)
    })
    .await;

    let batch_sizes: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::VideosIncluded { uuids } => Some(uuids.len()),
            _ => None,
        })
        .collect();
    assert_eq!(batch_sizes, vec![7, 1]);

    assert_eq!(h.engine.videos().await.len(), 8);
    let errors = h.engine.errors(ErrorScope::Context).await;
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].fatal);
    assert!(errors[0].message.contains("Broken - Nine"));
    assert!(events.iter().any(|event| matches!(
        event,
        SessionEvent::ErrorsIncluded {
            scope: ErrorScope::Context,
            fatal: false,
            count: 1
        }
    )));
}

#[tokio::test]
async fn test_cover_fetch_failure_drops_only_that_record() {
    let catalog = FakeCatalog::playlist("mix05", "Mix", "Chan", numbered_items(3))
        .with_cover_failure("/vid2/");
    let mut h = harness(catalog, FakeRipper::new());

    h.engine.inspect("pmix05").await;
    wait_for_inspection_end(&mut h.events).await;

    let videos = h.engine.videos().await;
    assert_eq!(videos.len(), 2);
    assert!(videos.iter().all(|video| video.details.video_id != "vid2"));
    let errors = h.engine.errors(ErrorScope::Context).await;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Cover art"));
}

#[tokio::test]
async fn test_interrupted_listing_keeps_received_records() {
    let catalog = FakeCatalog::playlist("mix06", "Mix", "Chan", numbered_items(2))
        .with_trailing_error("page 2 went missing");
    let mut h = harness(catalog, FakeRipper::new());

    h.engine.inspect("pmix06").await;
    wait_for_inspection_end(&mut h.events).await;

    assert_eq!(h.engine.videos().await.len(), 2);
    let errors = h.engine.errors(ErrorScope::Context).await;
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].fatal);
    assert!(errors[0].message.contains("page 2 went missing"));
}

// ============================================================================
// Fatal failures
// ============================================================================

#[tokio::test]
async fn test_unresolvable_subject_fails_the_inspection() {
    let mut h = harness(FakeCatalog::unresolvable("playlist gone"), FakeRipper::new());

    h.engine.inspect("pmissing").await;
    wait_for_event(&mut h.events, |event| {
        matches!(
            event,
            SessionEvent::TotalResolved {
                total: ExpectedTotal::Failed
            }
        )
    })
    .await;
    wait_for_event(&mut h.events, |event| {
        matches!(event, SessionEvent::ErrorsIncluded { fatal: true, .. })
    })
    .await;

    assert_eq!(
        h.engine.context().await.total,
        Some(ExpectedTotal::Failed)
    );
    let errors = h.engine.errors(ErrorScope::Context).await;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].fatal);
    assert!(errors[0].message.contains("playlist gone"));

    // The pipeline was cancelled, so no completion is announced.
    tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS * 3)).await;
    assert!(!drain_now(&mut h.events)
        .iter()
        .any(|event| matches!(event, SessionEvent::InspectionFinished)));
}

#[tokio::test]
async fn test_malformed_subject_is_fatal() {
    let mut h = harness(
        FakeCatalog::playlist("mix", "Mix", "Chan", numbered_items(1)),
        FakeRipper::new(),
    );

    h.engine.inspect("xnope").await;
    wait_for_event(&mut h.events, |event| {
        matches!(
            event,
            SessionEvent::TotalResolved {
                total: ExpectedTotal::Failed
            }
        )
    })
    .await;

    let errors = h.engine.errors(ErrorScope::Context).await;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].fatal);
    assert_eq!(h.catalog.about_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_subject_is_ignored() {
    let mut h = harness(
        FakeCatalog::playlist("mix", "Mix", "Chan", numbered_items(1)),
        FakeRipper::new(),
    );

    h.engine.inspect("   ").await;
    tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS * 3)).await;

    let events = drain_now(&mut h.events);
    assert!(events
        .iter()
        .all(|event| matches!(event, SessionEvent::InspectionStarted { .. })));
    assert_eq!(h.catalog.about_calls.load(Ordering::SeqCst), 0);
    assert!(h.engine.videos().await.is_empty());
    assert_eq!(h.engine.context().await.total, None);
    assert!(h.engine.all_errors().await.is_empty());
}

// ============================================================================
// Debounce and supersession
// ============================================================================

#[tokio::test]
async fn test_fast_retypes_only_inspect_the_last_subject() {
    let mut h = harness(
        FakeCatalog::playlist("mix03", "Mix", "Chan", numbered_items(3)),
        FakeRipper::new(),
    );

    h.engine.inspect("pfirst").await;
    h.engine.inspect("psecond").await;
    h.engine.inspect("pmix03").await;
    wait_for_inspection_end(&mut h.events).await;

    assert_eq!(h.catalog.about_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.catalog.items_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.engine.context().await.subject, "pmix03");
    assert_eq!(h.engine.videos().await.len(), 3);
}

#[tokio::test]
async fn test_new_subject_supersedes_running_inspection() {
    let catalog = FakeCatalog::playlist("mix04", "Long Mix", "Chan", numbered_items(14))
        .with_item_delay(Duration::from_millis(5));
    let mut h = harness(catalog, FakeRipper::new());

    h.engine.inspect("pfirst").await;
    wait_for_event(&mut h.events, |event| {
        matches!(event, SessionEvent::VideosIncluded { .. })
    })
    .await;

    h.engine.inspect("psecond").await;
    wait_for_inspection_end(&mut h.events).await;

    // Only the second inspection's records survive; stale batches from
    // the first are dropped whole.
    assert_eq!(h.engine.videos().await.len(), 14);
    assert_eq!(h.engine.context().await.subject, "psecond");
    assert_eq!(h.catalog.about_calls.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Navigation and session-wide requests
// ============================================================================

#[tokio::test]
async fn test_external_jump_starts_an_inspection() {
    let item = raw_item("jump1", "Some - Body", "Chan", "PT2M");
    let mut h = harness(FakeCatalog::single(item), FakeRipper::new());
    h.engine.bootstrap().await.unwrap();

    h.navigator.jump("vjump1");
    wait_for_inspection_end(&mut h.events).await;

    assert_eq!(h.engine.videos().await.len(), 1);
    assert_eq!(
        h.engine.context().await.subject,
        "https://www.youtube.com/watch?v=jump1"
    );
}

#[tokio::test]
async fn test_clear_resets_session_and_location() {
    let mut h = harness(
        FakeCatalog::playlist("mix07", "Mix", "Chan", numbered_items(2)),
        FakeRipper::new(),
    );
    h.engine.bootstrap().await.unwrap();
    h.engine.inspect("pmix07").await;
    wait_for_inspection_end(&mut h.events).await;

    h.engine.clear().await;
    wait_for_event(&mut h.events, |event| {
        matches!(event, SessionEvent::SessionCleared)
    })
    .await;

    assert!(h.engine.videos().await.is_empty());
    assert_eq!(h.engine.context().await.total, None);
    assert!(h.engine.all_errors().await.is_empty());
    assert_eq!(h.navigator.current_path(), "");
    assert_eq!(h.navigator.title(), "Tuberip");
}

#[tokio::test]
async fn test_session_format_applies_to_new_records() {
    let mut h = harness(
        FakeCatalog::playlist("mix08", "Mix", "Chan", numbered_items(1)),
        FakeRipper::new(),
    );

    h.engine.inspect("pmix08").await;
    // Within the debounce window, before anything is normalized.
    h.engine.configure(Codec::Opus).await;
    wait_for_inspection_end(&mut h.events).await;

    assert_eq!(h.engine.videos().await[0].format, Codec::Opus);
}
