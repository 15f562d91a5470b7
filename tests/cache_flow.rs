//! End-to-end engine flow: write/read round trips, stream duplication
//! semantics, error bookkeeping, and write coalescing.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use bytes::Bytes;
use fresco::{ArtifactStream, CacheConfig, CacheEngine, EntryDraft, StreamError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("fresco=debug")
        .try_init();
}

fn draft(payload: &'static str) -> EntryDraft {
    EntryDraft::new(ArtifactStream::from_chunk(payload))
        .tags(["build"])
        .expire(60.0)
        .revalidate(300.0)
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let engine = CacheEngine::default();

    engine.set("artifact:a", async { draft("alpha") }).await;

    let hit = engine.get("artifact:a", &[]).await.expect("fresh entry");
    assert_eq!(hit.tags, vec!["build".to_string()]);
    assert_eq!(hit.expire, 60.0);
    assert_eq!(hit.revalidate, 300.0);

    let body = hit.value.collect().await.expect("payload");
    assert_eq!(&body[..], b"alpha");

    let status = engine.status("artifact:a").expect("record");
    assert!(!status.is_errored);
    assert_eq!(status.error_retry_count, 0);
    assert_eq!(status.size, 5);
}

#[tokio::test]
async fn reading_an_entry_does_not_consume_it() {
    let engine = CacheEngine::default();
    engine.set("artifact:a", async { draft("alpha") }).await;

    let first = engine.get("artifact:a", &[]).await.expect("first read");
    let second = engine.get("artifact:a", &[]).await.expect("second read");

    assert_eq!(first.tags, second.tags);
    assert_eq!(first.timestamp, second.timestamp);
    assert_eq!(first.expire, second.expire);
    assert_eq!(first.revalidate, second.revalidate);

    assert_eq!(&first.value.collect().await.expect("first payload")[..], b"alpha");
    assert_eq!(&second.value.collect().await.expect("second payload")[..], b"alpha");
}

#[tokio::test]
async fn a_discarded_read_leaves_the_entry_viable() {
    let engine = CacheEngine::default();
    engine.set("artifact:a", async { draft("alpha") }).await;

    // Take a hit and drop its stream unconsumed.
    let abandoned = engine.get("artifact:a", &[]).await.expect("hit");
    drop(abandoned);

    let survivor = engine.get("artifact:a", &[]).await.expect("hit");
    assert_eq!(&survivor.value.collect().await.expect("payload")[..], b"alpha");
}

#[tokio::test]
async fn last_write_wins() {
    let engine = CacheEngine::default();

    engine.set("artifact:a", async { draft("alpha") }).await;
    engine.set("artifact:a", async { draft("beta") }).await;

    let hit = engine.get("artifact:a", &[]).await.expect("hit");
    assert_eq!(&hit.value.collect().await.expect("payload")[..], b"beta");
    assert_eq!(engine.entry_count(), 1);
}

#[tokio::test]
async fn multi_chunk_payloads_report_total_size() {
    let engine = CacheEngine::default();
    let value = ArtifactStream::from_chunks(vec![
        Bytes::from_static(b"abc"),
        Bytes::from_static(b"defg"),
    ]);
    engine
        .set("artifact:a", async {
            EntryDraft::new(value).tags(["build"]).expire(60.0).revalidate(300.0)
        })
        .await;

    assert_eq!(engine.status("artifact:a").expect("record").size, 7);
    let hit = engine.get("artifact:a", &[]).await.expect("hit");
    assert_eq!(&hit.value.collect().await.expect("payload")[..], b"abcdefg");
}

#[tokio::test]
async fn missing_tags_mark_the_record_errored() {
    let engine = CacheEngine::default();
    let untagged = || EntryDraft::new(ArtifactStream::from_chunk("x")).expire(60.0).revalidate(10.0);

    engine.set("artifact:a", async { untagged() }).await;
    assert!(engine.get("artifact:a", &[]).await.is_none());

    let status = engine.status("artifact:a").expect("record");
    assert!(status.is_errored);
    assert_eq!(status.error_retry_count, 1);
    assert_eq!(status.size, 1);

    // Each failed write keeps counting against the same key.
    engine.set("artifact:a", async { untagged() }).await;
    assert_eq!(engine.status("artifact:a").expect("record").error_retry_count, 2);

    // A successful write replaces the errored record and resets the count.
    engine.set("artifact:a", async { draft("fixed") }).await;
    let status = engine.status("artifact:a").expect("record");
    assert!(!status.is_errored);
    assert_eq!(status.error_retry_count, 0);

    let hit = engine.get("artifact:a", &[]).await.expect("hit");
    assert_eq!(&hit.value.collect().await.expect("payload")[..], b"fixed");
}

#[tokio::test]
async fn non_positive_windows_mark_the_record_errored() {
    let engine = CacheEngine::default();

    engine
        .set("artifact:a", async {
            EntryDraft::new(ArtifactStream::from_chunk("x"))
                .tags(["build"])
                .expire(0.0)
                .revalidate(10.0)
        })
        .await;
    assert!(engine.status("artifact:a").expect("record").is_errored);

    engine
        .set("artifact:b", async {
            EntryDraft::new(ArtifactStream::from_chunk("x"))
                .tags(["build"])
                .expire(60.0)
                .revalidate(-1.0)
        })
        .await;
    assert!(engine.status("artifact:b").expect("record").is_errored);
}

#[tokio::test]
async fn stream_fault_records_partial_size() {
    let engine = CacheEngine::default();
    let source = stream! {
        yield Ok(Bytes::from_static(b"abc"));
        yield Err(StreamError::new("upstream reset"));
    };

    engine
        .set("artifact:a", async {
            EntryDraft::new(ArtifactStream::new(source))
                .tags(["build"])
                .expire(60.0)
                .revalidate(10.0)
        })
        .await;

    let status = engine.status("artifact:a").expect("record");
    assert!(status.is_errored);
    assert_eq!(status.error_retry_count, 1);
    assert_eq!(status.size, 3);
    assert!(engine.get("artifact:a", &[]).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn readers_wait_for_the_inflight_write() {
    init_tracing();
    let engine = Arc::new(CacheEngine::default());
    engine.set("artifact:a", async { draft("old") }).await;

    let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();
    let writer_engine = Arc::clone(&engine);
    let writer = tokio::spawn(async move {
        writer_engine
            .set("artifact:a", async move {
                gate_rx.await.ok();
                draft("new")
            })
            .await;
    });

    // Let the writer register its pending marker and park on the gate.
    tokio::time::sleep(Duration::from_millis(1)).await;

    let reader_engine = Arc::clone(&engine);
    let reader = tokio::spawn(async move { reader_engine.get("artifact:a", &[]).await });

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(!reader.is_finished());

    gate_tx.send(()).expect("writer is parked on the gate");
    writer.await.expect("writer completes");

    let entry = reader.await.expect("reader task").expect("hit");
    assert_eq!(&entry.value.collect().await.expect("payload")[..], b"new");
}

#[tokio::test(start_paused = true)]
async fn a_failing_write_still_releases_its_readers() {
    init_tracing();
    let engine = Arc::new(CacheEngine::default());

    let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();
    let writer_engine = Arc::clone(&engine);
    let writer = tokio::spawn(async move {
        writer_engine
            .set("artifact:a", async move {
                gate_rx.await.ok();
                // No tags: this write will be recorded as errored.
                EntryDraft::new(ArtifactStream::from_chunk("x")).expire(60.0).revalidate(10.0)
            })
            .await;
    });

    tokio::time::sleep(Duration::from_millis(1)).await;

    let reader_engine = Arc::clone(&engine);
    let reader = tokio::spawn(async move { reader_engine.get("artifact:a", &[]).await });

    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(!reader.is_finished());

    gate_tx.send(()).expect("writer is parked on the gate");
    writer.await.expect("writer completes");

    // The reader was released and observed the errored record as a miss.
    assert!(reader.await.expect("reader task").is_none());
    assert!(engine.status("artifact:a").expect("record").is_errored);
}

#[tokio::test]
async fn disabled_engine_misses_and_discards_writes() {
    let engine = CacheEngine::new(CacheConfig {
        enabled: false,
        ..Default::default()
    });

    engine.set("artifact:a", async { draft("alpha") }).await;

    assert!(engine.get("artifact:a", &[]).await.is_none());
    assert_eq!(engine.entry_count(), 0);
    assert!(engine.status("artifact:a").is_none());
}

#[tokio::test]
async fn clear_resets_the_engine() {
    let engine = CacheEngine::default();
    engine.set("artifact:a", async { draft("alpha") }).await;
    engine.expire_tags(["build"]);

    engine.clear();

    assert!(engine.get("artifact:a", &[]).await.is_none());
    assert_eq!(engine.entry_count(), 0);

    // A fresh write after teardown is unaffected by the old tag stamps.
    engine.set("artifact:b", async { draft("beta") }).await;
    assert!(engine.get("artifact:b", &[]).await.is_some());
}
