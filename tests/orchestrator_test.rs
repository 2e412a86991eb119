mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{init, ScriptedFactory, MODEL_ID};
use moodring::{
    ClassificationResult, ModelLoader, Orchestrator, Update, WorkerMessage, LOADING_TEXT,
};
use tokio_test::assert_ok;

fn orchestrator() -> Orchestrator {
    Orchestrator::spawn(Arc::new(ModelLoader::new(ScriptedFactory::new())), 16)
}

/// Applies updates until the request is answered, returning everything seen.
async fn settle(orchestrator: &mut Orchestrator, id: u64) -> Vec<Update> {
    let mut updates = Vec::new();
    loop {
        let update = tokio::time::timeout(Duration::from_secs(5), orchestrator.next_update())
            .await
            .expect("worker should answer in time")
            .expect("worker should still be running");
        let done = matches!(update, Update::Result(r) | Update::Failed(r) if r == id);
        updates.push(update);
        if done {
            return updates;
        }
    }
}

#[tokio::test]
async fn test_initial_state() {
    init();
    let mut orchestrator = orchestrator();

    assert_eq!(orchestrator.ready(), None);
    assert_eq!(orchestrator.status_text(), None);
    assert_eq!(orchestrator.last_request(), None);
    assert!(orchestrator.is_loading());
    assert!(assert_ok!(orchestrator.poll()).is_empty());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_loading_text_until_first_result() {
    init();
    let mut orchestrator = orchestrator();

    let update = orchestrator.apply(WorkerMessage::Initiate { model: MODEL_ID.into() });
    assert_eq!(update, Update::Loading);
    assert_eq!(orchestrator.ready(), Some(false));
    assert_eq!(orchestrator.status_text().as_deref(), Some(LOADING_TEXT));

    orchestrator.apply(WorkerMessage::Ready { model: MODEL_ID.into() });
    assert_eq!(orchestrator.status_text().as_deref(), Some(LOADING_TEXT));
    assert!(orchestrator.is_loading());

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_single_text_produces_result_and_sentiment() {
    init();
    let mut orchestrator = orchestrator();

    let id = assert_ok!(orchestrator.classify("I feel okay"));
    let updates = settle(&mut orchestrator, id).await;

    assert_eq!(updates.first(), Some(&Update::Loading));
    assert!(updates.contains(&Update::Ready));
    assert_eq!(orchestrator.ready(), Some(true));
    assert!(!orchestrator.is_loading());
    assert_eq!(orchestrator.result(), Some(&[ClassificationResult::new("LABEL_1", 0.87)][..]));

    let view = orchestrator.sentiment().expect("sentiment view");
    assert_eq!(view.primary, ClassificationResult::new("LABEL_1", 0.87));
    assert_eq!(view.complementary, ClassificationResult::new("NON-NEUTRAL", 0.0));

    let text = orchestrator.status_text().expect("status text");
    assert!(text.contains("\"label\": \"LABEL_1\""));
    assert!(text.contains("0.87"));

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_batch_sentiment() {
    init();
    let mut orchestrator = orchestrator();

    let items = vec!["great day".into(), "terrible day".into()];
    let id = assert_ok!(orchestrator.classify_items(items));
    settle(&mut orchestrator, id).await;

    let view = orchestrator.sentiment().expect("sentiment view");
    assert_eq!(view.primary, ClassificationResult::new("POSITIVE", 0.9));
    assert_eq!(view.complementary.label, "NON-POSITIVE");
    assert!((view.complementary.score - 0.8).abs() < 1e-6);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_superseded_responses_are_discarded() {
    init();
    let mut orchestrator = orchestrator();

    let first = assert_ok!(orchestrator.classify("great day"));
    let second = assert_ok!(orchestrator.classify("terrible day"));
    assert_eq!(orchestrator.last_request(), Some(second));

    let updates = settle(&mut orchestrator, second).await;
    assert!(updates.contains(&Update::Stale(first)));
    assert!(!updates.contains(&Update::Result(first)));
    assert_eq!(orchestrator.result(), Some(&[ClassificationResult::new("NEGATIVE", 0.8)][..]));

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_unknown_request_id_is_stale() {
    init();
    let mut orchestrator = orchestrator();

    let update = orchestrator.apply(WorkerMessage::Complete {
        request_id: 99,
        output: vec![ClassificationResult::new("POSITIVE", 1.0)],
    });
    assert_eq!(update, Update::Stale(99));
    assert_eq!(orchestrator.result(), None);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_error_is_shown_and_cleared_by_next_request() {
    init();
    let mut orchestrator = orchestrator();

    let id = assert_ok!(orchestrator.classify("   "));
    let updates = settle(&mut orchestrator, id).await;
    assert_eq!(updates.last(), Some(&Update::Failed(id)));
    assert!(!orchestrator.is_loading());
    let text = orchestrator.status_text().expect("status text");
    assert!(text.starts_with("Error: "));

    let next = assert_ok!(orchestrator.classify("great day"));
    assert_eq!(orchestrator.failure(), None);
    settle(&mut orchestrator, next).await;
    assert_eq!(orchestrator.result(), Some(&[ClassificationResult::new("POSITIVE", 0.9)][..]));

    orchestrator.shutdown().await;
}
