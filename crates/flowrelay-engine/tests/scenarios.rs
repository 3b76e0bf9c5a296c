//! End-to-end runs against in-memory connectors.

mod common;

use std::sync::Arc;

use common::{TestEngine, logged};
use flowrelay_core::RunStatus;
use flowrelay_store::{ExecutionStore, StoreResult};
use flowrelay_test_support::fixtures::{attachment, filter, flow, item};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn filtered_out_items_are_skipped_and_not_counted() {
    let mut config = flow("Invoices");
    config.filter = filter("acme.com", "", true, &[]);
    let harness = TestEngine::new(config);
    harness.source.push_item(item(
        "m1",
        "billing@acme.com",
        "March invoice",
        vec![attachment("a1", "invoice.pdf", 64)],
    ));
    harness
        .source
        .push_item(item("m2", "billing@acme.com", "Reminder", Vec::new()));

    let record = harness.run().await;

    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.items_processed, 1);
    assert_eq!(record.payloads_transferred, 1);
    assert!(record.errors.is_empty());
    assert!(logged(&record, "skipped item m2"));
    assert_eq!(
        harness.destination.files_at(&harness.destination_path()),
        vec!["invoice.pdf"]
    );
    let query = harness.source.last_query().expect("listing query");
    assert_eq!(query.sender.as_deref(), Some("acme.com"));
    assert!(query.attachment_required);
}

#[tokio::test]
async fn oversized_attachment_is_an_item_error_not_a_run_failure() {
    let harness = TestEngine::new(flow("Large"));
    harness.source.push_item(item(
        "m1",
        "ops@example.com",
        "backups",
        vec![
            attachment("small", "notes.txt", 128),
            attachment("huge", "dump.tar", 2 * 1_024 * 1_024),
        ],
    ));

    let record = harness.run().await;

    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.items_processed, 1);
    assert_eq!(record.payloads_transferred, 1);
    assert_eq!(record.errors.len(), 1);
    assert!(record.errors[0].contains("dump.tar"));
    assert!(record.errors[0].contains("exceeding"));
    assert_eq!(harness.source.fetched(), vec!["small"]);
    assert_eq!(harness.destination.upload_calls(), 1);
}

#[tokio::test]
async fn unreachable_destination_fails_before_listing() -> StoreResult<()> {
    let harness = TestEngine::new(flow("Offline"));
    harness
        .source
        .push_item(item("m1", "a@b", "s", vec![attachment("a1", "a.txt", 1)]));
    harness.destination.set_reachable(false);

    let record = harness.run().await;

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.items_processed, 0);
    assert_eq!(record.payloads_transferred, 0);
    assert_eq!(record.errors, vec!["drive connection failed".to_string()]);
    assert_eq!(harness.source.list_calls(), 0);
    assert!(harness.destination.containers().is_empty());

    let stored = harness.store.list_by_flow(harness.flow.id, 10).await?;
    assert_eq!(stored, vec![record]);
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_between_items_and_keeps_partial_counts() -> StoreResult<()> {
    let harness = TestEngine::new(flow("Cancelled"));
    for n in 1..=3 {
        harness.source.push_item(item(
            &format!("m{n}"),
            "a@b",
            "s",
            vec![attachment(&format!("a{n}"), &format!("file{n}.txt"), 4)],
        ));
    }
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    harness
        .source
        .on_fetch(Arc::new(move |_attachment_id: &str| trigger.cancel()));

    let record = harness.engine.run(harness.flow.id, cancel).await;

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.items_processed, 1);
    assert_eq!(record.payloads_transferred, 1);
    assert_eq!(record.errors, vec!["run cancelled".to_string()]);
    assert_eq!(harness.source.fetched(), vec!["a1"]);
    assert_eq!(
        harness.destination.files_at(&harness.destination_path()),
        vec!["file1.txt"]
    );
    assert_eq!(harness.store.list_by_flow(harness.flow.id, 10).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unreachable_source_names_the_service() {
    let harness = TestEngine::new(flow("NoMail"));
    harness.source.set_reachable(false);

    let record = harness.run().await;

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.errors, vec!["mail connection failed".to_string()]);
}

#[tokio::test]
async fn extension_filter_transfers_only_allowed_attachments() {
    let mut config = flow("Reports");
    config.filter = filter("", "report", false, &["pdf"]);
    let harness = TestEngine::new(config);
    harness.source.push_item(item(
        "m1",
        "a@b",
        "Weekly report",
        vec![
            attachment("a1", "summary.PDF", 10),
            attachment("a2", "chart.png", 10),
        ],
    ));
    harness
        .source
        .push_item(item("m2", "a@b", "Weekly report", vec![attachment("a3", "raw.csv", 10)]));

    let record = harness.run().await;

    assert_eq!(record.status, RunStatus::Completed);
    assert_eq!(record.items_processed, 1);
    assert_eq!(record.payloads_transferred, 1);
    assert_eq!(harness.source.fetched(), vec!["a1"]);
    assert!(logged(&record, "skipped item m2"));
}

#[tokio::test]
async fn auto_generated_path_uses_run_start_month() {
    let mut config = flow("Receipts");
    config.auto_generate_path = true;
    let harness = TestEngine::new(config);
    harness
        .source
        .push_item(item("m1", "a@b", "s", vec![attachment("a1", "r.pdf", 1)]));

    let record = harness.run().await;

    let expected = format!(
        "Email Attachments/Receipts/{}",
        record.started_at.format("%Y-%m")
    );
    assert_eq!(harness.destination.files_at(&expected), vec!["r.pdf"]);
}
