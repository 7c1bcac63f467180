// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue replenishment policy against the in-memory queue.

use outdial_campaign::queue::Replenisher;
use outdial_core::CallQueueStore;
use outdial_core::types::{Candidate, CandidateStatus};
use outdial_test_utils::{MemoryQueue, MockRecordService, RecordCall, candidate};

const CAMPAIGN: &str = "camp-1";

fn candidates(range: std::ops::RangeInclusive<u32>) -> Vec<Candidate> {
    range.map(|n| candidate(&format!("c{n}"))).collect()
}

async fn replenish(queue: &MemoryQueue, records: &MockRecordService, agents: usize) -> usize {
    Replenisher { queue, records }
        .replenish(CAMPAIGN, "flow-1", agents)
        .await
        .unwrap()
}

#[tokio::test]
async fn fills_up_to_three_per_agent() {
    let queue = MemoryQueue::new();
    let records = MockRecordService::new();
    records
        .set_candidates(CandidateStatus::Pending, candidates(1..=12))
        .await;

    assert_eq!(replenish(&queue, &records, 2).await, 6);

    assert_eq!(
        queue.pending_ids(CAMPAIGN).await,
        vec!["c1", "c2", "c3", "c4", "c5", "c6"]
    );
    assert_eq!(
        records.calls().await,
        vec![RecordCall::Fetch {
            status: "0".into(),
            limit: 10
        }]
    );
}

#[tokio::test]
async fn skips_fetch_at_low_water() {
    let queue = MemoryQueue::new();
    let records = MockRecordService::new();
    records
        .set_candidates(CandidateStatus::Pending, candidates(1..=4))
        .await;
    replenish(&queue, &records, 2).await;
    let fetches = records.calls().await.len();

    // Depth 4 with two agents is at the low-water mark.
    assert_eq!(replenish(&queue, &records, 2).await, 0);
    assert_eq!(records.calls().await.len(), fetches);
}

#[tokio::test]
async fn falls_back_to_failed_candidates() {
    let queue = MemoryQueue::new();
    let records = MockRecordService::new();
    records
        .set_candidates(CandidateStatus::Failed, vec![candidate("f1")])
        .await;

    assert_eq!(replenish(&queue, &records, 1).await, 1);

    let statuses: Vec<String> = records
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            RecordCall::Fetch { status, .. } => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec!["0", "2"]);
    assert_eq!(queue.pending_ids(CAMPAIGN).await, vec!["f1"]);
}

#[tokio::test]
async fn drops_incomplete_and_duplicate_candidates() {
    let queue = MemoryQueue::new();
    let records = MockRecordService::new();
    let no_phone = Candidate {
        phone: None,
        ..candidate("c2")
    };
    records
        .set_candidates(
            CandidateStatus::Pending,
            vec![candidate("c1"), no_phone, candidate("c1"), candidate("c3")],
        )
        .await;

    assert_eq!(replenish(&queue, &records, 1).await, 2);
    assert_eq!(queue.pending_ids(CAMPAIGN).await, vec!["c1", "c3"]);
}

#[tokio::test]
async fn used_entries_block_reinsert_and_count_toward_depth() {
    let queue = MemoryQueue::new();
    let records = MockRecordService::new();
    records
        .set_candidates(CandidateStatus::Pending, candidates(1..=3))
        .await;
    replenish(&queue, &records, 1).await;

    queue.pop_next(CAMPAIGN).await.unwrap();
    queue.pop_next(CAMPAIGN).await.unwrap();
    assert_eq!(queue.count(CAMPAIGN).await.unwrap(), 3);

    queue.remove_used(CAMPAIGN, "c1").await.unwrap();
    queue.remove_used(CAMPAIGN, "c2").await.unwrap();
    // Depth 1 is below low water; only c1 and c2 may return, c3 is still queued.
    assert_eq!(replenish(&queue, &records, 1).await, 2);
    assert_eq!(queue.pending_ids(CAMPAIGN).await, vec!["c3", "c1", "c2"]);
}

#[tokio::test]
async fn no_agents_means_no_fetch() {
    let queue = MemoryQueue::new();
    let records = MockRecordService::new();

    assert_eq!(replenish(&queue, &records, 0).await, 0);
    assert!(records.calls().await.is_empty());
}
