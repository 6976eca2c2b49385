//! Same as the election loop, but the leader is cut off the network instead
//! of killed, then reconnected.

use std::time::Duration;

use replication_harness::FailureAction;
use replication_harness::RecoveryAction;
use serial_test::serial;
use tracing_test::traced_test;

use crate::common::row_pairs;
use crate::common::TestContext;

const ITERATIONS: u64 = 5;

#[tokio::test]
#[traced_test]
#[serial]
#[ignore = "needs a running compose cluster"]
async fn test_leader_disconnect_in_loop() {
    let ctx = TestContext::setup().await;
    let observer = &ctx.observer;
    let replicas_before = observer.replica_count().await.unwrap();

    let pairs = row_pairs(201, ITERATIONS);
    for &(first_id, second_id) in &pairs {
        let current = ctx.current_leader().await;
        observer.ensure_leader_health(first_id).await.unwrap();

        let container_id = observer
            .fail_leader(FailureAction::Disconnect)
            .await
            .unwrap();

        let next = observer.wait_for_leader(Some(current)).await.unwrap();
        assert!(next.is_some(), "no new leader after disconnecting node {current}");
        assert_ne!(next, Some(current));

        observer.ensure_leader_health(second_id).await.unwrap();

        observer
            .restore_leader(&container_id, RecoveryAction::Connect)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(observer.replica_count().await.unwrap(), replicas_before);
    }

    let ids: Vec<u64> = pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
    ctx.assert_rows_present(&ids).await;
    ctx.teardown().await;
}
