//! Kill every follower so the leader loses its majority; writes must stop
//! being accepted within a bounded number of attempts.

use std::time::Duration;

use serial_test::serial;
use tracing_test::traced_test;

use crate::common::TestContext;

const MAX_WRITES: usize = 1001;

#[tokio::test]
#[traced_test]
#[serial]
#[ignore = "needs a running compose cluster"]
async fn test_quorum_loss() {
    let ctx = TestContext::setup().await;
    let observer = &ctx.observer;
    ctx.current_leader().await;

    for i in 0..11 {
        observer.send_message(&i.to_string()).await.unwrap();
    }

    let killed = observer.fail_followers().await.unwrap();
    assert!(!killed.is_empty(), "no follower containers matched");
    tokio::time::sleep(Duration::from_secs(2)).await;

    let rejected_at = observer.write_until_rejected(MAX_WRITES).await.unwrap();
    assert!(
        rejected_at.is_some(),
        "leader accepted {MAX_WRITES} writes without a quorum"
    );

    ctx.teardown().await;
}
