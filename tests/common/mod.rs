use std::env;

use replication_harness::ClusterObserver;
use replication_harness::DatabaseIdentity;
use replication_harness::HarnessConfig;
use tracing::info;

/// Hex identity of a database published to the compose cluster, with the
/// counter module (`start`, `send_message`) the probes expect.
pub const DATABASE_IDENTITY_ENV: &str = "REPLICATION_DATABASE_IDENTITY";

pub struct TestContext {
    pub observer: ClusterObserver,
}

impl TestContext {
    /// Loads configuration from the environment and brings the compose project up.
    pub async fn setup() -> TestContext {
        let config = HarnessConfig::new()
            .and_then(HarnessConfig::validate)
            .expect("invalid harness configuration");

        let raw = env::var(DATABASE_IDENTITY_ENV)
            .unwrap_or_else(|_| panic!("{DATABASE_IDENTITY_ENV} must be set for cluster tests"));
        let identity = DatabaseIdentity::parse(&raw).expect("invalid database identity");

        let observer = ClusterObserver::from_config(identity, &config).expect("build observer");
        observer.ensure_cluster_up().await.expect("compose up failed");

        info!("Cluster up for database 0x{}", observer.identity());
        TestContext { observer }
    }

    /// Brings back any container a scenario stopped.
    pub async fn teardown(self) {
        if let Err(e) = self.observer.ensure_cluster_up().await {
            eprintln!("teardown: compose up failed: {e}");
        }
    }

    pub async fn current_leader(&self) -> u64 {
        self.observer
            .wait_for_leader(None)
            .await
            .expect("leader query failed")
            .expect("no leader elected")
    }

    pub async fn assert_rows_present(
        &self,
        ids: &[u64],
    ) {
        for &id in ids {
            assert!(
                self.observer.row_exists(id).await.expect("read failed"),
                "row {id} missing after failover"
            );
        }
    }
}

/// `(first, first + 1), (first + 2, first + 3), ...` for `iterations` rounds
pub fn row_pairs(
    first: u64,
    iterations: u64,
) -> Vec<(u64, u64)> {
    (0..iterations)
        .map(|i| (first + 2 * i, first + 2 * i + 1))
        .collect()
}
