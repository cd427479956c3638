pub mod mock_feed;
pub mod mock_stores;

use std::time::Duration;
use streamwarden::{AccountId, CredentialRef, PolicyFlags, TrackedAccount, WardenConfig};

/// Configuration with windows short enough for tests.
pub fn test_config() -> WardenConfig {
    WardenConfig::builder()
        .sample_interval(Duration::from_millis(50))
        .idle_timeout(Duration::from_millis(300))
        .cooldown_window(Duration::from_millis(400))
        .debounce_quiet(Duration::from_millis(100))
        .metrics_interval(Duration::from_secs(5))
        .build()
        .expect("test config should be valid")
}

pub fn tracked_account(id: &str, flags: PolicyFlags) -> TrackedAccount {
    TrackedAccount {
        id: AccountId::from(id),
        credentials: CredentialRef::new(format!("cred-{id}")),
        flags,
        deactivated: false,
    }
}

pub fn blocking_flags() -> PolicyFlags {
    PolicyFlags {
        block_new_accounts: true,
        block_low_followers: true,
    }
}

/// Polls `condition` every 10 ms until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
