//! The block decision engine: evaluates a mention's sender against the
//! freshness and popularity thresholds and the recipient's policy flags.

use crate::model::{BlockCandidate, BlockCause, RemoteActor, TrackedAccount};
use crate::runtime::telemetry::Telemetry;
use crate::stores::{AccountStore, ActionQueue};
use chrono::{DateTime, Utc};
use std::sync::Arc;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyThresholds {
    /// Accounts younger than this many (fractional) days are "new".
    pub new_account_age_days: f64,
    /// Accounts with fewer followers than this are "low-follower".
    pub low_follower_threshold: u64,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            new_account_age_days: 7.0,
            low_follower_threshold: 15,
        }
    }
}

pub struct DecisionEngine {
    accounts: Arc<dyn AccountStore>,
    actions: Arc<dyn ActionQueue>,
    thresholds: PolicyThresholds,
    telemetry: Arc<Telemetry>,
}

impl DecisionEngine {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        actions: Arc<dyn ActionQueue>,
        thresholds: PolicyThresholds,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            accounts,
            actions,
            thresholds,
            telemetry,
        }
    }

    /// Evaluates one mention. At most one candidate is enqueued even when
    /// both thresholds hold; the age check takes priority because the
    /// recorded cause is visible in downstream action logs.
    pub async fn evaluate(&self, recipient: &TrackedAccount, actor: &RemoteActor) {
        self.telemetry.record_mention_evaluated();

        if actor.id == recipient.id {
            return;
        }
        let Some(created_at) = actor.created_at else {
            tracing::trace!(actor = %actor.id, "mention sender has no creation timestamp");
            return;
        };

        let age_days = fractional_age_days(created_at, Utc::now());
        let new_account = age_days < self.thresholds.new_account_age_days;
        let low_followers = actor.followers < self.thresholds.low_follower_threshold;
        if !new_account && !low_followers {
            return;
        }

        // The flags may have changed at any point during the connection's
        // lifetime; re-read them at decision time.
        let flags = match self.accounts.reload_policy_flags(&recipient.id).await {
            Ok(flags) => flags,
            Err(err) => {
                tracing::warn!(
                    account = %recipient.id,
                    target = %actor.id,
                    error = %err,
                    "policy reload failed; abandoning decision"
                );
                return;
            }
        };

        let cause = if new_account && flags.block_new_accounts {
            BlockCause::NewAccount
        } else if low_followers && flags.block_low_followers {
            BlockCause::LowFollowers
        } else {
            return;
        };

        let candidate = BlockCandidate {
            recipient: recipient.id.clone(),
            target: actor.id.clone(),
            cause,
        };
        tracing::info!(
            account = %recipient.id,
            target = %actor.id,
            cause = ?cause,
            age_days = format!("{age_days:.2}"),
            followers = actor.followers,
            "enqueueing auto-block"
        );

        match self.actions.enqueue_block(candidate).await {
            Ok(()) => self.telemetry.record_block_enqueued(),
            Err(err) => {
                tracing::error!(
                    account = %recipient.id,
                    target = %actor.id,
                    error = %err,
                    "failed to enqueue block action"
                );
            }
        }
    }
}

fn fractional_age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = now.signed_duration_since(created_at).num_milliseconds();
    millis as f64 / 1_000.0 / SECONDS_PER_DAY
}
