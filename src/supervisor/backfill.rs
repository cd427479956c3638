//! Catch-up fetch performed once per session start: one bounded historical
//! query covering the gap since the account's previous connection.

use crate::feed::history::MentionHistory;
use crate::model::TrackedAccount;
use crate::policy::decision::DecisionEngine;
use crate::runtime::telemetry::Telemetry;
use std::collections::HashSet;

/// Evaluates the senders of the account's most recent mentions. Conversations
/// commonly contain many mentions from the same sender; only the first
/// occurrence in the (most-recent-first) page represents them.
pub(crate) async fn backfill(
    history: &dyn MentionHistory,
    decisions: &DecisionEngine,
    telemetry: &Telemetry,
    account: &TrackedAccount,
    page: usize,
) {
    let records = match history.fetch_recent_mentions(account, page).await {
        Ok(records) => records,
        Err(err) => {
            telemetry.record_backfill_failure();
            tracing::warn!(account = %account.id, error = %err, "catch-up mention query failed");
            return;
        }
    };

    if records.is_empty() {
        return;
    }

    tracing::debug!(
        account = %account.id,
        mentions = records.len(),
        "evaluating catch-up mentions"
    );

    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.sender.id.clone()) {
            continue;
        }
        decisions.evaluate(account, &record.sender).await;
    }
}
