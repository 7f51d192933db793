//! Reminder fan-out — one direct message per confirmed attendee, each
//! delivery isolated so a single unreachable recipient never aborts the
//! rest. Partial failure is tallied, never escalated.

use std::collections::HashSet;

use muster_core::traits::Transport;
use muster_core::types::UserId;

/// Outcome of a fan-out pass. `attempted == 0` means the recipient set was
/// empty and no deliveries were tried, which is distinct from attempts
/// that all failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

impl ReminderReport {
    /// True when the fan-out was skipped for lack of recipients.
    pub fn skipped(&self) -> bool {
        self.attempted == 0
    }
}

/// Deliver `render(user)` to every recipient independently.
pub async fn fan_out<F>(
    transport: &dyn Transport,
    recipients: &HashSet<UserId>,
    render: F,
) -> ReminderReport
where
    F: Fn(&UserId) -> String,
{
    let mut report = ReminderReport::default();
    for user in recipients {
        report.attempted += 1;
        match transport.send_direct_message(user, &render(user)).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!("Failed to DM {user}: {e}");
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockTransport;

    #[tokio::test]
    async fn test_empty_set_skips_delivery() {
        let transport = MockTransport::new();
        let report = fan_out(&transport, &HashSet::new(), |u| format!("hi {u}")).await;
        assert_eq!(
            report,
            ReminderReport {
                attempted: 0,
                sent: 0,
                failed: 0
            }
        );
        assert!(report.skipped());
        assert!(transport.dms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_is_tallied() {
        let transport = MockTransport::new();
        transport.fail_dm_for(UserId::new("2"));
        let recipients: HashSet<UserId> =
            [UserId::new("1"), UserId::new("2"), UserId::new("3")].into();
        let report = fan_out(&transport, &recipients, |u| format!("hi {u}")).await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.skipped());
    }

    #[tokio::test]
    async fn test_all_failing_is_not_skipped() {
        let transport = MockTransport::new();
        transport.fail_dm_for(UserId::new("1"));
        let recipients: HashSet<UserId> = [UserId::new("1")].into();
        let report = fan_out(&transport, &recipients, |_| "hi".into()).await;
        assert_eq!(report.attempted, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.skipped());
    }
}
