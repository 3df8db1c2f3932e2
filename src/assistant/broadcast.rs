//! Sequential fan-out of one message to every known recipient.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::assistant::platform::{MessageRef, Platform, SendOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Copy `source` to each recipient in turn, one send at a time.
///
/// A rate-limit answer pauses the whole loop for the requested time and then
/// retries the same recipient. Any other failure is counted and skipped.
pub async fn run(
    platform: &dyn Platform,
    source: MessageRef,
    recipients: &[i64],
    delay: Duration,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    info!("📣 Broadcasting message {} to {} recipients", source.message_id, recipients.len());

    for &recipient in recipients {
        loop {
            match platform.copy_message(recipient, source).await {
                SendOutcome::Delivered(_) => {
                    report.delivered += 1;
                    sleep(delay).await;
                }
                SendOutcome::RateLimited(wait) => {
                    warn!("Rate limited while sending to {}, waiting {:?}", recipient, wait);
                    sleep(wait).await;
                    continue;
                }
                SendOutcome::Forbidden => {
                    debug!("Recipient {} blocked the bot", recipient);
                    report.failed += 1;
                }
                SendOutcome::Failed(e) => {
                    warn!("Failed to deliver broadcast to {}: {}", recipient, e);
                    report.failed += 1;
                }
            }
            break;
        }
    }

    info!(
        "📣 Broadcast finished: {} delivered, {} failed",
        report.delivered, report.failed
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::mock::MockPlatform;
    use tokio::time::Instant;

    const SOURCE: MessageRef = MessageRef { chat_id: 1, message_id: 77 };

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_recipient_is_counted_and_skipped() {
        let platform = MockPlatform::new();
        platform.script_copy(103, vec![SendOutcome::Forbidden]);

        let recipients = [101, 102, 103, 104, 105];
        let report = run(&platform, SOURCE, &recipients, Duration::from_millis(50)).await;

        assert_eq!(report, BroadcastReport { delivered: 4, failed: 1 });
        assert_eq!(platform.copy_attempts(), recipients.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_then_retries_same_recipient() {
        let platform = MockPlatform::new();
        platform.script_copy(
            102,
            vec![SendOutcome::RateLimited(Duration::from_secs(2)), SendOutcome::Delivered(9)],
        );

        let started = Instant::now();
        let report = run(&platform, SOURCE, &[101, 102, 103], Duration::ZERO).await;

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(report, BroadcastReport { delivered: 3, failed: 0 });
        assert_eq!(platform.copy_attempts(), vec![101, 102, 102, 103]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_forbidden_counts_once() {
        let platform = MockPlatform::new();
        platform.script_copy(
            102,
            vec![SendOutcome::RateLimited(Duration::from_secs(1)), SendOutcome::Forbidden],
        );

        let report = run(&platform, SOURCE, &[101, 102], Duration::ZERO).await;
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_do_not_abort() {
        let platform = MockPlatform::new();
        platform.script_copy(101, vec![SendOutcome::Failed("chat not found".into())]);
        platform.script_copy(102, vec![SendOutcome::Failed("bad request".into())]);

        let report = run(&platform, SOURCE, &[101, 102, 103], Duration::ZERO).await;
        assert_eq!(report, BroadcastReport { delivered: 1, failed: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applies_after_each_delivery() {
        let platform = MockPlatform::new();
        let started = Instant::now();
        run(&platform, SOURCE, &[1, 2, 3, 4], Duration::from_millis(50)).await;
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_empty_recipient_list() {
        let platform = MockPlatform::new();
        let report = run(&platform, SOURCE, &[], Duration::from_millis(50)).await;
        assert_eq!(report, BroadcastReport::default());
    }
}
