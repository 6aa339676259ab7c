//! Test assertion helpers.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Polling interval for [`assert_eventually`].
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Polls a condition until it returns true or the timeout expires.
///
/// Uses tokio time, so under a paused clock (`start_paused = true`) the
/// polling advances virtual time instead of waiting.
///
/// Returns `true` if the condition became true before the timeout.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use tracklist_test_utils::assert_eventually;
///
/// # async fn example(session_loaded: impl Fn() -> bool) {
/// assert!(assert_eventually(Duration::from_secs(1), session_loaded).await);
/// # }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(POLL_INTERVAL).await;
    }
    condition()
}
