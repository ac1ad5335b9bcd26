// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Soft timeouts for slow collaborator calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

/// Awaits `fut` to completion, logging a warning if it is still running
/// after `warn_after`. The call is never cancelled. A zero threshold
/// disables the warning.
pub async fn watch<F>(operation: &'static str, warn_after: Duration, fut: F) -> F::Output
where
    F: Future,
{
    if warn_after.is_zero() {
        return fut.await;
    }
    let started = Instant::now();
    tokio::pin!(fut);
    tokio::select! {
        output = &mut fut => return output,
        _ = tokio::time::sleep(warn_after) => {
            warn!(
                operation,
                waited_ms = warn_after.as_millis() as u64,
                "still waiting, not cancelling"
            );
        }
    }
    let output = fut.await;
    info!(
        operation,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "slow call completed"
    );
    output
}
