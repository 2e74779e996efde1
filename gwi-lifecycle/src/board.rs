//! Best-effort board synchronization

use gwi_github::BoardStatus;
use tracing::{debug, warn};

use crate::{Error, Lifecycle, Result};

impl Lifecycle {
    /// Move an issue to `status` on its project boards
    ///
    /// Any failure becomes a warning, except cancellation, which still stops
    /// the command.
    pub(crate) async fn sync_board(&self, issue: u64, status: BoardStatus) -> Result<()> {
        if !self.board.enabled() {
            debug!(issue, "Project board updates disabled");
            return Ok(());
        }

        let value = status.value(self.board.settings());
        match self.board.set_status(issue, status).await {
            Ok(update) if update.updated > 0 => {
                self.reporter.info(&format!(
                    "Updated issue #{} to '{}' in GitHub Projects",
                    issue, value
                ));
            }
            Ok(_) => debug!(issue, "Issue not on any project board"),
            Err(e) => {
                let e = Error::from(e);
                if e.is_cancelled() {
                    return Err(e);
                }
                warn!(issue, value, error = %e, "Project board update failed");
                self.reporter
                    .warn(&format!("Failed to update project status: {}", e));
            }
        }
        Ok(())
    }
}
