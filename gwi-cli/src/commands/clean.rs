//! `gwi clean`

use super::Context;

pub async fn execute(ctx: &Context) -> anyhow::Result<()> {
    let lifecycle = ctx.lifecycle().await?;
    let report = lifecycle.clean().await?;
    tracing::debug!(
        orphaned = report.orphaned.len(),
        deleted = report.deleted.len(),
        "Clean finished"
    );
    Ok(())
}
