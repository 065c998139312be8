//! `sprig conflicts` command implementation.
//!
//! Reports what adding a package to the loaded project would conflict
//! with, without changing the project.

use sprig_core::error::SprigResult;
use sprig_resolver::Candidate;

use super::CommandContext;

pub async fn execute(id: String, version: String, ctx: &CommandContext) -> SprigResult<()> {
    let mut project = ctx.open_project().await?;
    project.load().await?;

    let conflicts = project.find_conflicts(Candidate::Id(id.clone()), &version).await?;
    if conflicts.is_empty() {
        ctx.output.success(&format!("{} can be added without conflicts", id));
        return Ok(());
    }

    ctx.output.error(&format!("{} conflicts with {} package(s)", id, conflicts.len()));
    for conflict in &conflicts {
        ctx.output.print(&conflict.to_string());
    }
    Ok(())
}
