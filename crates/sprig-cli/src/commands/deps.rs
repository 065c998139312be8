//! `sprig deps` command implementation.

use sprig_core::error::SprigResult;

use super::CommandContext;

/// Print the dependency listing, or the import graph with `dot`
pub async fn execute(dot: bool, ctx: &CommandContext) -> SprigResult<()> {
    let mut project = ctx.open_project().await?;
    project.load().await?;

    if dot {
        ctx.output.print(&project.to_dot());
        return Ok(());
    }

    for entry in project.dependency_tree() {
        let indent = "  ".repeat(entry.level);
        if entry.added_by.is_empty() {
            ctx.output.print(&format!("{}{} {}", indent, entry.id, entry.version));
        } else {
            ctx.output.print(&format!(
                "{}{} {} (added by {})",
                indent,
                entry.id,
                entry.version,
                entry.added_by.join(", ")
            ));
        }
    }
    Ok(())
}
