//! `sprig install` command implementation.
//!
//! Loads the project in install mode: every dependency that is missing or
//! whose installed version differs from the resolved one is downloaded into
//! `sprig_modules/`.

use std::time::Instant;

use sprig_core::error::SprigResult;

use super::CommandContext;

pub async fn execute(ctx: &CommandContext) -> SprigResult<()> {
    let start_time = Instant::now();

    let mut project = ctx.open_project().await?;
    project.install_all().await?;

    let entries = project.dependency_tree();
    if entries.len() <= 1 {
        ctx.output.warn("No dependencies declared");
    }
    for entry in entries.iter().filter(|e| e.level > 0) {
        ctx.output.info(&format!("  {} {}", entry.id, entry.version));
    }

    let duration = start_time.elapsed();
    ctx.output.success(&format!(
        "{} dependencies installed in {:.2}s",
        entries.iter().filter(|e| e.level > 0).count(),
        duration.as_secs_f64()
    ));
    Ok(())
}
