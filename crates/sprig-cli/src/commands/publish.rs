//! `sprig publish` command implementation.
//!
//! Collects the publishable file set of a public project. With
//! `--dry-run` the files are only listed; otherwise they are written to
//! the output directory.

use camino::Utf8PathBuf;
use sprig_build::files_to_be_published;
use sprig_core::error::SprigResult;

use super::CommandContext;

pub async fn execute(dry_run: bool, out: Utf8PathBuf, ctx: &CommandContext) -> SprigResult<()> {
    let mut project = ctx.open_project().await?;
    project.load().await?;

    let files = files_to_be_published(&project, false).await?;

    if dry_run {
        for (name, contents) in &files {
            ctx.output.print(&format!("{} ({} bytes)", name, contents.len()));
        }
        ctx.output.info(&format!("Dry run: {} files would be published", files.len()));
        return Ok(());
    }

    for (name, contents) in &files {
        ctx.write_output(&out.join(name), contents.as_bytes()).await?;
    }
    ctx.output.success(&format!("{} files written to {}", files.len(), ctx.resolve(&out)));
    Ok(())
}
