//! `sprig pack` command implementation.

use camino::Utf8PathBuf;
use sprig_build::compress_to_file;
use sprig_core::error::SprigResult;

use super::CommandContext;

/// Write the gzip project archive, by default to `<name>.sprig.gz`
pub async fn execute(
    out: Option<Utf8PathBuf>,
    editor: Option<String>,
    ctx: &CommandContext,
) -> SprigResult<()> {
    let mut project = ctx.open_project().await?;
    project.load().await?;

    let bytes = compress_to_file(&project, editor.as_deref()).await?;
    let out = match out {
        Some(path) => path,
        None => Utf8PathBuf::from(format!("{}.sprig.gz", project.root_config()?.name)),
    };

    let path = ctx.write_output(&out, &bytes).await?;
    ctx.output.success(&format!("Packed {} ({} bytes)", path, bytes.len()));
    Ok(())
}
