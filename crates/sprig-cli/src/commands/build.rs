//! `sprig build` command implementation.
//!
//! Writes the compile options of the installed project as JSON, to a file
//! with `--out` or to stdout.

use camino::Utf8PathBuf;
use sprig_build::BuildAssembler;
use sprig_core::error::{SprigError, SprigResult};

use super::CommandContext;

pub async fn execute(out: Option<Utf8PathBuf>, ctx: &CommandContext) -> SprigResult<()> {
    let mut project = ctx.open_project().await?;
    let assembler = BuildAssembler::load(&mut project).await?;
    let options = assembler.compile_options().await?;

    let json = serde_json::to_string_pretty(&options)
        .map_err(|e| SprigError::json("Failed to serialize compile options".to_string(), e))?;

    match out {
        Some(path) => {
            let path = ctx.write_output(&path, json.as_bytes()).await?;
            ctx.output.success(&format!(
                "{} source files written to {}",
                options.source_files.len(),
                path
            ));
        }
        None => ctx.output.print(&json),
    }
    Ok(())
}
