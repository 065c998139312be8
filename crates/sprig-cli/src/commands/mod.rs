//! Command implementations and dispatch logic.
//!
//! Every command opens the project in the working directory through a
//! [`CommandContext`], which layers the configuration sources into one
//! session and wires a file-system host to the package sources.

use std::collections::HashMap;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use sprig_config::ConfigLoader;
use sprig_core::error::{SprigError, SprigResult};
use sprig_host::{FsHost, PackageSources};
use sprig_resolver::Project;
use tracing::{debug, info};

pub mod build;
pub mod conflicts;
pub mod deps;
pub mod install;
pub mod pack;
pub mod publish;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    /// Explicit target description, if given
    pub target: Option<Utf8PathBuf>,
    pub offline: bool,
}

impl CommandContext {
    pub fn new(target: Option<Utf8PathBuf>, offline: bool) -> SprigResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| SprigError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| SprigError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("Working directory is not valid UTF-8: {}", path.display()),
        })?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            target,
            offline,
        })
    }

    /// Project rooted at the working directory, not yet loaded
    pub async fn open_project(&self) -> SprigResult<Project> {
        let mut overrides = HashMap::new();
        if self.offline {
            overrides.insert("offline".to_string(), "true".to_string());
        }

        let target = self.target.as_ref().map(|path| self.resolve(path));
        let session = ConfigLoader::new(self.cwd.clone())
            .load_session(target.as_deref(), overrides)
            .await?;
        debug!(
            "session target {} v{}",
            session.target.id,
            session.target.target_version()
        );

        let sources = Arc::new(PackageSources::from_session(&session)?);
        let host = FsHost::new(self.cwd.clone()).with_sources(sources.clone());
        Ok(Project::new(Arc::new(host), sources))
    }

    /// `path` relative to the working directory
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.cwd.join(path)
    }

    /// Write `contents` to `path`, creating parent directories
    pub async fn write_output(&self, path: &Utf8Path, contents: &[u8]) -> SprigResult<Utf8PathBuf> {
        let path = self.resolve(path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SprigError::io(format!("Failed to create {}", parent), e))?;
        }
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| SprigError::io(format!("Failed to write {}", path), e))?;
        Ok(path)
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> SprigResult<()> {
    match command {
        Commands::Install => {
            info!("Installing dependencies");
            install::execute(ctx).await
        }
        Commands::Deps { dot } => deps::execute(dot, ctx).await,
        Commands::Conflicts { id, version } => {
            info!("Checking {}@{} for conflicts", id, version);
            conflicts::execute(id, version, ctx).await
        }
        Commands::Build { out } => build::execute(out, ctx).await,
        Commands::Publish { dry_run, out } => {
            info!("Collecting files to publish (dry_run: {})", dry_run);
            publish::execute(dry_run, out, ctx).await
        }
        Commands::Pack { out, editor } => pack::execute(out, editor, ctx).await,
    }
}
