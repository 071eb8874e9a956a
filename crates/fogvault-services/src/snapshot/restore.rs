//! Snapshot extraction strategies.
//!
//! Whether a restore can write into the plugin trees with the service's
//! own permissions is a property of the deployment, so every step that
//! touches those trees (setting plugin directories aside, unpacking, and
//! discarding or reinstating them) sits behind [`Extractor`] and is chosen
//! from configuration.

use std::fs::File;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use flate2::read::GzDecoder;
use fogvault_types::config::{RestoreConfig, RestoreMode};

use crate::error::{Result, ServiceError};

/// Unpacks a snapshot archive onto a root directory.
pub trait Extractor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Unpack `archive` (tar.gz) so member paths land relative to `root`.
    fn extract(&self, archive: &Path, root: &Path) -> Result<()>;

    /// Rename `from` to `to`. Both are siblings inside a plugin tree.
    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to).map_err(|e| {
            ServiceError::RestoreFailed(format!(
                "cannot move {} to {}: {e}",
                from.display(),
                to.display()
            ))
        })
    }

    /// Recursively remove `path`.
    fn remove(&self, path: &Path) -> Result<()> {
        let removed = match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
            Ok(_) => std::fs::remove_file(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        removed.map_err(|e| {
            ServiceError::RestoreFailed(format!("cannot remove {}: {e}", path.display()))
        })
    }
}

/// Build the extractor selected by `config`.
pub fn from_config(config: &RestoreConfig) -> Arc<dyn Extractor> {
    match config.mode {
        RestoreMode::InProcess => Arc::new(InProcessExtractor),
        RestoreMode::Command => Arc::new(
            CommandExtractor::new(config.command.clone())
                .with_privilege(config.privilege.clone()),
        ),
    }
}

/// Unpacks with the `tar` crate inside the service process.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessExtractor;

impl Extractor for InProcessExtractor {
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn extract(&self, archive: &Path, root: &Path) -> Result<()> {
        let file = File::open(archive)?;
        let mut tar = tar::Archive::new(GzDecoder::new(file));
        tar.set_preserve_permissions(true);
        tar.set_preserve_mtime(true);
        tar.set_overwrite(true);
        tar.unpack(root)
            .map_err(|e| ServiceError::RestoreFailed(format!("{}: {e}", archive.display())))
    }
}

/// Runs an external command, typically a privileged `tar`.
///
/// Directory moves and removals go through `mv` and `rm` behind the same
/// privilege prefix, so the service needs no write access to the trees.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    argv: Vec<String>,
    privilege: Vec<String>,
}

impl CommandExtractor {
    /// `argv` may contain the `{archive}` and `{root}` placeholders.
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            privilege: Vec::new(),
        }
    }

    /// Prefix (for example `sudo`) for the `mv` and `rm` calls.
    pub fn with_privilege(mut self, privilege: Vec<String>) -> Self {
        self.privilege = privilege;
        self
    }

    /// The argv with placeholders filled in.
    pub fn render(&self, archive: &Path, root: &Path) -> Vec<String> {
        let archive = archive.to_string_lossy();
        let root = root.to_string_lossy();
        self.argv
            .iter()
            .map(|arg| arg.replace("{archive}", &archive).replace("{root}", &root))
            .collect()
    }
}

impl Extractor for CommandExtractor {
    fn name(&self) -> &'static str {
        "command"
    }

    fn extract(&self, archive: &Path, root: &Path) -> Result<()> {
        run(&self.render(archive, root))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        run(&self.prefixed(["mv", "--"], [from, to]))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        run(&self.prefixed(["rm", "-rf", "--"], [path]))
    }
}

impl CommandExtractor {
    fn prefixed<const N: usize, const M: usize>(
        &self,
        tool: [&str; N],
        paths: [&Path; M],
    ) -> Vec<String> {
        self.privilege
            .iter()
            .cloned()
            .chain(tool.into_iter().map(String::from))
            .chain(paths.into_iter().map(|p| p.to_string_lossy().into_owned()))
            .collect()
    }
}

fn run(argv: &[String]) -> Result<()> {
    let Some((program, args)) = argv.split_first() else {
        return Err(ServiceError::RestoreFailed("restore command is empty".into()));
    };

    tracing::debug!(program = %program, ?args, "running restore command");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ServiceError::RestoreFailed(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ServiceError::RestoreFailed(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}
