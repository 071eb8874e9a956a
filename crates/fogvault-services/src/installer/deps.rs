//! Post-install dependency script.

use std::path::Path;

/// Run `script` from `plugin_dir` with `sh` if it exists.
///
/// Returns a warning when the script could not be started or exited with
/// a failure status. The install itself is never failed by this step.
pub async fn run_requirements(plugin_dir: &Path, script: &str) -> Option<String> {
    let script_path = plugin_dir.join(script);
    if !script_path.is_file() {
        return None;
    }

    tracing::info!(script = %script_path.display(), "installing external dependencies");
    let output = tokio::process::Command::new("sh")
        .arg(&script_path)
        .current_dir(plugin_dir)
        .output()
        .await;

    let warning = match output {
        Ok(output) if output.status.success() => return None,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            format!(
                "{script} exited with {}: {}",
                output.status,
                stderr.trim()
            )
        }
        Err(e) => format!("failed to run {script}: {e}"),
    };
    tracing::warn!(plugin_dir = %plugin_dir.display(), "{warning}");
    Some(warning)
}
