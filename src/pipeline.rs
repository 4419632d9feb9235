//! The build orchestration: a fixed sequence of external commands whose
//! combined output is exposed as one ordered, live chunk stream.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::errors::BuildError;
use crate::manifest::{self, BundleInfo};
use crate::process::ToolCommand;

/// Number of throwaway bytes emitted before the first banner so that
/// buffering intermediaries flush the response to the client right away.
const FLUSH_PADDING: usize = 1024;

/// Serializes builds that share a repository working directory.
///
/// Two overlapping pipelines would otherwise race their checkouts and pulls
/// in the same checkout. See DESIGN.md.
#[derive(Default)]
pub struct RepoLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RepoLocks {
    fn for_repo(&self, repo: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(repo.to_string()).or_default().clone()
    }
}

/// Drives checkout, pull, submodule update, platform build, packaging and
/// manifest writing for one (repository, branch) pair.
pub struct BuildPipeline {
    config: Arc<Config>,
    locks: RepoLocks,
}

impl BuildPipeline {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            locks: RepoLocks::default(),
        }
    }

    /// Start a build and return its live log as an ordered chunk stream.
    ///
    /// The stream ends after `Done!` on success, or after a single
    /// `error: ...` line when a step fails; no later step runs after a
    /// failure. The underlying task is detached, so a dropped stream does
    /// not cancel the remaining steps.
    pub fn stream(
        &self,
        repo: String,
        branch: String,
        base_url: String,
    ) -> BoxStream<'static, String> {
        let (tx, mut rx) = mpsc::channel::<String>(64);
        let config = Arc::clone(&self.config);
        let lock = self.locks.for_repo(&repo);

        tokio::spawn(async move {
            let _ = tx.send("\u{7f}".repeat(FLUSH_PADDING) + "\n").await;
            let _guard = lock.lock().await;
            if let Err(err) = run_steps(&config, &repo, &branch, &base_url, &tx).await {
                tracing::warn!(%repo, %branch, error = %err, "build failed");
                let _ = tx.send(format!("\nerror: {err}\n")).await;
            }
        });

        futures::stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed()
    }
}

async fn run_steps(
    config: &Config,
    repo: &str,
    branch: &str,
    base_url: &str,
    tx: &mpsc::Sender<String>,
) -> Result<(), BuildError> {
    let wd = config.repo_dir(repo);
    let output = config.output_dir(repo, branch);

    banner(tx, "Checking out branch...").await;
    git(config, &wd)
        .args(["checkout", "-B", branch, "-t"])
        .arg(format!("origin/{branch}"))
        .stream_into(tx)
        .await?;

    banner(tx, "Pulling from remote repository...").await;
    // --ff-only on purpose: the build wants exactly the remote tip, never a
    // merge of diverged local history.
    git(config, &wd)
        .args(["pull", "--ff-only"])
        .stream_into(tx)
        .await?;

    banner(tx, "Updating submodules...").await;
    git(config, &wd)
        .args(["submodule", "update", "--init", "--recursive"])
        .stream_into(tx)
        .await?;

    banner(tx, "Starting build...").await;
    ToolCommand::new(&config.xcodebuild_cmd, &wd)
        .args([
            "build",
            "-configuration",
            "Debug",
            "-arch",
            "armv7",
            "-sdk",
            "iphoneos",
        ])
        .stream_into(tx)
        .await?;

    tokio::fs::create_dir_all(&output).await?;

    let app = find_app_bundle(&wd)?;

    banner(tx, "Compiling app...").await;
    let ipa = output.join("application.ipa");
    ToolCommand::new(&config.xcrun_cmd, &wd)
        .args(["-sdk", "iphoneos", "PackageApplication"])
        .arg(app.to_string_lossy().into_owned())
        .arg("-o")
        .arg(ipa.to_string_lossy().into_owned())
        .stream_into(tx)
        .await?;

    banner(tx, "Writing plist...").await;
    let info = BundleInfo::from_app_bundle(&app)?;
    let ipa_url = format!("{base_url}/repo/{repo}/{branch}/application.ipa");
    manifest::write_manifest(&output.join("application.plist"), &info, &ipa_url)?;

    banner(tx, "Done!").await;
    Ok(())
}

fn git(config: &Config, wd: &Path) -> ToolCommand {
    ToolCommand::new(&config.git_cmd, wd)
}

async fn banner(tx: &mpsc::Sender<String>, line: &str) {
    let _ = tx.send(format!("{line}\n")).await;
}

/// First lexicographic `.app` bundle under the conventional build output
/// directory. Zero matches is a hard error, not an index panic.
fn find_app_bundle(wd: &Path) -> Result<PathBuf, BuildError> {
    let pattern = wd.join("build/Debug-iphoneos/*.app");
    let pattern = pattern.to_string_lossy();
    let mut matches: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| anyhow::anyhow!("bad bundle pattern {pattern}: {e}"))?
        .filter_map(Result::ok)
        .collect();
    matches.sort();
    matches
        .into_iter()
        .next()
        .ok_or_else(|| BuildError::ArtifactNotFound {
            pattern: pattern.into_owned(),
        })
}
