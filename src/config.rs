use std::path::PathBuf;

/// Runtime configuration, constructed once in `main` and passed down
/// explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory of pre-existing repository checkouts.
    pub repos_dir: PathBuf,
    /// Base directory receiving per-(repository, branch) build output.
    pub build_dir: PathBuf,
    /// External base URL for download links; falls back to the request host.
    pub public_url: Option<String>,
    pub git_cmd: String,
    pub xcodebuild_cmd: String,
    pub xcrun_cmd: String,
}

impl Config {
    /// Tool command names default to the plain PATH names and can be
    /// overridden through `HANGAR_GIT`, `HANGAR_XCODEBUILD` and `HANGAR_XCRUN`.
    pub fn new(repos_dir: PathBuf, build_dir: PathBuf, public_url: Option<String>) -> Self {
        Self {
            repos_dir,
            build_dir,
            public_url,
            git_cmd: env_or("HANGAR_GIT", "git"),
            xcodebuild_cmd: env_or("HANGAR_XCODEBUILD", "xcodebuild"),
            xcrun_cmd: env_or("HANGAR_XCRUN", "xcrun"),
        }
    }

    /// Working directory of a checked-out repository.
    pub fn repo_dir(&self, repo: &str) -> PathBuf {
        self.repos_dir.join(repo)
    }

    /// Output directory of a (repository, branch) build.
    pub fn output_dir(&self, repo: &str, branch: &str) -> PathBuf {
        self.build_dir.join(repo).join(branch)
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}
