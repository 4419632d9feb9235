use std::path::Path;

use crate::config::Config;
use crate::errors::BuildError;
use crate::process::ToolCommand;

/// Immediate subdirectories of the repository base directory, sorted.
///
/// Anything that is a directory counts as a repository; whether it is a
/// usable checkout is the operator's problem, exactly as in the deployment
/// model where checkouts are created and removed out of band.
pub fn list_repos(repos_dir: &Path) -> std::io::Result<Vec<String>> {
    let mut repos = Vec::new();
    for entry in std::fs::read_dir(repos_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            repos.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    repos.sort();
    Ok(repos)
}

/// Remote branch short names for a repository, in the order git reports them.
pub async fn list_branches(config: &Config, repo: &str) -> Result<Vec<String>, BuildError> {
    let output = ToolCommand::new(&config.git_cmd, config.repo_dir(repo))
        .args(["ls-remote", "--heads"])
        .capture()
        .await?;
    Ok(output.lines().filter_map(parse_ref_line).collect())
}

/// Parse one `git ls-remote --heads` line into the branch short name:
/// `"<sha>\trefs/heads/feature/login"` becomes `"login"`.
fn parse_ref_line(line: &str) -> Option<String> {
    let reference = line.trim().split('\t').nth(1)?;
    let name = reference.rsplit('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
