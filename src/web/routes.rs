use std::convert::Infallible;

use askama::Template;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Response};
use futures::StreamExt;
use serde::Deserialize;

use super::pages::{BuildPage, IndexPage, RepoPage};
use super::{SharedState, WebError};
use crate::vcs;

/// `GET /`: every checked-out repository.
pub async fn index(State(state): State<SharedState>) -> Result<Html<String>, WebError> {
    let repos = vcs::list_repos(&state.config.repos_dir)
        .map_err(|e| WebError::Internal(format!("failed to read repository directory: {e}")))?;
    Ok(Html(IndexPage { repos }.render()?))
}

/// `GET /repo/{repo_name}`: remote branches of one repository.
pub async fn repo(
    State(state): State<SharedState>,
    Path(repo_name): Path<String>,
) -> Result<Html<String>, WebError> {
    let repo_name = checked_name(repo_name)?;
    ensure_repo_exists(&state, &repo_name)?;

    let branches = vcs::list_branches(&state.config, &repo_name).await?;
    Ok(Html(RepoPage { repo_name, branches }.render()?))
}

#[derive(Deserialize)]
pub struct StatusParams {
    rebuild: Option<String>,
}

/// `GET /repo/{repo_name}/{branch}/get`: build-status page. Any `rebuild`
/// value forces the "needs build" view even when output exists.
pub async fn build_status(
    State(state): State<SharedState>,
    Path((repo_name, branch)): Path<(String, String)>,
    Query(params): Query<StatusParams>,
    headers: HeaderMap,
) -> Result<Html<String>, WebError> {
    let repo_name = checked_name(repo_name)?;
    let branch = checked_name(branch)?;
    ensure_repo_exists(&state, &repo_name)?;

    let built = state.config.output_dir(&repo_name, &branch).exists();
    let needs_build = !built || params.rebuild.is_some();
    let plist_url = format!(
        "{}/repo/{repo_name}/{branch}/application.plist",
        base_url(&state, &headers)
    );

    Ok(Html(
        BuildPage {
            repo_name,
            branch,
            needs_build,
            plist_url,
        }
        .render()?,
    ))
}

/// `GET /repo/{repo_name}/{branch}/build`: trigger a build and stream its
/// log as the response body, chunk by chunk, while the build runs.
pub async fn run_build(
    State(state): State<SharedState>,
    Path((repo_name, branch)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let repo_name = checked_name(repo_name)?;
    let branch = checked_name(branch)?;
    ensure_repo_exists(&state, &repo_name)?;

    tracing::info!(repo = %repo_name, %branch, "build triggered");
    let base = base_url(&state, &headers);
    let chunks = state
        .pipeline
        .stream(repo_name, branch, base)
        .map(Ok::<_, Infallible>);

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(chunks))
        .unwrap()
        .into_response())
}

/// Artifact filenames servable from a build output directory.
const ARTIFACTS: [&str; 2] = ["application.ipa", "application.plist"];

/// `GET /repo/{repo_name}/{branch}/{file}`: download a build artifact.
pub async fn artifact(
    State(state): State<SharedState>,
    Path((repo_name, branch, file)): Path<(String, String, String)>,
) -> Result<Response, WebError> {
    let repo_name = checked_name(repo_name)?;
    let branch = checked_name(branch)?;
    if !ARTIFACTS.contains(&file.as_str()) {
        return Err(WebError::NotFound(format!("no such artifact: {file}")));
    }

    let path = state.config.output_dir(&repo_name, &branch).join(&file);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| WebError::NotFound(format!("{file} has not been built for this branch")))?;

    let mime = mime_guess::from_path(&file).first_or_octet_stream();
    Ok(Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .body(Body::from(bytes))
        .unwrap()
        .into_response())
}

/// Base URL for download links: the configured public URL when set,
/// otherwise the request host.
fn base_url(state: &SharedState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.config.public_url {
        return url.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

/// Path parameters never contain `/`, but reject dot names outright.
fn checked_name(name: String) -> Result<String, WebError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(WebError::NotFound(format!("invalid name: {name}")));
    }
    Ok(name)
}

fn ensure_repo_exists(state: &SharedState, repo: &str) -> Result<(), WebError> {
    if state.config.repo_dir(repo).is_dir() {
        Ok(())
    } else {
        Err(WebError::NotFound(format!("unknown repository: {repo}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_name_rejects_traversal() {
        assert!(checked_name("..".to_string()).is_err());
        assert!(checked_name(".".to_string()).is_err());
        assert!(checked_name("".to_string()).is_err());
        assert!(checked_name("a\\b".to_string()).is_err());
        assert!(checked_name("feature-login".to_string()).is_ok());
        assert!(checked_name("v1.2".to_string()).is_ok());
    }

    #[test]
    fn base_url_prefers_configured_public_url() {
        let config = crate::config::Config::new(
            std::path::PathBuf::from("repos"),
            std::path::PathBuf::from("build"),
            Some("https://builds.example.com/".to_string()),
        );
        let state = crate::web::AppState::new(config);

        let headers = HeaderMap::new();
        assert_eq!(base_url(&state, &headers), "https://builds.example.com");
    }

    #[test]
    fn base_url_falls_back_to_request_host() {
        let config = crate::config::Config::new(
            std::path::PathBuf::from("repos"),
            std::path::PathBuf::from("build"),
            None,
        );
        let state = crate::web::AppState::new(config);

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "buildbox:8080".parse().unwrap());
        assert_eq!(base_url(&state, &headers), "http://buildbox:8080");
    }
}
