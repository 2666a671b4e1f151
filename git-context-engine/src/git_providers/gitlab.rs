//! GitLab provider (REST v4) for merge request resources.
//!
//! Endpoints used:
//!   * GET  /users/:id
//!   * GET  /projects/:id
//!   * GET  /projects/:id/merge_requests/:iid
//!   * GET  /projects/:id/merge_requests/:iid/changes
//!   * GET  /projects/:id/merge_requests/:iid/approvals
//!   * POST /projects/:id/merge_requests/:iid/approve

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::{
    GitContextEngineConfigError, GitContextEngineError, GitContextEngineResult, ProviderError,
    RemoteResource,
};
use crate::git_providers::ProviderConfig;
use crate::git_providers::types::*;

/// GitLab HTTP client wrapper.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String, // e.g. "https://gitlab.com/api/v4"
    token: String,    // "PRIVATE-TOKEN"
    fetch_timeout: Duration,
}

impl GitLabClient {
    /// Constructs a GitLab client with a shared HTTP instance and auth token.
    pub fn new(http: Client, base_api: String, token: String, fetch_timeout: Duration) -> Self {
        debug!("Creating GitLabClient with base_api={}", base_api);
        Self {
            http,
            base_api: base_api.trim_end_matches('/').to_string(),
            token,
            fetch_timeout,
        }
    }

    /// Builds the client from generic configuration.
    ///
    /// The underlying HTTP client carries a stable user agent so that GitLab
    /// can identify the integration.
    pub fn from_config(cfg: ProviderConfig) -> GitContextEngineResult<Self> {
        if cfg.token.trim().is_empty() {
            return Err(GitContextEngineConfigError::MissingToken.into());
        }
        if !(cfg.base_api.starts_with("http://") || cfg.base_api.starts_with("https://")) {
            return Err(GitContextEngineConfigError::InvalidBaseUrl(cfg.base_api).into());
        }

        let http = Client::builder()
            .user_agent("git-context-engine/0.1")
            .build()
            .map_err(|e| GitContextEngineConfigError::HttpClient(e.to_string()))?;

        Ok(Self::new(http, cfg.base_api, cfg.token, cfg.fetch_timeout))
    }

    /// Fetches the five resources describing one merge request.
    ///
    /// All requests are issued concurrently and joined fail-fast: the first
    /// error drops the remaining in-flight requests and no bundle is produced.
    pub async fn fetch_all(
        &self,
        author_id: u64,
        id: &ChangeRequestId,
    ) -> GitContextEngineResult<MrBundle> {
        debug!(
            project = %id.project,
            iid = id.iid,
            author_id,
            "GitLab fetch_all"
        );

        let (user, project, merge_request, changes, approvals) = tokio::try_join!(
            self.get_user(author_id),
            self.get_project(&id.project),
            self.get_merge_request(id),
            self.get_changes(id),
            self.get_approvals(id),
        )?;

        debug!(
            project = %id.project,
            iid = id.iid,
            files = changes.changes.len(),
            approvals = approvals.approved_by.len(),
            "GitLab fetch_all complete"
        );

        Ok(MrBundle {
            user,
            project,
            merge_request,
            changes,
            approvals,
        })
    }

    pub async fn get_user(&self, user_id: u64) -> GitContextEngineResult<GitLabUser> {
        let url = format!("{}/users/{}", self.base_api, user_id);
        self.fetch(RemoteResource::User, url).await
    }

    pub async fn get_project(&self, project: &str) -> GitContextEngineResult<GitLabProject> {
        let url = format!(
            "{}/projects/{}",
            self.base_api,
            urlencoding::encode(project)
        );
        self.fetch(RemoteResource::Project, url).await
    }

    pub async fn get_merge_request(
        &self,
        id: &ChangeRequestId,
    ) -> GitContextEngineResult<GitLabMergeRequest> {
        let url = self.merge_request_url(id, "");
        self.fetch(RemoteResource::MergeRequest, url).await
    }

    pub async fn get_changes(&self, id: &ChangeRequestId) -> GitContextEngineResult<GitLabChanges> {
        let url = self.merge_request_url(id, "/changes");
        self.fetch(RemoteResource::Changes, url).await
    }

    pub async fn get_approvals(
        &self,
        id: &ChangeRequestId,
    ) -> GitContextEngineResult<GitLabApprovals> {
        let url = self.merge_request_url(id, "/approvals");
        self.fetch(RemoteResource::Approvals, url).await
    }

    /// Approves the merge request on behalf of the token owner.
    pub async fn approve(&self, id: &ChangeRequestId) -> GitContextEngineResult<()> {
        let url = self.merge_request_url(id, "/approve");
        debug!("GitLab approve: {}", url);

        self.http
            .post(url)
            .header("PRIVATE-TOKEN", &self.token)
            .timeout(self.fetch_timeout)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    fn merge_request_url(&self, id: &ChangeRequestId, suffix: &str) -> String {
        format!(
            "{}/projects/{}/merge_requests/{}{}",
            self.base_api,
            urlencoding::encode(&id.project),
            id.iid,
            suffix
        )
    }

    /// GET + decode with the per-resource deadline; every failure is tagged
    /// with the resource it came from.
    async fn fetch<T: DeserializeOwned>(
        &self,
        resource: RemoteResource,
        url: String,
    ) -> GitContextEngineResult<T> {
        debug!(%resource, "GitLab GET {}", url);

        let request = async {
            self.http
                .get(&url)
                .header("PRIVATE-TOKEN", &self.token)
                .send()
                .await?
                .error_for_status()?
                .json::<T>()
                .await
        };

        match tokio::time::timeout(self.fetch_timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(GitContextEngineError::fetch(resource, e)),
            Err(_) => Err(GitContextEngineError::fetch(resource, ProviderError::Timeout)),
        }
    }
}
