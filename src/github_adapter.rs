use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use crate::config::GitHubConfig;
use crate::error::{TaskError, TaskResult};

pub const GITHUB_CREDENTIAL_HINT: &str =
    "Set GITHUB_TOKEN (or github.token in the config file) to a personal access token.";

/// `owner/name` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse `owner/name`, also accepting a full github.com URL
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_start_matches("github.com/")
            .trim_end_matches(".git")
            .trim_matches('/');
        let (owner, name) = trimmed.split_once('/')?;
        let name = name.split('/').next().unwrap_or(name);
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Read-only source-control operations
#[async_trait]
pub trait SourceControlProvider: Send + Sync {
    async fn list_commits(&self, repo: &RepoRef, since: Option<&str>, per_page: u32) -> TaskResult<Value>;
    async fn list_issues(&self, repo: &RepoRef, state: &str, per_page: u32) -> TaskResult<Value>;
    async fn get_repository(&self, repo: &RepoRef) -> TaskResult<Value>;
    async fn list_user_repositories(&self, user: &str, per_page: u32) -> TaskResult<Value>;
    async fn search_repositories(&self, query: &str, per_page: u32) -> TaskResult<Value>;
}

/// GitHub REST client; works unauthenticated against public data
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig, timeout: Duration) -> TaskResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("taskwright/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn get_json(&self, request: RequestBuilder) -> TaskResult<Value> {
        let mut request = request
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TaskError::from_status(status, &error_text, GITHUB_CREDENTIAL_HINT));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SourceControlProvider for GitHubClient {
    async fn list_commits(&self, repo: &RepoRef, since: Option<&str>, per_page: u32) -> TaskResult<Value> {
        let path = format!("/repos/{}/{}/commits", repo.owner, repo.name);
        let per_page = per_page.to_string();
        let mut request = self.client.get(self.url(&path)).query(&[("per_page", per_page.as_str())]);
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }
        self.get_json(request).await
    }

    async fn list_issues(&self, repo: &RepoRef, state: &str, per_page: u32) -> TaskResult<Value> {
        let path = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let per_page = per_page.to_string();
        let request = self
            .client
            .get(self.url(&path))
            .query(&[("state", state), ("per_page", per_page.as_str())]);
        self.get_json(request).await
    }

    async fn get_repository(&self, repo: &RepoRef) -> TaskResult<Value> {
        let path = format!("/repos/{}/{}", repo.owner, repo.name);
        self.get_json(self.client.get(self.url(&path))).await
    }

    async fn list_user_repositories(&self, user: &str, per_page: u32) -> TaskResult<Value> {
        let path = format!("/users/{}/repos", urlencoding::encode(user));
        let per_page = per_page.to_string();
        let request = self
            .client
            .get(self.url(&path))
            .query(&[("sort", "updated"), ("per_page", per_page.as_str())]);
        self.get_json(request).await
    }

    async fn search_repositories(&self, query: &str, per_page: u32) -> TaskResult<Value> {
        let per_page = per_page.to_string();
        let request = self
            .client
            .get(self.url("/search/repositories"))
            .query(&[("q", query), ("per_page", per_page.as_str())]);
        self.get_json(request).await
    }
}
