//! GitHub API client.
//!
//! The client only knows how to build requests and decode replies; every byte
//! goes through an [`HttpTransport`], so tests can script the API.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::query::SearchFilter;

use super::error::{GitHubError, status_error};
use super::response::{SearchReply, classify_search, retry_after_of};
use super::types::{
    CodeSearchPage, DetailsData, DetailsVariables, GraphQlRequest, GraphQlResponse,
    RepositoryDetails, SearchVariables, TreeResponse,
};

/// Default API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Results per page of REST code search (the API maximum).
pub const CODE_SEARCH_PER_PAGE: u32 = 100;

const SEARCH_QUERY: &str = include_str!("search.graphql");
const DETAILS_QUERY: &str = include_str!("details.graphql");

/// Authenticated GitHub client.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    token: String,
    api_url: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client for the public API.
    pub fn new(transport: Arc<dyn HttpTransport>, token: impl Into<String>) -> Self {
        Self::with_api_url(transport, token, DEFAULT_API_URL)
    }

    /// Create a client for another API root (GitHub Enterprise, test servers).
    pub fn with_api_url(
        transport: Arc<dyn HttpTransport>,
        token: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            token: token.into(),
            api_url,
        }
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// URL of the GraphQL endpoint.
    #[must_use]
    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.api_url)
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request.with_header("Authorization", format!("bearer {}", self.token))
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, GitHubError> {
        let method = request.method.as_str();
        let url = request.url.clone();
        let response = self.transport.send(self.authorize(request)).await?;
        tracing::debug!(method, url = %url, status = response.status, "GitHub response");
        Ok(response)
    }

    async fn graphql<V: serde::Serialize>(
        &self,
        query: &str,
        variables: V,
    ) -> Result<HttpResponse, GitHubError> {
        let body = GraphQlRequest { query, variables };
        let request = HttpRequest::post_json(self.graphql_url(), &body)?;
        self.send(request).await
    }

    async fn rest_get<T: DeserializeOwned>(&self, url: String) -> Result<T, GitHubError> {
        let request = HttpRequest::get(url).with_header("Accept", "application/vnd.github+json");
        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(status_error(
                response.status,
                response.reason(),
                retry_after_of(&response),
            ));
        }
        serde_json::from_slice(&response.body).map_err(GitHubError::decode)
    }

    /// Fetch one page of the repository search.
    ///
    /// Transport failures are returned as [`GitHubError::Http`]; anything the
    /// server said, including error payloads, is returned as a classified
    /// [`SearchReply`].
    pub async fn search_repositories(
        &self,
        filter: &SearchFilter,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<SearchReply, GitHubError> {
        let variables = SearchVariables {
            filter: filter.to_string(),
            repositories_per_page: page_size,
            cursor,
        };
        let response = self.graphql(SEARCH_QUERY, variables).await?;
        classify_search(&response)
    }

    /// Fetch the detail record of one repository.
    ///
    /// Returns `Ok(None)` when the repository does not exist (or is not
    /// visible to the token).
    pub async fn repository_details(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<RepositoryDetails>, GitHubError> {
        let response = self
            .graphql(DETAILS_QUERY, DetailsVariables { owner, name })
            .await?;
        if !response.is_success() {
            return Err(status_error(
                response.status,
                response.reason(),
                retry_after_of(&response),
            ));
        }
        let reply: GraphQlResponse<DetailsData> =
            serde_json::from_slice(&response.body).map_err(GitHubError::decode)?;
        let repository = reply.data.and_then(|d| d.repository);
        match (repository, reply.errors.as_deref().and_then(<[_]>::first)) {
            (Some(repository), _) => Ok(Some(repository)),
            (None, Some(error)) if error.kind.as_deref() == Some("NOT_FOUND") => Ok(None),
            (None, Some(error)) => Err(GitHubError::api(error.message.clone())),
            (None, None) => Ok(None),
        }
    }

    /// Fetch one page of REST code search.
    pub async fn search_code(&self, query: &str, page: u32) -> Result<CodeSearchPage, GitHubError> {
        let url = format!(
            "{}/search/code?q={}&per_page={CODE_SEARCH_PER_PAGE}&page={page}",
            self.api_url,
            urlencoding::encode(query)
        );
        self.rest_get(url).await
    }

    /// Fetch the recursive tree of the default branch of `owner/name`.
    pub async fn tree(&self, full_name: &str) -> Result<TreeResponse, GitHubError> {
        let url = format!("{}/repos/{full_name}/git/trees/HEAD?recursive=1", self.api_url);
        self.rest_get(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport, header_get};
    use chrono::NaiveDate;
    use serde_json::json;

    const API: &str = "https://api.test";

    fn client(transport: &MockTransport) -> GitHubClient {
        GitHubClient::with_api_url(Arc::new(transport.clone()), "secret", format!("{API}/"))
    }

    #[tokio::test]
    async fn search_sends_query_variables_and_bearer_token() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            format!("{API}/graphql"),
            json!({"data": {"search": {
                "repositoryCount": 0,
                "pageInfo": {"endCursor": null, "hasNextPage": false},
                "nodes": []
            }}}),
        );
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let filter = SearchFilter::new(1000, None, 120, today);

        client(&transport)
            .search_repositories(&filter, 8, Some("abc"))
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(header_get(&request.headers, "authorization"), Some("bearer secret"));
        let body = &transport.json_bodies()[0];
        assert!(body["query"].as_str().unwrap().contains("repositoryCount"));
        assert_eq!(body["variables"]["repositoriesPerPage"], 8);
        assert_eq!(body["variables"]["cursor"], "abc");
        assert_eq!(body["variables"]["filter"], filter.to_string());
    }

    #[tokio::test]
    async fn search_transport_failure_is_transient() {
        let transport = MockTransport::new();
        transport.push_failure(HttpMethod::Post, format!("{API}/graphql"), "reset");
        let filter = SearchFilter::new(1, None, 1, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        let err = client(&transport)
            .search_repositories(&filter, 1, None)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn code_search_encodes_query() {
        let transport = MockTransport::new();
        let url = format!(
            "{API}/search/code?q=%22import%20rpa%22%20in%3Afile&per_page=100&page=3"
        );
        transport.push_json(HttpMethod::Get, url, json!({"total_count": 0, "items": []}));
        let page = client(&transport)
            .search_code("\"import rpa\" in:file", 3)
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn code_search_forbidden_is_rate_limited() {
        let transport = MockTransport::new();
        let url = format!("{API}/search/code?q=extension%3Arobot&per_page=100&page=1");
        transport.push_response(
            HttpMethod::Get,
            url,
            HttpResponse {
                status: 403,
                headers: vec![],
                body: b"{}".to_vec(),
            },
        );
        let err = client(&transport)
            .search_code("extension:robot", 1)
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn details_not_found_is_none_and_other_errors_fail() {
        let transport = MockTransport::new();
        let url = format!("{API}/graphql");
        transport.push_json(
            HttpMethod::Post,
            &url,
            json!({"data": {"repository": null}, "errors": [{"type": "NOT_FOUND", "message": "Could not resolve"}]}),
        );
        transport.push_json(
            HttpMethod::Post,
            &url,
            json!({"errors": [{"message": "Bad credentials"}]}),
        );
        let client = client(&transport);

        assert!(client.repository_details("a", "gone").await.unwrap().is_none());
        let err = client.repository_details("a", "b").await.unwrap_err();
        assert!(matches!(err, GitHubError::Api { message } if message == "Bad credentials"));

        let body = &transport.json_bodies()[0];
        assert_eq!(body["variables"], json!({"owner": "a", "name": "gone"}));
    }

    #[tokio::test]
    async fn tree_requests_recursive_head() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            format!("{API}/repos/a/b/git/trees/HEAD?recursive=1"),
            json!({"sha": "x", "tree": [{"path": "config.yml", "type": "blob"}], "truncated": false}),
        );
        let tree = client(&transport).tree("a/b").await.unwrap();
        assert_eq!(tree.tree.len(), 1);
    }
}
