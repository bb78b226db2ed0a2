//! GitHub API data types.
//!
//! Only the fields the collectors read are modelled. Search nodes are kept as
//! raw JSON objects because they are flattened into records field by field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{FieldValue, RepositoryRecord};

/// Envelope of every GraphQL reply.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

impl<T> GraphQlResponse<T> {
    /// The first reported error, if any.
    pub fn first_error(&self) -> Option<&GraphQlError> {
        self.errors.as_deref().and_then(<[GraphQlError]>::first)
    }
}

/// One entry of a GraphQL `errors` list.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl GraphQlError {
    /// Whether the server gave up because the query took too long.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.message.to_ascii_lowercase().contains("timeout")
    }
}

/// Request body of a GraphQL call.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

/// Variables of the repository search query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchVariables<'a> {
    pub filter: String,
    pub repositories_per_page: u32,
    pub cursor: Option<&'a str>,
}

/// `data` of the repository search query.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchData {
    pub search: SearchConnection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConnection {
    pub repository_count: u64,
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Variables of the repository details query.
#[derive(Debug, Clone, Serialize)]
pub struct DetailsVariables<'a> {
    pub owner: &'a str,
    pub name: &'a str,
}

/// `data` of the repository details query.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailsData {
    pub repository: Option<RepositoryDetails>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageConnection {
    #[serde(default)]
    pub nodes: Vec<Named>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    pub target: Option<CommitTarget>,
}

/// Target of the default branch; only commits carry a history.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitTarget {
    pub history: Option<TotalCount>,
}

/// Detailed metadata of a single repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDetails {
    pub name_with_owner: String,
    pub created_at: Option<String>,
    pub pushed_at: Option<String>,
    pub is_mirror: Option<bool>,
    pub disk_usage: Option<i64>,
    pub description: Option<String>,
    pub primary_language: Option<Named>,
    pub contributors: TotalCount,
    #[serde(default)]
    pub languages: Option<LanguageConnection>,
    pub watchers: TotalCount,
    pub stargazers: TotalCount,
    pub forks: TotalCount,
    pub issues: TotalCount,
    pub default_branch_ref: Option<BranchRef>,
    pub pull_requests: TotalCount,
    pub branches: TotalCount,
    pub tags: TotalCount,
    pub releases: TotalCount,
}

impl RepositoryDetails {
    /// Commit count of the default branch, when there is one.
    #[must_use]
    pub fn commits(&self) -> Option<i64> {
        self.default_branch_ref
            .as_ref()
            .and_then(|r| r.target.as_ref())
            .and_then(|t| t.history)
            .map(|h| h.total_count)
    }

    /// Languages joined with `", "`.
    #[must_use]
    pub fn language_list(&self) -> String {
        self.languages
            .as_ref()
            .map(|l| {
                l.nodes
                    .iter()
                    .map(|n| n.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default()
    }

    /// The details row, tagged with the search string that found the
    /// repository.
    #[must_use]
    pub fn to_record(&self, search_string: FieldValue) -> RepositoryRecord {
        RepositoryRecord::from_cells([
            ("repository", FieldValue::from(self.name_with_owner.as_str())),
            ("createdAt", self.created_at.clone().into()),
            ("pushedAt", self.pushed_at.clone().into()),
            ("isMirror", self.is_mirror.into()),
            ("diskUsage", self.disk_usage.into()),
            ("description", self.description.clone().into()),
            ("contributors", self.contributors.total_count.into()),
            (
                "primaryLanguage",
                self.primary_language.as_ref().map(|l| l.name.clone()).into(),
            ),
            ("languages", self.language_list().into()),
            ("watchers", self.watchers.total_count.into()),
            ("stargazers", self.stargazers.total_count.into()),
            ("forks", self.forks.total_count.into()),
            ("issues", self.issues.total_count.into()),
            ("commits", self.commits().into()),
            ("pullRequests", self.pull_requests.total_count.into()),
            ("branches", self.branches.total_count.into()),
            ("tags", self.tags.total_count.into()),
            ("releases", self.releases.total_count.into()),
            ("search_string", search_string),
        ])
    }
}

/// One page of REST code search results.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchPage {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub items: Vec<CodeSearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchItem {
    pub repository: CodeSearchRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchRepository {
    pub name: String,
    pub owner: Owner,
}

impl CodeSearchRepository {
    /// `owner/name` of the repository.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// Recursive git tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeResponse {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_page_decodes() {
        let reply: GraphQlResponse<SearchData> = serde_json::from_value(json!({
            "data": {"search": {
                "repositoryCount": 1500,
                "pageInfo": {"endCursor": "Y3Vyc29yOjE=", "hasNextPage": false},
                "nodes": [{"owner": {"login": "a"}, "name": "b", "stargazers": {"totalCount": 1000}}]
            }}
        }))
        .unwrap();
        let search = reply.data.unwrap().search;
        assert_eq!(search.repository_count, 1500);
        assert_eq!(search.page_info.end_cursor.as_deref(), Some("Y3Vyc29yOjE="));
        assert!(!search.page_info.has_next_page);
        assert_eq!(search.nodes.len(), 1);
        assert!(reply.errors.is_none());
    }

    #[test]
    fn error_only_reply_decodes() {
        let reply: GraphQlResponse<SearchData> = serde_json::from_value(json!({
            "data": null,
            "errors": [{"message": "Something went wrong while executing your query. This may be the result of a timeout"}]
        }))
        .unwrap();
        assert!(reply.data.is_none());
        assert!(reply.first_error().unwrap().is_timeout());
    }

    #[test]
    fn timeout_detection_ignores_case() {
        let err = GraphQlError {
            message: "Request Timeout".into(),
            kind: None,
        };
        assert!(err.is_timeout());
        let err = GraphQlError {
            message: "Bad credentials".into(),
            kind: None,
        };
        assert!(!err.is_timeout());
    }

    #[test]
    fn search_variables_use_graphql_names() {
        let vars = SearchVariables {
            filter: "stars:>=1".into(),
            repositories_per_page: 8,
            cursor: None,
        };
        assert_eq!(
            serde_json::to_value(vars).unwrap(),
            json!({"filter": "stars:>=1", "repositoriesPerPage": 8, "cursor": null})
        );
    }

    #[test]
    fn details_row_has_every_column() {
        let details: RepositoryDetails = serde_json::from_value(json!({
            "nameWithOwner": "robocorp/rpaframework",
            "createdAt": "2020-01-01T00:00:00Z",
            "pushedAt": "2025-01-01T00:00:00Z",
            "isMirror": false,
            "diskUsage": 1234,
            "description": "RPA",
            "primaryLanguage": {"name": "Python"},
            "contributors": {"totalCount": 40},
            "languages": {"nodes": [{"name": "Python"}, {"name": "RobotFramework"}]},
            "watchers": {"totalCount": 30},
            "stargazers": {"totalCount": 1200},
            "forks": {"totalCount": 200},
            "issues": {"totalCount": 300},
            "defaultBranchRef": {"target": {"history": {"totalCount": 5000}}},
            "pullRequests": {"totalCount": 900},
            "branches": {"totalCount": 12},
            "tags": {"totalCount": 80},
            "releases": {"totalCount": 70}
        }))
        .unwrap();

        let record = details.to_record(FieldValue::from("extension:robot"));
        assert_eq!(record.cell("repository"), "robocorp/rpaframework");
        assert_eq!(record.cell("languages"), "Python, RobotFramework");
        assert_eq!(record.cell("primaryLanguage"), "Python");
        assert_eq!(record.get("commits"), Some(&FieldValue::Int(5000)));
        assert_eq!(record.cell("isMirror"), "False");
        assert_eq!(record.cell("search_string"), "extension:robot");
        assert_eq!(record.field_names().count(), 19);
    }

    #[test]
    fn details_without_default_branch_have_no_commits() {
        let details: RepositoryDetails = serde_json::from_value(json!({
            "nameWithOwner": "a/empty",
            "contributors": {"totalCount": 0},
            "watchers": {"totalCount": 0},
            "stargazers": {"totalCount": 0},
            "forks": {"totalCount": 0},
            "issues": {"totalCount": 0},
            "defaultBranchRef": null,
            "pullRequests": {"totalCount": 0},
            "branches": {"totalCount": 0},
            "tags": {"totalCount": 0},
            "releases": {"totalCount": 0}
        }))
        .unwrap();
        assert_eq!(details.commits(), None);
        assert_eq!(details.language_list(), "");
        let record = details.to_record(FieldValue::Null);
        assert_eq!(record.get("commits"), Some(&FieldValue::Null));
        assert_eq!(record.get("primaryLanguage"), Some(&FieldValue::Null));
    }

    #[test]
    fn code_search_item_full_name() {
        let page: CodeSearchPage = serde_json::from_value(json!({
            "total_count": 1,
            "items": [{"name": "tasks.robot", "repository": {"name": "bots", "owner": {"login": "acme"}}}]
        }))
        .unwrap();
        assert_eq!(page.items[0].repository.full_name(), "acme/bots");
    }
}
