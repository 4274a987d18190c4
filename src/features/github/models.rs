use serde::{Deserialize, Serialize};

/// 段位信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rank {
    /// 段位（S / A+ / ... / C）
    #[schema(example = "A+")]
    pub level: String,
    /// 百分位（越小越靠前）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<f64>,
}

/// GitHub 用户统计数据
///
/// 任意字段都可能缺失，渲染时以占位符展示。缓存时序列化为 camelCase JSON。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitHubStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// 今年的提交数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_year_commits: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_stars: Option<u64>,
    #[serde(default, rename = "totalPRs", skip_serializing_if = "Option::is_none")]
    pub total_prs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_issues: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
}

// ---------------- GraphQL 响应结构 ----------------

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse {
    pub data: Option<GraphQlData>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlData {
    pub user: Option<GraphQlUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphQlUser {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub followers: TotalCount,
    pub contributions_collection: Contributions,
    pub pull_requests: TotalCount,
    pub issues: TotalCount,
    pub repositories: RepositoryNodes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TotalCount {
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Contributions {
    pub total_commit_contributions: u64,
    #[serde(default)]
    pub total_pull_request_review_contributions: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryNodes {
    #[serde(default)]
    pub nodes: Vec<Option<RepositoryNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RepositoryNode {
    pub stargazer_count: u64,
}

#[cfg(test)]
mod tests {
    use super::{GitHubStats, Rank};

    #[test]
    fn serializes_with_original_field_names() {
        let stats = GitHubStats {
            total_prs: Some(3),
            current_year_commits: Some(42),
            rank: Some(Rank {
                level: "B".into(),
                percentile: None,
            }),
            ..GitHubStats::default()
        };
        let json = serde_json::to_value(&stats).expect("serialize");
        assert_eq!(json["totalPRs"], 3);
        assert_eq!(json["currentYearCommits"], 42);
        assert_eq!(json["rank"]["level"], "B");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn partial_json_deserializes_with_missing_fields() {
        let stats: GitHubStats =
            serde_json::from_str(r#"{"name":"Alice","totalStars":7}"#).expect("parse");
        assert_eq!(stats.name.as_deref(), Some("Alice"));
        assert_eq!(stats.total_stars, Some(7));
        assert!(stats.total_prs.is_none());
        assert!(stats.rank.is_none());
    }
}
