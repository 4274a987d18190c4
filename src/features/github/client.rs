use chrono::{Datelike, TimeZone, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::json;

use crate::config::GitHubConfig;
use crate::error::AppError;

use super::models::{GitHubStats, GraphQlResponse, GraphQlUser};
use super::rank::{RankInputs, calculate_rank};

const USER_STATS_QUERY: &str = r#"
query userStats($login: String!, $from: DateTime!) {
  user(login: $login) {
    name
    bio
    avatarUrl
    followers { totalCount }
    contributionsCollection(from: $from) {
      totalCommitContributions
      totalPullRequestReviewContributions
    }
    pullRequests { totalCount }
    issues { totalCount }
    repositories(first: 100, ownerAffiliations: OWNER, isFork: false, orderBy: {field: STARGAZERS, direction: DESC}) {
      nodes { stargazerCount }
    }
  }
}
"#;

/// GitHub GraphQL 客户端
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    graphql_url: String,
    headers: HeaderMap,
}

impl GitHubClient {
    pub fn new(cfg: &GitHubConfig) -> Result<Self, AppError> {
        let client = crate::http::build_client(&cfg.user_agent, cfg.timeout())?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = cfg.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| AppError::Internal(format!("GitHub token 格式非法: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        } else {
            tracing::warn!("未配置 GitHub token，GraphQL 请求可能被拒绝");
        }

        Ok(Self {
            client,
            graphql_url: cfg.graphql_url.clone(),
            headers,
        })
    }

    /// 拉取用户统计并计算段位
    pub async fn fetch_user_stats(&self, username: &str) -> Result<GitHubStats, AppError> {
        let now = Utc::now();
        let year_start = Utc
            .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(now);

        let body = json!({
            "query": USER_STATS_QUERY,
            "variables": { "login": username, "from": year_start.to_rfc3339() },
        });

        let resp = self
            .client
            .post(&self.graphql_url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(AppError::Upstream(format!(
                "GitHub API 返回 {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        let parsed: GraphQlResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("解析 GitHub 响应失败: {e}")))?;

        if let Some(first) = parsed.errors.first() {
            return Err(AppError::Upstream(format!(
                "GitHub GraphQL 错误: {}",
                first.message
            )));
        }

        let user = parsed
            .data
            .and_then(|d| d.user)
            .ok_or_else(|| AppError::Upstream(format!("GitHub 用户不存在: {username}")))?;

        Ok(to_stats(user))
    }
}

fn to_stats(user: GraphQlUser) -> GitHubStats {
    let total_stars: u64 = user
        .repositories
        .nodes
        .iter()
        .flatten()
        .map(|r| r.stargazer_count)
        .sum();
    let commits = user.contributions_collection.total_commit_contributions;

    let rank = calculate_rank(&RankInputs {
        commits,
        prs: user.pull_requests.total_count,
        issues: user.issues.total_count,
        reviews: user
            .contributions_collection
            .total_pull_request_review_contributions,
        stars: total_stars,
        followers: user.followers.total_count,
    });

    GitHubStats {
        name: user.name.filter(|s| !s.trim().is_empty()),
        bio: user.bio.filter(|s| !s.trim().is_empty()),
        avatar_url: user.avatar_url,
        current_year_commits: Some(commits),
        total_stars: Some(total_stars),
        total_prs: Some(user.pull_requests.total_count),
        total_issues: Some(user.issues.total_count),
        rank: Some(rank),
    }
}

#[cfg(test)]
mod tests {
    use super::to_stats;
    use crate::features::github::models::GraphQlResponse;

    #[test]
    fn graphql_user_maps_to_stats_with_star_sum() {
        let raw = r#"{
          "data": { "user": {
            "name": "Alice", "bio": "  ", "avatarUrl": "https://avatars.example/a.png",
            "followers": { "totalCount": 12 },
            "contributionsCollection": { "totalCommitContributions": 321, "totalPullRequestReviewContributions": 4 },
            "pullRequests": { "totalCount": 40 },
            "issues": { "totalCount": 9 },
            "repositories": { "nodes": [ { "stargazerCount": 10 }, null, { "stargazerCount": 5 } ] }
          } }
        }"#;
        let parsed: GraphQlResponse = serde_json::from_str(raw).expect("parse");
        let user = parsed.data.and_then(|d| d.user).expect("user");
        let stats = to_stats(user);

        assert_eq!(stats.name.as_deref(), Some("Alice"));
        assert!(stats.bio.is_none(), "blank bio is dropped");
        assert_eq!(stats.total_stars, Some(15));
        assert_eq!(stats.current_year_commits, Some(321));
        assert_eq!(stats.total_prs, Some(40));
        assert_eq!(stats.total_issues, Some(9));
        assert!(stats.rank.is_some());
    }
}
