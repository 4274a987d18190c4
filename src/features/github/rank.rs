use super::models::Rank;

/// 段位计算所需的原始计数
#[derive(Debug, Clone, Copy, Default)]
pub struct RankInputs {
    /// 提交数（今年）
    pub commits: u64,
    pub prs: u64,
    pub issues: u64,
    /// 代码评审数
    pub reviews: u64,
    pub stars: u64,
    pub followers: u64,
}

const COMMITS_MEDIAN: f64 = 250.0;
const COMMITS_WEIGHT: f64 = 2.0;
const PRS_MEDIAN: f64 = 50.0;
const PRS_WEIGHT: f64 = 3.0;
const ISSUES_MEDIAN: f64 = 25.0;
const ISSUES_WEIGHT: f64 = 1.0;
const REVIEWS_MEDIAN: f64 = 2.0;
const REVIEWS_WEIGHT: f64 = 1.0;
const STARS_MEDIAN: f64 = 50.0;
const STARS_WEIGHT: f64 = 4.0;
const FOLLOWERS_MEDIAN: f64 = 10.0;
const FOLLOWERS_WEIGHT: f64 = 1.0;

const TOTAL_WEIGHT: f64 = COMMITS_WEIGHT
    + PRS_WEIGHT
    + ISSUES_WEIGHT
    + REVIEWS_WEIGHT
    + STARS_WEIGHT
    + FOLLOWERS_WEIGHT;

/// 段位与对应的百分位上限（含）
const LEVEL_THRESHOLDS: [(&str, f64); 9] = [
    ("S", 1.0),
    ("A+", 12.5),
    ("A", 25.0),
    ("A-", 37.5),
    ("B+", 50.0),
    ("B", 62.5),
    ("B-", 75.0),
    ("C+", 87.5),
    ("C", 100.0),
];

fn exponential_cdf(x: f64) -> f64 {
    1.0 - 2f64.powf(-x)
}

fn log_normal_cdf(x: f64) -> f64 {
    // 近似：x / (1 + x)，x >= 0
    x / (1.0 + x)
}

/// 计算段位
///
/// 每项指标按中位数归一化后经 CDF 压缩到 [0, 1)，再加权平均；
/// `percentile = (1 - 加权平均) * 100`，越小越靠前。
pub fn calculate_rank(inputs: &RankInputs) -> Rank {
    let weighted = COMMITS_WEIGHT * exponential_cdf(inputs.commits as f64 / COMMITS_MEDIAN)
        + PRS_WEIGHT * exponential_cdf(inputs.prs as f64 / PRS_MEDIAN)
        + ISSUES_WEIGHT * exponential_cdf(inputs.issues as f64 / ISSUES_MEDIAN)
        + REVIEWS_WEIGHT * exponential_cdf(inputs.reviews as f64 / REVIEWS_MEDIAN)
        + STARS_WEIGHT * log_normal_cdf(inputs.stars as f64 / STARS_MEDIAN)
        + FOLLOWERS_WEIGHT * log_normal_cdf(inputs.followers as f64 / FOLLOWERS_MEDIAN);

    let percentile = ((1.0 - weighted / TOTAL_WEIGHT) * 100.0).clamp(0.0, 100.0);
    let level = LEVEL_THRESHOLDS
        .iter()
        .find(|(_, threshold)| percentile <= *threshold)
        .map(|(level, _)| *level)
        .unwrap_or("C");

    Rank {
        level: level.to_string(),
        percentile: Some(percentile),
    }
}

#[cfg(test)]
mod tests {
    use super::{RankInputs, calculate_rank};

    #[test]
    fn inactive_user_is_c() {
        let rank = calculate_rank(&RankInputs::default());
        assert_eq!(rank.level, "C");
        assert_eq!(rank.percentile, Some(100.0));
    }

    #[test]
    fn saturated_user_is_s() {
        let rank = calculate_rank(&RankInputs {
            commits: 100_000,
            prs: 100_000,
            issues: 100_000,
            reviews: 100_000,
            stars: 50_000_000,
            followers: 10_000_000,
        });
        assert_eq!(rank.level, "S");
    }

    #[test]
    fn more_activity_never_ranks_lower() {
        let base = RankInputs {
            commits: 120,
            prs: 10,
            issues: 5,
            reviews: 1,
            stars: 30,
            followers: 8,
        };
        let better = RankInputs {
            stars: 300,
            ..base
        };
        let p_base = calculate_rank(&base).percentile.unwrap_or(100.0);
        let p_better = calculate_rank(&better).percentile.unwrap_or(100.0);
        assert!(p_better < p_base, "{p_better} should be < {p_base}");
    }
}
