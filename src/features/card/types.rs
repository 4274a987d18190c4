use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::AppError;

/// 默认背景不透明度
pub const DEFAULT_OPACITY: f32 = 0.1;

/// 卡片主题
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// 解析主题；非法值静默回退为 light
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    /// 未栅格化的 SVG（供前端预览直接内嵌）
    Svg,
}

impl OutputFormat {
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw {
            Some(fmt) if fmt.trim().eq_ignore_ascii_case("svg") => OutputFormat::Svg,
            _ => OutputFormat::Png,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Svg => "image/svg+xml; charset=utf-8",
        }
    }
}

/// `GET /card` 的原始查询参数
///
/// 所有字段均为可选字符串，缺失/非法值在 [`CardParams::from_query`] 中统一处理，
/// 避免 Query 反序列化失败时返回框架默认的纯文本错误。
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CardQuery {
    /// GitHub 用户名（必填）
    pub username: Option<String>,
    /// light | dark（默认 light，非法值回退 light）
    pub theme: Option<String>,
    /// 自定义背景图片 URL
    pub bg: Option<String>,
    /// 自定义简介（覆盖 GitHub bio）
    pub bio: Option<String>,
    /// 技术栈，逗号分隔
    pub skills: Option<String>,
    /// 自定义显示名称（覆盖 GitHub name）
    pub name: Option<String>,
    /// 背景不透明度 0-1（默认 0.1）
    pub opacity: Option<String>,
    /// `true` 时删除缓存并强制刷新
    pub nocache: Option<String>,
    /// png | svg（默认 png）
    pub format: Option<String>,
}

impl CardQuery {
    /// 由原始查询键值对构建；重复出现的参数视为缺失（按默认值处理，username 则报 400）
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut counts: HashMap<String, (usize, String)> = HashMap::new();
        for (key, value) in pairs {
            let entry = counts.entry(key).or_insert((0, String::new()));
            entry.0 += 1;
            entry.1 = value;
        }
        let mut take = |name: &str| match counts.remove(name) {
            Some((1, value)) => Some(value),
            Some((n, _)) => {
                tracing::debug!("查询参数 {} 重复出现 {} 次，已忽略", name, n);
                None
            }
            None => None,
        };

        Self {
            username: take("username"),
            theme: take("theme"),
            bg: take("bg"),
            bio: take("bio"),
            skills: take("skills"),
            name: take("name"),
            opacity: take("opacity"),
            nocache: take("nocache"),
            format: take("format"),
        }
    }
}

/// 校验并规范化后的请求参数，是缓存键的唯一来源。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardParams {
    pub username: String,
    pub theme: Theme,
    pub background_url: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub name: Option<String>,
    pub opacity: f32,
    pub format: OutputFormat,
    #[serde(skip)]
    pub force_refresh: bool,
}

impl CardParams {
    pub fn from_query(q: &CardQuery) -> Result<Self, AppError> {
        let username = validate_username(q.username.as_deref())?;
        Ok(Self {
            username,
            theme: Theme::parse_lenient(q.theme.as_deref()),
            background_url: non_empty(q.bg.as_deref()),
            bio: non_empty(q.bio.as_deref()),
            skills: parse_skills(q.skills.as_deref()),
            name: non_empty(q.name.as_deref()),
            opacity: parse_opacity(q.opacity.as_deref()),
            format: OutputFormat::parse_lenient(q.format.as_deref()),
            force_refresh: q.nocache.as_deref() == Some("true"),
        })
    }

    /// 卡片缓存键：对规范化参数的 JSON 做 SHA-256。
    ///
    /// 字段顺序由结构体定义固定，参数值中的任何分隔符都不会造成碰撞。
    pub fn cache_key(&self) -> Result<String, AppError> {
        let canonical = serde_json::to_vec(self)
            .map_err(|e| AppError::Internal(format!("缓存键序列化失败: {e}")))?;
        let digest = Sha256::digest(&canonical);
        Ok(format!("card:v1:{}", hex::encode(digest)))
    }
}

/// 本次渲染使用的个人资料（每个请求新建，不持久化）
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub github_username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub theme: Theme,
    /// 已优化的背景图（data URI）
    pub background_image_url: Option<String>,
    pub background_opacity: f32,
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// GitHub 用户名规则：1-39 位字母数字或 `-`，不能以 `-` 开头/结尾，不能有连续 `--`。
pub fn validate_username(raw: Option<&str>) -> Result<String, AppError> {
    let Some(name) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Err(AppError::Validation(
            "GitHub username (username) is required.".into(),
        ));
    };

    let valid = name.len() <= 39
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");
    if !valid {
        return Err(AppError::Validation(format!(
            "Invalid GitHub username: {name}"
        )));
    }
    Ok(name.to_string())
}

/// 逗号分隔技术栈：去空白、去空项，保持原有顺序
pub fn parse_skills(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// 背景不透明度：缺失/无法解析/NaN/无穷 → 0.1，其余夹到 [0, 1]
pub fn parse_opacity(raw: Option<&str>) -> f32 {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_OPACITY)
}
