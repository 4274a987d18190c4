use std::collections::HashMap;

use crate::features::github::models::GitHubStats;

/// 未知/缺失段位使用的键
pub const FALLBACK_LEVEL: &str = "?";

/// 所有已知段位（从高到低），最后一个为兜底键
pub const RANK_LEVELS: [&str; 10] = ["S", "A+", "A", "A-", "B+", "B", "B-", "C+", "C", "?"];

/// 带透明度的填充色
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub color: &'static str,
    pub opacity: f32,
}

const fn fill(color: &'static str, opacity: f32) -> Fill {
    Fill { color, opacity }
}

/// 背景：两色渐变（from == to 时即纯色）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    pub from: Fill,
    pub to: Fill,
}

/// 外发光
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub color: &'static str,
    pub opacity: f32,
    pub blur: f32,
}

/// 段位徽章
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Badge {
    pub from: &'static str,
    pub to: &'static str,
    pub text: &'static str,
}

/// 投影
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: &'static str,
    pub opacity: f32,
    pub blur: f32,
}

/// 单个段位对应的整套视觉样式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleBundle {
    /// 边框颜色
    pub border: &'static str,
    /// 卡片背景
    pub background: Background,
    /// 段位文字颜色
    pub text_color: &'static str,
    /// 外发光（低段位无）
    pub glow: Option<Glow>,
    /// 徽章样式
    pub badge: Badge,
    /// 投影
    pub shadow: Shadow,
    /// 统计块背景
    pub stats_bg: Fill,
}

const GRAY_800: &str = "#1f2937";
const GRAY_700: &str = "#374151";
const GRAY_900: &str = "#111827";
const WHITE: &str = "#ffffff";

const fn plain(
    border: &'static str,
    text_color: &'static str,
    badge: &'static str,
) -> StyleBundle {
    StyleBundle {
        border,
        background: Background {
            from: fill(GRAY_800, 1.0),
            to: fill(GRAY_800, 1.0),
        },
        text_color,
        glow: None,
        badge: Badge {
            from: badge,
            to: badge,
            text: WHITE,
        },
        shadow: Shadow {
            color: "#000000",
            opacity: 0.25,
            blur: 6.0,
        },
        stats_bg: fill(GRAY_700, 0.5),
    }
}

fn build_entries() -> Vec<(&'static str, StyleBundle)> {
    vec![
        (
            "S",
            StyleBundle {
                border: "#c084fc",
                background: Background {
                    from: fill("#581c87", 0.3),
                    to: fill("#6b21a8", 0.2),
                },
                text_color: "#c084fc",
                glow: Some(Glow {
                    color: "#a855f7",
                    opacity: 0.4,
                    blur: 20.0,
                }),
                badge: Badge {
                    from: "#a855f7",
                    to: "#6366f1",
                    text: WHITE,
                },
                shadow: Shadow {
                    color: "#581c87",
                    opacity: 0.3,
                    blur: 15.0,
                },
                stats_bg: fill("#581c87", 0.2),
            },
        ),
        (
            "A+",
            StyleBundle {
                border: "#60a5fa",
                background: Background {
                    from: fill("#1e3a8a", 0.3),
                    to: fill("#1e40af", 0.2),
                },
                text_color: "#60a5fa",
                glow: Some(Glow {
                    color: "#3b82f6",
                    opacity: 0.3,
                    blur: 15.0,
                }),
                badge: Badge {
                    from: "#3b82f6",
                    to: "#0ea5e9",
                    text: WHITE,
                },
                shadow: Shadow {
                    color: "#1e3a8a",
                    opacity: 0.3,
                    blur: 15.0,
                },
                stats_bg: fill("#1e3a8a", 0.2),
            },
        ),
        (
            "A",
            StyleBundle {
                border: "#93c5fd",
                background: Background {
                    from: fill("#1e3a8a", 0.2),
                    to: fill("#1e40af", 0.1),
                },
                text_color: "#93c5fd",
                glow: Some(Glow {
                    color: "#3b82f6",
                    opacity: 0.2,
                    blur: 12.0,
                }),
                badge: Badge {
                    from: "#3b82f6",
                    to: "#3b82f6",
                    text: WHITE,
                },
                shadow: Shadow {
                    color: "#1e3a8a",
                    opacity: 0.2,
                    blur: 10.0,
                },
                stats_bg: fill("#1e3a8a", 0.1),
            },
        ),
        (
            "A-",
            StyleBundle {
                border: "#7dd3fc",
                background: Background {
                    from: fill("#0c4a6e", 0.2),
                    to: fill("#075985", 0.1),
                },
                text_color: "#7dd3fc",
                glow: Some(Glow {
                    color: "#0ea5e9",
                    opacity: 0.2,
                    blur: 10.0,
                }),
                badge: Badge {
                    from: "#0ea5e9",
                    to: "#0ea5e9",
                    text: WHITE,
                },
                shadow: Shadow {
                    color: "#0c4a6e",
                    opacity: 0.2,
                    blur: 10.0,
                },
                stats_bg: fill("#0c4a6e", 0.1),
            },
        ),
        (
            "B+",
            StyleBundle {
                border: "#4ade80",
                background: Background {
                    from: fill("#14532d", 0.2),
                    to: fill("#166534", 0.1),
                },
                text_color: "#4ade80",
                glow: None,
                badge: Badge {
                    from: "#22c55e",
                    to: "#22c55e",
                    text: WHITE,
                },
                shadow: Shadow {
                    color: "#14532d",
                    opacity: 0.2,
                    blur: 10.0,
                },
                stats_bg: fill("#14532d", 0.1),
            },
        ),
        ("B", plain("#86efac", "#86efac", "#4ade80")),
        ("B-", plain("#bef264", "#bef264", "#a3e635")),
        ("C+", plain("#fde047", "#fde047", "#facc15")),
        ("C", plain("#fef08a", "#fef08a", "#fde047")),
    ]
}

/// 段位 → 样式 的只读映射，启动时构建一次，之后通过 `Arc` 共享。
#[derive(Debug, Clone)]
pub struct StyleTable {
    entries: HashMap<&'static str, StyleBundle>,
    fallback: StyleBundle,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleTable {
    pub fn new() -> Self {
        Self {
            entries: build_entries().into_iter().collect(),
            fallback: plain(GRAY_700, "#9ca3af", "#9ca3af"),
        }
    }

    /// 按段位查找样式；未知段位返回 `?` 对应的兜底样式，永不失败。
    pub fn lookup(&self, level: &str) -> &StyleBundle {
        self.entries.get(level).unwrap_or(&self.fallback)
    }

    /// 根据统计数据中的段位解析样式（无统计或无段位时使用兜底样式）。
    pub fn resolve(&self, stats: Option<&GitHubStats>) -> &StyleBundle {
        let level = stats
            .and_then(|s| s.rank.as_ref())
            .map(|r| r.level.as_str())
            .unwrap_or(FALLBACK_LEVEL);
        self.lookup(level)
    }
}

/// 卡片外围画布底色（只随主题变化，与段位无关）
pub fn page_color(dark: bool) -> &'static str {
    if dark { GRAY_900 } else { "#f9fafb" }
}
