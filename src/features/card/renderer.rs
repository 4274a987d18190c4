use once_cell::sync::OnceCell;
use resvg::usvg::{self, Options as UsvgOptions, fontdb};
use resvg::{
    render,
    tiny_skia::{Pixmap, Transform},
};
use std::fmt::Write;
use std::sync::Arc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::error::AppError;
use crate::features::github::models::GitHubStats;

use super::fonts::FontAsset;
use super::style::{StyleBundle, StyleTable, page_color};
use super::types::{Profile, Theme};

/// 布局坐标系（viewBox），输出尺寸由 width/height 缩放
const VIEW_W: u32 = 1200;
const VIEW_H: u32 = 800;

const CARD_X: u32 = 40;
const CARD_Y: u32 = 40;
const CARD_W: u32 = VIEW_W - 2 * CARD_X;
const CARD_H: u32 = VIEW_H - 2 * CARD_Y;

const LEFT_X: u32 = 80;
const RIGHT_X: u32 = 640;

const NAME_FALLBACK: &str = "No name";
const BIO_FALLBACK: &str = "No bio yet.";
const STAT_PLACEHOLDER: &str = "-";
const FOOTER_TEXT: &str = "created by Please Readme";

const BIO_MAX_COLS: usize = 42;
const BIO_MAX_LINES: usize = 3;
const NAME_MAX_COLS: usize = 36;
const SKILL_MAX_COLS: usize = 10;
const SKILL_COLUMNS: usize = 4;
const MAX_SKILL_BADGES: usize = 12;

/// 单次渲染的全部输入
pub struct CardRenderInput<'a> {
    pub profile: &'a Profile,
    pub stats: Option<&'a GitHubStats>,
    /// 为 true 时输出骨架屏，忽略其它数据
    pub loading: bool,
    pub current_year: i32,
    pub width: u32,
    pub height: u32,
    pub font_family: &'a str,
    pub styles: &'a StyleTable,
    /// 是否保留非 data URI 的图片引用（SVG 输出时为 true；栅格化时远程引用无法加载）
    pub allow_remote_images: bool,
}

fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::ImageRendererError(format!("SVG formatting error: {e}"))
}

/// 生成卡片 SVG
pub fn generate_card_svg(input: &CardRenderInput<'_>) -> Result<String, AppError> {
    let mut svg = String::with_capacity(16 * 1024);
    write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{}" height="{}" viewBox="0 0 {VIEW_W} {VIEW_H}" font-family="{}, sans-serif">"#,
        input.width.max(1),
        input.height.max(1),
        escape_xml(input.font_family)
    )
    .map_err(fmt_err)?;

    if input.loading {
        write_skeleton(&mut svg, input.profile.theme)?;
    } else {
        let style = input.styles.resolve(input.stats);
        write_defs(&mut svg, style)?;
        write_frame(&mut svg, input, style)?;
        write_header(&mut svg, input, style)?;
        write_about(&mut svg, input)?;
        if !input.profile.skills.is_empty() {
            write_skills(&mut svg, &input.profile.skills)?;
        }
        if let Some(stats) = input.stats {
            write_stats(&mut svg, stats, input.current_year, style)?;
        }
    }

    svg.push_str("</svg>");
    Ok(svg)
}

fn write_skeleton(svg: &mut String, theme: Theme) -> Result<(), AppError> {
    let gray = "#374151";
    write!(
        svg,
        r##"<rect width="{VIEW_W}" height="{VIEW_H}" fill="{}"/><g class="skeleton"><rect x="{CARD_X}" y="{CARD_Y}" width="{CARD_W}" height="{CARD_H}" rx="16" fill="#1f2937"/>"##,
        page_color(theme == Theme::Dark)
    )
    .map_err(fmt_err)?;
    let inner_w = CARD_W - 80;
    let blocks = [
        (LEFT_X, 80, inner_w, 240),
        (LEFT_X, 350, inner_w * 3 / 4, 24),
        (LEFT_X, 395, inner_w / 2, 24),
        (LEFT_X, 440, 120, 36),
        (LEFT_X + 130, 440, 120, 36),
    ];
    for (x, y, w, h) in blocks {
        write!(
            svg,
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" rx="8" fill="{gray}"/>"#
        )
        .map_err(fmt_err)?;
    }
    svg.push_str("</g>");
    Ok(())
}

fn write_defs(svg: &mut String, style: &StyleBundle) -> Result<(), AppError> {
    let bg = style.background;
    let shadow = style.shadow;
    write!(
        svg,
        r#"<defs><linearGradient id="card-bg" x1="0" y1="0" x2="1" y2="1"><stop offset="0" stop-color="{}" stop-opacity="{}"/><stop offset="1" stop-color="{}" stop-opacity="{}"/></linearGradient>"#,
        bg.from.color, bg.from.opacity, bg.to.color, bg.to.opacity
    )
    .map_err(fmt_err)?;
    write!(
        svg,
        r#"<linearGradient id="rank-badge" x1="0" y1="0" x2="1" y2="0"><stop offset="0" stop-color="{}"/><stop offset="1" stop-color="{}"/></linearGradient>"#,
        style.badge.from, style.badge.to
    )
    .map_err(fmt_err)?;
    write!(
        svg,
        r#"<filter id="card-shadow" x="-10%" y="-10%" width="120%" height="130%"><feDropShadow dx="0" dy="8" stdDeviation="{}" flood-color="{}" flood-opacity="{}"/></filter>"#,
        shadow.blur / 2.0,
        shadow.color,
        shadow.opacity
    )
    .map_err(fmt_err)?;
    if let Some(glow) = style.glow {
        write!(
            svg,
            r#"<filter id="card-glow" x="-10%" y="-10%" width="120%" height="120%"><feDropShadow dx="0" dy="0" stdDeviation="{}" flood-color="{}" flood-opacity="{}"/></filter>"#,
            glow.blur / 2.0,
            glow.color,
            glow.opacity
        )
        .map_err(fmt_err)?;
    }
    write!(
        svg,
        r#"<clipPath id="card-clip"><rect x="{CARD_X}" y="{CARD_Y}" width="{CARD_W}" height="{CARD_H}" rx="16"/></clipPath><clipPath id="avatar-clip"><circle cx="130" cy="130" r="52"/></clipPath></defs>"#
    )
    .map_err(fmt_err)?;
    Ok(())
}

fn write_frame(
    svg: &mut String,
    input: &CardRenderInput<'_>,
    style: &StyleBundle,
) -> Result<(), AppError> {
    let profile = input.profile;
    write!(
        svg,
        r#"<rect width="{VIEW_W}" height="{VIEW_H}" fill="{}"/>"#,
        page_color(profile.theme == Theme::Dark)
    )
    .map_err(fmt_err)?;

    if style.glow.is_some() {
        write!(
            svg,
            r#"<rect x="{CARD_X}" y="{CARD_Y}" width="{CARD_W}" height="{CARD_H}" rx="16" fill="{}" filter="url(#card-glow)"/>"#,
            style.border
        )
        .map_err(fmt_err)?;
    }
    write!(
        svg,
        r##"<rect x="{CARD_X}" y="{CARD_Y}" width="{CARD_W}" height="{CARD_H}" rx="16" fill="#1f2937" filter="url(#card-shadow)"/>"##
    )
    .map_err(fmt_err)?;

    if let Some(href) = profile
        .background_image_url
        .as_deref()
        .and_then(|h| image_href(h, input.allow_remote_images))
    {
        write!(
            svg,
            r#"<image class="background" x="{CARD_X}" y="{CARD_Y}" width="{CARD_W}" height="{CARD_H}" preserveAspectRatio="xMidYMid slice" opacity="{}" clip-path="url(#card-clip)" href="{}"/>"#,
            profile.background_opacity,
            escape_xml(href)
        )
        .map_err(fmt_err)?;
    }

    write!(
        svg,
        r#"<rect x="{CARD_X}" y="{CARD_Y}" width="{CARD_W}" height="{CARD_H}" rx="16" fill="url(#card-bg)"/><rect x="{CARD_X}" y="{CARD_Y}" width="{CARD_W}" height="{CARD_H}" rx="16" fill="none" stroke="{}" stroke-width="4"/>"#,
        style.border
    )
    .map_err(fmt_err)?;
    Ok(())
}

fn write_header(
    svg: &mut String,
    input: &CardRenderInput<'_>,
    style: &StyleBundle,
) -> Result<(), AppError> {
    let profile = input.profile;
    let stats = input.stats;

    let avatar = stats
        .and_then(|s| s.avatar_url.as_deref())
        .and_then(|h| image_href(h, input.allow_remote_images));
    if let Some(href) = avatar {
        write!(
            svg,
            r##"<circle cx="130" cy="130" r="58" fill="#1f2937" stroke="{}" stroke-width="4"/><image class="avatar" x="78" y="78" width="104" height="104" preserveAspectRatio="xMidYMid slice" clip-path="url(#avatar-clip)" href="{}"/>"##,
            style.border,
            escape_xml(href)
        )
        .map_err(fmt_err)?;
    }

    let name_x = if avatar.is_some() { 210 } else { LEFT_X };
    let name = profile
        .name
        .as_deref()
        .or_else(|| stats.and_then(|s| s.name.as_deref()))
        .unwrap_or(NAME_FALLBACK);
    write!(
        svg,
        r##"<text x="{name_x}" y="125" font-size="44" font-weight="700" fill="#ffffff">{}</text><text x="{name_x}" y="168" font-size="24" font-weight="300" fill="#9ca3af">@{}</text>"##,
        escape_xml(&truncate_to_width(name, NAME_MAX_COLS)),
        escape_xml(&profile.github_username)
    )
    .map_err(fmt_err)?;
    Ok(())
}

fn write_about(svg: &mut String, input: &CardRenderInput<'_>) -> Result<(), AppError> {
    let bio = input
        .profile
        .bio
        .as_deref()
        .or_else(|| input.stats.and_then(|s| s.bio.as_deref()))
        .unwrap_or(BIO_FALLBACK);

    write!(
        svg,
        r##"<text x="{LEFT_X}" y="250" font-size="26" font-weight="700" fill="#e5e7eb">About</text><rect x="{LEFT_X}" y="268" width="500" height="150" rx="10" fill="#1f2937" fill-opacity="0.7"/>"##
    )
    .map_err(fmt_err)?;
    for (i, line) in wrap_to_width(bio, BIO_MAX_COLS, BIO_MAX_LINES)
        .iter()
        .enumerate()
    {
        write!(
            svg,
            r##"<text class="bio-line" x="{}" y="{}" font-size="22" font-weight="300" fill="#d1d5db">{}</text>"##,
            LEFT_X + 20,
            308 + i * 38,
            escape_xml(line)
        )
        .map_err(fmt_err)?;
    }
    Ok(())
}

fn write_skills(svg: &mut String, skills: &[String]) -> Result<(), AppError> {
    write!(
        svg,
        r##"<line x1="{LEFT_X}" y1="440" x2="580" y2="440" stroke="#6b7280" stroke-opacity="0.6"/><text x="{LEFT_X}" y="480" font-size="26" font-weight="700" fill="#e5e7eb">Tech Stack</text>"##
    )
    .map_err(fmt_err)?;

    // 超出的部分合并为最后一个 "+N" 徽章
    let overflow = skills.len() > MAX_SKILL_BADGES;
    let shown = if overflow {
        MAX_SKILL_BADGES - 1
    } else {
        skills.len()
    };
    let mut labels: Vec<String> = skills[..shown]
        .iter()
        .map(|s| truncate_to_width(s, SKILL_MAX_COLS))
        .collect();
    if overflow {
        labels.push(format!("+{}", skills.len() - shown));
    }

    for (i, label) in labels.iter().enumerate() {
        let col = (i % SKILL_COLUMNS) as u32;
        let row = (i / SKILL_COLUMNS) as u32;
        let x = LEFT_X + col * 125;
        let y = 500 + row * 52;
        write!(
            svg,
            r##"<g class="skill-badge"><rect x="{x}" y="{y}" width="115" height="40" rx="8" fill="#374151"/><text x="{}" y="{}" font-size="18" text-anchor="middle" fill="#f3f4f6">{}</text></g>"##,
            x + 57,
            y + 27,
            escape_xml(label)
        )
        .map_err(fmt_err)?;
    }
    Ok(())
}

fn stat_value(v: Option<u64>) -> String {
    v.map(|n| n.to_string())
        .unwrap_or_else(|| STAT_PLACEHOLDER.to_string())
}

fn write_stats(
    svg: &mut String,
    stats: &GitHubStats,
    current_year: i32,
    style: &StyleBundle,
) -> Result<(), AppError> {
    write!(
        svg,
        r##"<text x="{RIGHT_X}" y="250" font-size="26" font-weight="700" fill="#e5e7eb">GitHub Stats</text>"##
    )
    .map_err(fmt_err)?;

    let tiles = [
        (
            format!("Commits | {current_year}"),
            stat_value(stats.current_year_commits),
        ),
        ("Total Stars".to_string(), stat_value(stats.total_stars)),
        ("Total PRs".to_string(), stat_value(stats.total_prs)),
        ("Total Issues".to_string(), stat_value(stats.total_issues)),
    ];
    for (i, (label, value)) in tiles.iter().enumerate() {
        let x = RIGHT_X + (i as u32 % 2) * 240;
        let y = 270 + (i as u32 / 2) * 110;
        write!(
            svg,
            r##"<g class="stat-tile"><rect x="{x}" y="{y}" width="220" height="95" rx="10" fill="{}" fill-opacity="{}"/><text x="{cx}" y="{}" font-size="18" font-weight="300" text-anchor="middle" fill="#d1d5db">{}</text><text class="stat-value" x="{cx}" y="{}" font-size="34" font-weight="700" text-anchor="middle" fill="#ffffff">{}</text></g>"##,
            style.stats_bg.color,
            style.stats_bg.opacity,
            y + 34,
            escape_xml(label),
            y + 76,
            escape_xml(value),
            cx = x + 110,
        )
        .map_err(fmt_err)?;
    }

    let level = stats.rank.as_ref().map(|r| r.level.as_str()).unwrap_or("");
    write!(
        svg,
        r##"<rect x="{RIGHT_X}" y="500" width="460" height="110" rx="12" fill="#1f2937" fill-opacity="0.5"/><text x="{}" y="568" font-size="20" font-weight="300" text-anchor="end" fill="#9ca3af">Rank | {current_year} :</text><text class="rank-level" x="{}" y="575" font-size="56" font-weight="700" fill="{}">{}</text>"##,
        RIGHT_X + 230,
        RIGHT_X + 245,
        style.text_color,
        escape_xml(level)
    )
    .map_err(fmt_err)?;

    if let Some(pct) = stats.rank.as_ref().and_then(|r| r.percentile) {
        write!(
            svg,
            r#"<rect x="{}" y="520" width="110" height="30" rx="15" fill="url(#rank-badge)"/><text x="{}" y="541" font-size="16" text-anchor="middle" fill="{}">Top {:.1}%</text>"#,
            RIGHT_X + 335,
            RIGHT_X + 390,
            style.badge.text,
            pct
        )
        .map_err(fmt_err)?;
    }

    write!(
        svg,
        r##"<text x="{}" y="740" font-size="16" font-weight="300" text-anchor="end" fill="#6b7280">{FOOTER_TEXT}</text>"##,
        CARD_X + CARD_W - 30
    )
    .map_err(fmt_err)?;
    Ok(())
}

/// 栅格化时只有 data URI 能被加载；远程地址仅在 SVG 输出中保留
fn image_href(href: &str, allow_remote: bool) -> Option<&str> {
    let href = href.trim();
    if href.starts_with("data:image/") {
        Some(href)
    } else if allow_remote && (href.starts_with("https://") || href.starts_with("http://")) {
        Some(href)
    } else {
        None
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// 按显示宽度截断（CJK 按 2 列计），超出时以 `…` 结尾
fn truncate_to_width(text: &str, max_cols: usize) -> String {
    if text.width() <= max_cols {
        return text.to_string();
    }
    let mut out = String::new();
    let mut cols = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if cols + w + 1 > max_cols {
            break;
        }
        cols += w;
        out.push(ch);
    }
    out.push('…');
    out
}

/// 按显示宽度折行，优先在空白处断开；超过 `max_lines` 时最后一行以 `…` 结尾
fn wrap_to_width(text: &str, max_cols: usize, max_lines: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut cols = 0usize;

    for word in text.split_whitespace() {
        let word_w = word.width();
        let sep = usize::from(!current.is_empty());
        if cols + sep + word_w <= max_cols {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
            cols += sep + word_w;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            cols = 0;
        }
        if word_w <= max_cols {
            current.push_str(word);
            cols = word_w;
            continue;
        }
        // 单词本身超宽（如 CJK 连续文本）时按字符硬折
        for ch in word.chars() {
            let w = ch.width().unwrap_or(0);
            if cols + w > max_cols && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                cols = 0;
            }
            current.push(ch);
            cols += w;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            let trimmed = truncate_to_width(last, max_cols.saturating_sub(1));
            *last = if trimmed.ends_with('…') {
                trimmed
            } else {
                format!("{trimmed}…")
            };
        }
    }
    lines
}

// 系统字体数据库只扫描一次，每次渲染在其副本上追加本次加载的字体
static SYSTEM_FONT_DB: OnceCell<fontdb::Database> = OnceCell::new();

fn system_font_db() -> &'static fontdb::Database {
    SYSTEM_FONT_DB.get_or_init(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::info!("系统字体数据库初始化完成: {} faces", db.len());
        db
    })
}

/// 启动期预热系统字体数据库，降低首个请求的长尾延迟
pub fn prewarm_font_db() {
    let _ = system_font_db();
}

/// SVG → PNG
pub fn render_svg_to_png(
    svg_data: &str,
    fonts: &[FontAsset],
    font_family: &str,
    optimize_speed: bool,
) -> Result<Vec<u8>, AppError> {
    let t0 = std::time::Instant::now();

    let mut db = system_font_db().clone();
    for font in fonts {
        db.load_font_data(font.data.to_vec());
    }

    let opts = UsvgOptions {
        fontdb: Arc::new(db),
        font_family: font_family.to_string(),
        font_size: 16.0,
        languages: vec!["ko".to_string(), "en".to_string()],
        shape_rendering: if optimize_speed {
            usvg::ShapeRendering::OptimizeSpeed
        } else {
            usvg::ShapeRendering::GeometricPrecision
        },
        text_rendering: if optimize_speed {
            usvg::TextRendering::OptimizeSpeed
        } else {
            usvg::TextRendering::OptimizeLegibility
        },
        image_rendering: if optimize_speed {
            usvg::ImageRendering::OptimizeSpeed
        } else {
            usvg::ImageRendering::OptimizeQuality
        },
        ..Default::default()
    };

    let tree = usvg::Tree::from_data(svg_data.as_bytes(), &opts)
        .map_err(|e| AppError::ImageRendererError(format!("Failed to parse SVG: {e}")))?;
    let t_parse = t0.elapsed();

    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| AppError::ImageRendererError("Failed to create pixmap".to_string()))?;
    render(&tree, Transform::default(), &mut pixmap.as_mut());
    let t_raster = t0.elapsed();

    let mut out = Vec::with_capacity((size.width() * size.height()) as usize);
    {
        let mut encoder = png::Encoder::new(&mut out, size.width(), size.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if optimize_speed {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::FilterType::NoFilter);
        } else {
            encoder.set_compression(png::Compression::Default);
            encoder.set_filter(png::FilterType::Paeth);
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| AppError::ImageRendererError(format!("PNG write_header error: {e}")))?;
        writer.write_image_data(pixmap.data()).map_err(|e| {
            AppError::ImageRendererError(format!("PNG write_image_data error: {e}"))
        })?;
        writer
            .finish()
            .map_err(|e| AppError::ImageRendererError(format!("PNG finish error: {e}")))?;
    }

    tracing::debug!(
        "PNG渲染内部分段: 解析={:?}, 栅格化={:?}, 编码={:?}",
        t_parse,
        t_raster - t_parse,
        t0.elapsed() - t_raster
    );
    Ok(out)
}

/// 异步版本：整个解析/栅格化/编码流程放入阻塞线程池
pub async fn render_svg_to_png_async(
    svg: String,
    fonts: Vec<FontAsset>,
    font_family: String,
    optimize_speed: bool,
) -> Result<Vec<u8>, AppError> {
    tokio::task::spawn_blocking(move || {
        render_svg_to_png(&svg, &fonts, &font_family, optimize_speed)
    })
    .await
    .map_err(|e| AppError::Internal(format!("阻塞渲染任务执行失败: {e}")))?
}
