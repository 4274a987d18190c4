use base64::{Engine as _, engine::general_purpose::STANDARD as base64_engine};
use futures_util::future::{BoxFuture, FutureExt};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};
use reqwest::Url;
use std::io::Cursor;
use std::time::Instant;

use crate::config::ImagesConfig;
use crate::error::AppError;

/// 远程图片优化：下载 → 缩放 → 重新编码为 data URI。
///
/// 失败时返回 None（调用方改用原图或不渲染该资源），从不向上抛错。
pub trait ImageOptimizer: Send + Sync {
    fn optimize<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Option<String>>;
}

/// 通过 HTTP 拉取并在本地用 `image` crate 处理的实现
pub struct HttpImageOptimizer {
    client: reqwest::Client,
    max_dimension: u32,
    max_download_bytes: usize,
}

impl HttpImageOptimizer {
    pub fn new(cfg: &ImagesConfig, user_agent: &str) -> Result<Self, AppError> {
        Ok(Self {
            client: crate::http::build_client(user_agent, cfg.timeout())?,
            max_dimension: cfg.max_dimension.max(1),
            max_download_bytes: cfg.max_download_bytes,
        })
    }

    async fn download(&self, url: Url) -> Result<Vec<u8>, String> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("请求失败: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status().as_u16()));
        }
        if let Some(len) = resp.content_length()
            && len as usize > self.max_download_bytes
        {
            return Err(format!("图片过大: {len} bytes"));
        }

        let mut buf = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| format!("读取失败: {e}"))? {
            if buf.len() + chunk.len() > self.max_download_bytes {
                return Err(format!("图片超过 {} bytes 上限", self.max_download_bytes));
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    async fn try_optimize(&self, url: &str) -> Result<String, String> {
        let parsed = parse_remote_url(url)?;
        let raw = self.download(parsed).await?;
        let max = self.max_dimension;
        // 解码与编码为 CPU 密集操作，放到阻塞线程池
        tokio::task::spawn_blocking(move || encode_data_uri(&raw, max))
            .await
            .map_err(|e| format!("阻塞任务执行失败: {e}"))?
    }
}

impl ImageOptimizer for HttpImageOptimizer {
    fn optimize<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Option<String>> {
        async move {
            let t0 = Instant::now();
            match self.try_optimize(url).await {
                Ok(uri) => {
                    tracing::debug!(
                        "图片优化完成: {} ({} chars, {}ms)",
                        url,
                        uri.len(),
                        t0.elapsed().as_millis()
                    );
                    Some(uri)
                }
                Err(e) => {
                    tracing::warn!("图片优化失败，将使用原图或跳过: {} ({})", url, e);
                    None
                }
            }
        }
        .boxed()
    }
}

fn parse_remote_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("URL 非法: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("不支持的协议: {other}")),
    }
}

/// 解码图片，按最长边等比缩小，带透明通道的编码为 PNG，否则编码为 JPEG(85)。
fn encode_data_uri(raw: &[u8], max_dimension: u32) -> Result<String, String> {
    let img = image::load_from_memory(raw).map_err(|e| format!("解码失败: {e}"))?;
    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.thumbnail(max_dimension, max_dimension)
    } else {
        img
    };

    if img.color().has_alpha() {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| format!("PNG 编码失败: {e}"))?;
        Ok(format!(
            "data:image/png;base64,{}",
            base64_engine.encode(out.into_inner())
        ))
    } else {
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        let mut out = Vec::new();
        let mut enc = JpegEncoder::new_with_quality(&mut out, 85);
        enc.encode(rgb.as_bytes(), rgb.width(), rgb.height(), ColorType::Rgb8.into())
            .map_err(|e| format!("JPEG 编码失败: {e}"))?;
        Ok(format!("data:image/jpeg;base64,{}", base64_engine.encode(out)))
    }
}
