use axum::body::Bytes;
use futures_util::future::join_all;
use std::path::PathBuf;

use crate::config::FontsConfig;

/// 已加载到内存的字体文件
#[derive(Debug, Clone)]
pub struct FontAsset {
    pub name: String,
    pub data: Bytes,
    pub weight: u16,
}

/// 本地字体加载器：并发读取配置中的字体文件，单个失败只记录日志。
#[derive(Debug, Clone)]
pub struct FontLoader {
    dir: PathBuf,
    family: String,
    files: Vec<(String, u16)>,
}

impl FontLoader {
    pub fn new(cfg: &FontsConfig) -> Self {
        Self {
            dir: cfg.dir_path(),
            family: cfg.family.clone(),
            files: cfg
                .files
                .iter()
                .map(|f| (f.file.clone(), f.weight))
                .collect(),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// 读取全部字体；全部失败时返回空列表（渲染回退到系统字体）
    pub async fn load(&self) -> Vec<FontAsset> {
        let tasks = self.files.iter().map(|(file, weight)| {
            let path = self.dir.join(file);
            let family = self.family.clone();
            let weight = *weight;
            async move {
                match tokio::fs::read(&path).await {
                    Ok(data) => Some(FontAsset {
                        name: family,
                        data: Bytes::from(data),
                        weight,
                    }),
                    Err(e) => {
                        tracing::error!("加载字体文件失败 '{}': {}", path.display(), e);
                        None
                    }
                }
            }
        });

        let fonts: Vec<FontAsset> = join_all(tasks).await.into_iter().flatten().collect();
        if fonts.is_empty() && !self.files.is_empty() {
            tracing::error!("未能加载任何本地字体，将使用系统字体");
        }
        fonts
    }
}

#[cfg(test)]
mod tests {
    use super::FontLoader;
    use crate::config::{FontFileConfig, FontsConfig};

    #[tokio::test]
    async fn missing_font_files_degrade_to_empty_list() {
        let loader = FontLoader::new(&FontsConfig {
            dir: "./definitely/not/a/fonts/dir".into(),
            family: "Test".into(),
            files: vec![FontFileConfig {
                file: "Missing.ttf".into(),
                weight: 400,
            }],
        });
        assert!(loader.load().await.is_empty());
    }

    #[tokio::test]
    async fn readable_files_are_loaded_and_failures_skipped() {
        let dir = std::env::temp_dir().join(format!("profile-card-fonts-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.expect("mkdir");
        tokio::fs::write(dir.join("Ok.ttf"), b"not really a font")
            .await
            .expect("write");

        let loader = FontLoader::new(&FontsConfig {
            dir: dir.to_string_lossy().into_owned(),
            family: "Test".into(),
            files: vec![
                FontFileConfig {
                    file: "Ok.ttf".into(),
                    weight: 300,
                },
                FontFileConfig {
                    file: "Missing.ttf".into(),
                    weight: 700,
                },
            ],
        });
        let fonts = loader.load().await;
        let _ = tokio::fs::remove_dir_all(&dir).await;

        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].weight, 300);
        assert_eq!(fonts[0].name, "Test");
    }
}
