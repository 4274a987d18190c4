/// 个人资料卡片：参数解析、样式、渲染与 HTTP 入口
pub mod card;

/// GitHub 统计拉取、段位计算与缓存
pub mod github;

/// 健康检查
pub mod health;

/// 远程图片下载与压缩
pub mod image;
