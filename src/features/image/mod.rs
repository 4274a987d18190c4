mod optimizer;

pub use optimizer::{HttpImageOptimizer, ImageOptimizer};
