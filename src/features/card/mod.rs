pub mod fonts;
pub mod handler;
pub mod renderer;
pub mod style;
pub mod types;

pub use fonts::{FontAsset, FontLoader};
pub use handler::create_card_router;
pub use style::StyleTable;
