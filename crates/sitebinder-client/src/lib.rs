pub mod browser_renderer;
pub mod pdf_merger;

pub use browser_renderer::{BrowserOptions, BrowserRenderer};
pub use pdf_merger::LopdfMerger;
