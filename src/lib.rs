pub mod bounds;
pub mod error;
pub mod flatten;
pub mod grid;
pub mod pipeline;
pub mod plugin;
pub mod triplex;
pub mod types;

pub use pipeline::{FractalConfig, generate};
pub use plugin::TriplexCloudPlugin;
