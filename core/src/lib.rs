pub mod builder;
pub mod export;
pub mod kernel;
pub mod pipeline;
pub mod plan;

pub use pipeline::{ModelBuilder, ModelError, ModelOutput};

pub fn version() -> &'static str {
    "0.1.0"
}
