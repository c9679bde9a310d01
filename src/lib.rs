pub mod builder;
pub mod check;
pub mod config;
pub mod document;
pub mod error;
pub mod lookup;
pub mod recipe;

pub use builder::PipelineBuilder;
pub use config::BuilderConfig;
pub use document::Stage;
pub use error::{Error, Result};
pub use lookup::LookupOptions;
