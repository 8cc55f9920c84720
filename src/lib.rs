pub mod aggregate;
pub mod cache;
pub mod collage;
pub mod config;
pub mod errors;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod resolver;
pub mod similarity;
pub mod throttle;

pub use aggregate::ActivityAggregator;
pub use cache::FileCache;
pub use collage::CollageRenderer;
pub use config::CollageConfig;
pub use errors::CollageError;
pub use history::{HistorySource, InMemoryHistory};
pub use models::{ActivitySummary, Album, AlbumListening, Track};
pub use pipeline::CollagePipeline;
pub use resolver::DurationResolver;
