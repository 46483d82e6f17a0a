pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod publisher;
pub mod resize;
pub mod resolver;
pub mod size;
pub mod store;

pub use api::{ApiClient, ApiConfig, RecordPager};
pub use config::{Config, StrategyConfig};
pub use driver::{run, CandidateSource, RunCounters, RunOptions};
pub use error::{Result, ThumbError};
pub use publisher::{destination_key, Outcome, Publisher};
pub use resize::{cover_crop, render_thumbnail};
pub use resolver::{object_key_from_url, probe_client, ProductCandidate, Resolver, SourceRef, Strategy};
pub use size::SizeSpec;
pub use store::{ObjectStore, S3Store, StoreConfig};
