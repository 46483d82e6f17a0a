use crate::api::ApiConfig;
use crate::cli::Args;
use crate::error::{Result, ThumbError};
use crate::size::SizeSpec;
use crate::store::StoreConfig;
use std::time::Duration;

/// Which resolver strategy the run uses. Exactly one; flag combinations that
/// would mix strategies are rejected while the config is built, before any
/// network work starts.
#[derive(Debug, Clone)]
pub enum StrategyConfig {
    /// Page through the backend record API (the default).
    Api(ApiConfig),
    /// Probe the canonical photo paths of a single product, no API involved.
    Probe { product_id: String },
    /// List product ids from the source bucket, then probe each.
    Listing,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub size: SizeSpec,
    pub originals: StoreConfig,
    pub thumbs: StoreConfig,
    pub strategy: StrategyConfig,
    pub probe_http: bool,
    pub only_first: bool,
    pub product_id_filter: Option<String>,
    pub max_products: usize,
    pub sleep: Option<Duration>,
}

fn require_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ThumbError::MissingEnv(name)),
    }
}

fn normalize(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Config {
    /// Builds the full run configuration from CLI arguments and required
    /// environment variables. Any failure here is fatal and happens before
    /// any candidate is touched.
    pub fn from_args(args: &Args) -> Result<Self> {
        let size: SizeSpec = args.thumb.parse()?;

        let endpoint = require_env("S3_ENDPOINT")?;
        let originals = StoreConfig {
            endpoint: endpoint.clone(),
            bucket: require_env("S3_ORIG_BUCKET")?,
            access_key: require_env("S3_ORIG_ACCESS_KEY")?,
            secret_key: require_env("S3_ORIG_SECRET_KEY")?,
        };
        let thumbs = StoreConfig {
            endpoint,
            bucket: require_env("S3_THUMBS_BUCKET")?,
            access_key: require_env("S3_THUMBS_ACCESS_KEY")?,
            secret_key: require_env("S3_THUMBS_SECRET_KEY")?,
        };

        let product_id_filter = normalize(&args.product_id);

        let strategy = if args.from_listing {
            if !args.only_first {
                return Err(ThumbError::IncompatibleFlags(
                    "--from-listing requires --only-first".to_string(),
                ));
            }
            StrategyConfig::Listing
        } else if args.no_api {
            if !args.only_first {
                return Err(ThumbError::IncompatibleFlags(
                    "--no-api requires --only-first".to_string(),
                ));
            }
            let Some(product_id) = product_id_filter.clone() else {
                return Err(ThumbError::IncompatibleFlags(
                    "--no-api requires --product-id".to_string(),
                ));
            };
            StrategyConfig::Probe { product_id }
        } else {
            // Backend credentials are only demanded when the API is in play.
            StrategyConfig::Api(ApiConfig {
                base_url: require_env("BACKEND_URL")?,
                token: require_env("BACKEND_TOKEN")?,
                collection: args.collection.clone(),
                photos_field: args.photos_field.clone(),
                per_page: args.per_page,
                brand_id: normalize(&args.brand_id),
                category_id: normalize(&args.category_id),
            })
        };

        if args.probe_http && matches!(strategy, StrategyConfig::Api(_)) {
            return Err(ThumbError::IncompatibleFlags(
                "--probe-http only applies with --no-api or --from-listing".to_string(),
            ));
        }

        let sleep = (args.sleep > 0.0).then(|| Duration::from_secs_f64(args.sleep));

        Ok(Self {
            size,
            originals,
            thumbs,
            strategy,
            probe_http: args.probe_http,
            only_first: args.only_first,
            product_id_filter,
            max_products: args.max_products,
            sleep,
        })
    }
}
