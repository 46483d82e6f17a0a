use crate::constants::{
    DEFAULT_COLLECTION, DEFAULT_PER_PAGE, DEFAULT_PHOTOS_FIELD, DEFAULT_THUMB_SIZE,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "shop-thumbs",
    about = "Generates fixed-size cover-cropped JPEG thumbnails for product photos in S3-compatible storage",
    long_about = "shop-thumbs walks the product catalog (via the backend record API, a canonical-path \
                  probe, or a bucket listing), renders each photo as a cover-cropped JPEG thumbnail, \
                  and uploads it to a second bucket under '{WxH}/{source_key}'. A destination key \
                  that already exists is skipped, so re-runs are idempotent.",
    version = "0.1.0",
    after_help = "EXAMPLES:\n  \
    shop-thumbs --thumb 400x500 --only-first\n  \
    shop-thumbs --from-listing --only-first\n  \
    shop-thumbs --no-api --product-id 42 --only-first\n\n\
    ENVIRONMENT:\n  \
    S3_ENDPOINT, S3_ORIG_BUCKET, S3_THUMBS_BUCKET,\n  \
    S3_ORIG_ACCESS_KEY, S3_ORIG_SECRET_KEY,\n  \
    S3_THUMBS_ACCESS_KEY, S3_THUMBS_SECRET_KEY,\n  \
    BACKEND_URL, BACKEND_TOKEN (unless --no-api or --from-listing)"
)]
pub struct Args {
    #[arg(
        long,
        default_value = DEFAULT_THUMB_SIZE,
        help = "Thumbnail size as WIDTHxHEIGHT",
        long_help = "Exact output dimensions, e.g. 400x500. Also becomes the leading path \
                     segment of every destination key."
    )]
    pub thumb: String,

    #[arg(
        long,
        default_value = DEFAULT_COLLECTION,
        help = "Backend collection holding product records"
    )]
    pub collection: String,

    #[arg(
        long = "photos-field",
        default_value = DEFAULT_PHOTOS_FIELD,
        help = "Record field containing the ordered photo URL list"
    )]
    pub photos_field: String,

    #[arg(
        long = "per-page",
        default_value_t = DEFAULT_PER_PAGE,
        help = "Records per API page (capped at 500)"
    )]
    pub per_page: u32,

    #[arg(
        long = "only-first",
        help = "Thumbnail only the first photo of each product"
    )]
    pub only_first: bool,

    #[arg(
        long = "product-id",
        default_value = "",
        help = "Restrict the run to a single product id"
    )]
    pub product_id: String,

    #[arg(
        long = "max-products",
        default_value_t = 0,
        help = "Stop after this many products (0 = unlimited)"
    )]
    pub max_products: usize,

    #[arg(
        long = "no-api",
        help = "Skip the backend API and probe canonical photo paths directly",
        long_help = "Skip the backend API entirely. Requires --product-id and --only-first; \
                     the product's first photo is located by probing \
                     products/{id}/0.{jpg,jpeg,png,webp}."
    )]
    pub no_api: bool,

    #[arg(
        long = "from-listing",
        help = "Derive product ids by listing the source bucket instead of the API",
        long_help = "Enumerate the immediate subfolders of products/ in the source bucket to \
                     obtain product ids, then probe each id's canonical photo paths. Requires \
                     --only-first."
    )]
    pub from_listing: bool,

    #[arg(
        long = "probe-http",
        help = "Probe photo paths over plain HTTP instead of the object-store API"
    )]
    pub probe_http: bool,

    #[arg(
        long,
        default_value_t = 0.0,
        help = "Seconds to sleep between uploads (courtesy rate limit)"
    )]
    pub sleep: f64,

    #[arg(long = "brand-id", default_value = "", help = "Filter API records by brand id")]
    pub brand_id: String,

    #[arg(
        long = "category-id",
        default_value = "",
        help = "Filter API records by category id"
    )]
    pub category_id: String,
}
