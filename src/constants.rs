pub const DEFAULT_THUMB_SIZE: &str = "400x500";
pub const DEFAULT_COLLECTION: &str = "products";
pub const DEFAULT_PHOTOS_FIELD: &str = "photos";

pub const DEFAULT_PER_PAGE: u32 = 200;
pub const MAX_PER_PAGE: u32 = 500;

pub const JPEG_QUALITY: u8 = 78;
pub const THUMB_CONTENT_TYPE: &str = "image/jpeg";
pub const THUMB_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

// One progress line per this many uploads.
pub const PROGRESS_INTERVAL: u64 = 50;

pub const PRODUCTS_PREFIX: &str = "products/";
pub const PROBE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
pub const LIST_PAGE_SIZE: i32 = 1000;

pub const API_TIMEOUT_SECS: u64 = 30;
pub const PROBE_TIMEOUT_SECS: u64 = 45;

pub const PROBE_USER_AGENT: &str = "Mozilla/5.0 (compatible; ShopThumbs/1.0)";
pub const PROBE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
