use crate::api::RecordPager;
use crate::constants::{
    PROBE_ACCEPT, PROBE_EXTENSIONS, PROBE_TIMEOUT_SECS, PROBE_USER_AGENT, PRODUCTS_PREFIX,
};
use crate::error::Result;
use crate::store::ObjectStore;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

/// One original photo to thumbnail: its key in the source bucket, plus the
/// bytes when a probe already read them (so the publisher need not fetch
/// twice).
#[derive(Debug, Clone)]
pub struct SourceRef {
    pub key: String,
    pub bytes: Option<Vec<u8>>,
}

impl SourceRef {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            bytes: None,
        }
    }

    pub fn prefetched(key: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            bytes: Some(bytes),
        }
    }
}

/// A product together with the ordered photos eligible for thumbnailing.
/// An empty `sources` list means the product has no eligible photo, which is
/// a normal outcome, not an error.
#[derive(Debug, Clone)]
pub struct ProductCandidate {
    pub id: String,
    pub sources: Vec<SourceRef>,
}

/// How product photos are discovered. Exactly one strategy per run; the
/// config layer rejects flag combinations that would mix them.
pub enum Strategy {
    /// Page through the backend record API.
    Api(Box<dyn RecordPager>),
    /// Probe the canonical first-photo paths for a single product.
    Probe { product_id: String },
    /// List product ids under the source prefix, then probe each.
    Listing,
}

enum State {
    Api {
        pager: Box<dyn RecordPager>,
        page: u32,
        buf: VecDeque<(String, Vec<String>)>,
        done: bool,
    },
    Probe {
        product_id: Option<String>,
    },
    Listing {
        // Filled lazily from the bucket listing on first use.
        ids: Option<VecDeque<String>>,
    },
}

/// Lazily yields [`ProductCandidate`]s for the configured strategy, applying
/// the uniform product-id filter and max-candidate cap.
pub struct Resolver<'a, S: ObjectStore> {
    store: &'a S,
    endpoint: String,
    bucket: String,
    probe_http: Option<reqwest::Client>,
    state: State,
    only_first: bool,
    id_filter: Option<String>,
    max_products: usize,
    yielded: usize,
}

impl<'a, S: ObjectStore> Resolver<'a, S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: &'a S,
        endpoint: String,
        bucket: String,
        strategy: Strategy,
        probe_http: Option<reqwest::Client>,
        only_first: bool,
        id_filter: Option<String>,
        max_products: usize,
    ) -> Self {
        let state = match strategy {
            Strategy::Api(pager) => State::Api {
                pager,
                page: 1,
                buf: VecDeque::new(),
                done: false,
            },
            Strategy::Probe { product_id } => State::Probe {
                product_id: Some(product_id),
            },
            Strategy::Listing => State::Listing { ids: None },
        };

        Self {
            store,
            endpoint,
            bucket,
            probe_http,
            state,
            only_first,
            id_filter,
            max_products,
            yielded: 0,
        }
    }

    /// Next candidate, or `None` when the stream is exhausted or the cap is
    /// reached. An `Err` here is a systemic resolver failure (API pagination,
    /// bucket listing) and aborts the run; per-product probe misses never
    /// surface as errors.
    pub async fn next(&mut self) -> Result<Option<ProductCandidate>> {
        loop {
            if self.max_products > 0 && self.yielded >= self.max_products {
                return Ok(None);
            }

            let Some(candidate) = self.advance().await? else {
                return Ok(None);
            };
            if let Some(filter) = &self.id_filter {
                if &candidate.id != filter {
                    continue;
                }
            }

            self.yielded += 1;
            return Ok(Some(candidate));
        }
    }

    async fn advance(&mut self) -> Result<Option<ProductCandidate>> {
        if matches!(self.state, State::Api { .. }) {
            return self.advance_api().await;
        }

        // Listing resolves its id universe on first use, de-duplicated while
        // preserving listing order.
        if let State::Listing { ids } = &mut self.state {
            if ids.is_none() {
                let listed = self.store.list_prefixes(PRODUCTS_PREFIX).await?;
                let mut seen = HashSet::new();
                *ids = Some(
                    listed
                        .into_iter()
                        .filter(|id| seen.insert(id.clone()))
                        .collect(),
                );
            }
        }

        let next_id = match &mut self.state {
            State::Probe { product_id } => product_id.take(),
            State::Listing { ids } => ids.as_mut().and_then(|queue| queue.pop_front()),
            State::Api { .. } => unreachable!("handled above"),
        };
        let Some(id) = next_id else {
            return Ok(None);
        };

        let sources = match self.probe_first_photo(&id).await? {
            Some(source) => vec![source],
            None => Vec::new(),
        };
        Ok(Some(ProductCandidate { id, sources }))
    }

    async fn advance_api(&mut self) -> Result<Option<ProductCandidate>> {
        let State::Api {
            pager,
            page,
            buf,
            done,
        } = &mut self.state
        else {
            return Ok(None);
        };

        loop {
            if let Some((id, mut photos)) = buf.pop_front() {
                // In first-photo-only runs the record's literal first photo is
                // the only one considered; if it points outside the source
                // bucket the product yields nothing, rather than falling back
                // to a later photo.
                if self.only_first {
                    photos.truncate(1);
                }
                let sources = photos
                    .iter()
                    .filter_map(|url| object_key_from_url(url, &self.endpoint, &self.bucket))
                    .map(SourceRef::key)
                    .collect();
                return Ok(Some(ProductCandidate { id, sources }));
            }
            if *done {
                return Ok(None);
            }

            let items = pager.fetch_page(*page).await?;
            *page += 1;
            if items.is_empty() {
                *done = true;
            } else {
                buf.extend(items);
            }
        }
    }

    async fn probe_first_photo(&self, product_id: &str) -> Result<Option<SourceRef>> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Ok(None);
        }
        match &self.probe_http {
            Some(client) => probe_via_http(client, &self.endpoint, &self.bucket, product_id).await,
            None => probe_via_store(self.store, product_id).await,
        }
    }
}

/// Probes the canonical first-photo paths for a product directly in the
/// source bucket, stopping at the first non-empty hit. Transport failures on
/// one path are logged and treated as a miss so a single flaky key cannot
/// stall the batch.
pub async fn probe_via_store<S: ObjectStore>(
    store: &S,
    product_id: &str,
) -> Result<Option<SourceRef>> {
    for ext in PROBE_EXTENSIONS {
        let key = format!("{PRODUCTS_PREFIX}{product_id}/0.{ext}");
        match store.get(&key).await {
            Ok(Some(bytes)) if !bytes.is_empty() => {
                return Ok(Some(SourceRef::prefetched(key, bytes)))
            }
            Ok(_) => continue,
            Err(err) => {
                eprintln!("⚠️  probe {key}: {err}");
                continue;
            }
        }
    }
    Ok(None)
}

/// Same probe over unauthenticated HTTP. A 404 means "try the next
/// extension"; a 2xx with a non-image content type is an error page from the
/// bucket and also counts as a miss.
pub async fn probe_via_http(
    client: &reqwest::Client,
    endpoint: &str,
    bucket: &str,
    product_id: &str,
) -> Result<Option<SourceRef>> {
    let base = endpoint.trim_end_matches('/');

    for ext in PROBE_EXTENSIONS {
        let key = format!("{PRODUCTS_PREFIX}{product_id}/0.{ext}");
        let url = format!("{base}/{bucket}/{key}");

        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                eprintln!("⚠️  probe {url}: {err}");
                continue;
            }
        };
        if response.status() == StatusCode::NOT_FOUND {
            continue;
        }
        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(err) => {
                eprintln!("⚠️  probe {url}: {err}");
                continue;
            }
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.is_empty() && !content_type.starts_with("image/") {
            continue;
        }

        match response.bytes().await {
            Ok(body) if !body.is_empty() => {
                return Ok(Some(SourceRef::prefetched(key, body.to_vec())))
            }
            Ok(_) => continue,
            Err(err) => {
                eprintln!("⚠️  probe {url}: {err}");
                continue;
            }
        }
    }

    Ok(None)
}

/// HTTP client for the unauthenticated probe path, with the fixed browserish
/// header set some CDNs require before serving images.
pub fn probe_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(PROBE_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(PROBE_ACCEPT));
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
        .default_headers(headers)
        .build()?)
}

/// Maps a photo URL onto its key in the source bucket. URLs pointing anywhere
/// other than `{endpoint}/{bucket}/...` are not ours to thumbnail and map to
/// `None`.
pub fn object_key_from_url(url: &str, endpoint: &str, bucket: &str) -> Option<String> {
    let url = reqwest::Url::parse(url).ok()?;
    let base = reqwest::Url::parse(endpoint).ok()?;

    if url.scheme() != base.scheme()
        || url.host_str() != base.host_str()
        || url.port_or_known_default() != base.port_or_known_default()
    {
        return None;
    }

    let key = url
        .path()
        .strip_prefix(&format!("/{bucket}/"))?
        .trim_start_matches('/');
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThumbError;
    use crate::store::mem::MemStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ENDPOINT: &str = "https://hb.example-cloud.net";

    /// Serves a scripted sequence of pages, one per `fetch_page` call;
    /// exhausted scripts return empty pages.
    struct ScriptedPager {
        pages: Mutex<VecDeque<Result<Vec<(String, Vec<String>)>>>>,
    }

    impl ScriptedPager {
        fn new(pages: Vec<Result<Vec<(String, Vec<String>)>>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
            }
        }
    }

    #[async_trait]
    impl RecordPager for ScriptedPager {
        async fn fetch_page(&self, _page: u32) -> Result<Vec<(String, Vec<String>)>> {
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn record(id: &str, urls: &[&str]) -> (String, Vec<String>) {
        (
            id.to_string(),
            urls.iter().map(|u| u.to_string()).collect(),
        )
    }

    fn api_resolver(
        store: &MemStore,
        pages: Vec<Result<Vec<(String, Vec<String>)>>>,
        only_first: bool,
    ) -> Resolver<'_, MemStore> {
        Resolver::new(
            store,
            ENDPOINT.to_string(),
            "origbucket".to_string(),
            Strategy::Api(Box::new(ScriptedPager::new(pages))),
            None,
            only_first,
            None,
            0,
        )
    }

    #[test]
    fn url_maps_to_key_for_matching_bucket() {
        let key = object_key_from_url(
            "https://hb.example-cloud.net/origbucket/products/42/a.jpg",
            ENDPOINT,
            "origbucket",
        );
        assert_eq!(key.as_deref(), Some("products/42/a.jpg"));
    }

    #[test]
    fn url_outside_endpoint_or_bucket_is_rejected() {
        assert!(object_key_from_url(
            "https://elsewhere.net/origbucket/products/42/a.jpg",
            ENDPOINT,
            "origbucket"
        )
        .is_none());
        assert!(object_key_from_url(
            "https://hb.example-cloud.net/otherbucket/products/42/a.jpg",
            ENDPOINT,
            "origbucket"
        )
        .is_none());
        assert!(object_key_from_url(
            "http://hb.example-cloud.net/origbucket/products/42/a.jpg",
            ENDPOINT,
            "origbucket"
        )
        .is_none());
        assert!(object_key_from_url("not a url", ENDPOINT, "origbucket").is_none());
        assert!(object_key_from_url(
            "https://hb.example-cloud.net/origbucket/",
            ENDPOINT,
            "origbucket"
        )
        .is_none());
    }

    #[tokio::test]
    async fn probe_stops_at_first_hit() {
        let store = MemStore::with_objects(&[("products/42/0.png", b"png-bytes".as_slice())]);

        let hit = probe_via_store(&store, "42").await.unwrap().unwrap();
        assert_eq!(hit.key, "products/42/0.png");
        assert_eq!(hit.bytes.as_deref(), Some(b"png-bytes".as_slice()));

        // jpg and jpeg were tried and missed; webp was never attempted.
        let log = store.get_log();
        assert_eq!(
            log,
            vec![
                "products/42/0.jpg".to_string(),
                "products/42/0.jpeg".to_string(),
                "products/42/0.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn probe_miss_is_not_an_error() {
        let store = MemStore::default();
        let result = probe_via_store(&store, "42").await.unwrap();
        assert!(result.is_none());
        assert_eq!(store.get_log().len(), PROBE_EXTENSIONS.len());
    }

    #[tokio::test]
    async fn probe_skips_empty_objects() {
        let store = MemStore::with_objects(&[
            ("products/42/0.jpg", b"".as_slice()),
            ("products/42/0.png", b"real".as_slice()),
        ]);
        let hit = probe_via_store(&store, "42").await.unwrap().unwrap();
        assert_eq!(hit.key, "products/42/0.png");
    }

    #[tokio::test]
    async fn listing_resolver_yields_probed_candidates() {
        let store = MemStore::with_objects(&[
            ("products/1/0.jpg", b"one".as_slice()),
            ("products/2/0.png", b"two".as_slice()),
            ("products/3/nothing.txt", b"x".as_slice()),
        ]);

        let mut resolver = Resolver::new(
            &store,
            ENDPOINT.to_string(),
            "origbucket".to_string(),
            Strategy::Listing,
            None,
            true,
            None,
            0,
        );

        let first = resolver.next().await.unwrap().unwrap();
        assert_eq!(first.id, "1");
        assert_eq!(first.sources[0].key, "products/1/0.jpg");

        let second = resolver.next().await.unwrap().unwrap();
        assert_eq!(second.id, "2");

        // Product 3 has no photo at a canonical path: candidate with no
        // sources, still not an error.
        let third = resolver.next().await.unwrap().unwrap();
        assert_eq!(third.id, "3");
        assert!(third.sources.is_empty());

        assert!(resolver.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolver_applies_id_filter_and_cap() {
        let store = MemStore::with_objects(&[
            ("products/1/0.jpg", b"one".as_slice()),
            ("products/2/0.jpg", b"two".as_slice()),
            ("products/3/0.jpg", b"three".as_slice()),
        ]);

        let mut filtered = Resolver::new(
            &store,
            ENDPOINT.to_string(),
            "origbucket".to_string(),
            Strategy::Listing,
            None,
            true,
            Some("2".to_string()),
            0,
        );
        let only = filtered.next().await.unwrap().unwrap();
        assert_eq!(only.id, "2");
        assert!(filtered.next().await.unwrap().is_none());

        let mut capped = Resolver::new(
            &store,
            ENDPOINT.to_string(),
            "origbucket".to_string(),
            Strategy::Listing,
            None,
            true,
            None,
            2,
        );
        assert!(capped.next().await.unwrap().is_some());
        assert!(capped.next().await.unwrap().is_some());
        assert!(capped.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn single_probe_resolver_yields_once() {
        let store = MemStore::with_objects(&[("products/42/0.webp", b"w".as_slice())]);
        let mut resolver = Resolver::new(
            &store,
            ENDPOINT.to_string(),
            "origbucket".to_string(),
            Strategy::Probe {
                product_id: "42".to_string(),
            },
            None,
            true,
            Some("42".to_string()),
            0,
        );

        let candidate = resolver.next().await.unwrap().unwrap();
        assert_eq!(candidate.id, "42");
        assert_eq!(candidate.sources[0].key, "products/42/0.webp");
        assert!(resolver.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn api_resolver_pages_until_the_empty_page() {
        let store = MemStore::default();
        let mut resolver = api_resolver(
            &store,
            vec![
                Ok(vec![
                    record(
                        "1",
                        &["https://hb.example-cloud.net/origbucket/products/1/a.jpg"],
                    ),
                    record(
                        "2",
                        &["https://hb.example-cloud.net/origbucket/products/2/a.jpg"],
                    ),
                ]),
                Ok(vec![record(
                    "3",
                    &["https://hb.example-cloud.net/origbucket/products/3/a.jpg"],
                )]),
                Ok(Vec::new()),
            ],
            false,
        );

        let mut ids = Vec::new();
        while let Some(candidate) = resolver.next().await.unwrap() {
            ids.push(candidate.id);
        }
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn api_page_failure_aborts_the_stream() {
        let store = MemStore::default();
        let mut resolver = api_resolver(
            &store,
            vec![
                Ok(vec![record(
                    "1",
                    &["https://hb.example-cloud.net/origbucket/products/1/a.jpg"],
                )]),
                Err(ThumbError::Api("500 Internal Server Error".to_string())),
            ],
            false,
        );

        assert!(resolver.next().await.unwrap().is_some());
        assert!(matches!(resolver.next().await, Err(ThumbError::Api(_))));
    }

    #[tokio::test]
    async fn only_first_considers_the_literal_first_photo() {
        // First photo hosted elsewhere, second in the source bucket.
        let pages = || {
            vec![Ok(vec![record(
                "9",
                &[
                    "https://cdn.elsewhere.net/9/hero.jpg",
                    "https://hb.example-cloud.net/origbucket/products/9/b.jpg",
                ],
            )])]
        };

        // First-photo-only: the foreign first photo disqualifies the record
        // instead of falling through to the second one.
        let store = MemStore::default();
        let mut resolver = api_resolver(&store, pages(), true);
        let candidate = resolver.next().await.unwrap().unwrap();
        assert_eq!(candidate.id, "9");
        assert!(candidate.sources.is_empty());

        // Full runs still thumbnail every in-bucket photo.
        let mut resolver = api_resolver(&store, pages(), false);
        let candidate = resolver.next().await.unwrap().unwrap();
        assert_eq!(candidate.sources.len(), 1);
        assert_eq!(candidate.sources[0].key, "products/9/b.jpg");
    }
}
