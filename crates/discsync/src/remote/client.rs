//! HTTP implementation of the catalog fetch collaborator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use super::convert;
use super::error::RemoteError;
use super::signer::{AuthSigner, TokenSigner};
use super::types::{
    AddedInstance, CollectionPage, SearchPage, WantItem, WantsPage, WireMarketStats, WireRelease,
};
use crate::entity::list_type::ListType;
use crate::http::reqwest_transport::{DEFAULT_TIMEOUT, ReqwestTransport};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::platform::{
    CatalogFetcher, Credentials, FetchOutcome, LibraryItem, MarketStats, PaginationInfo,
    ReleaseDetail, SearchResult,
};

/// Public catalog API host.
pub const DEFAULT_BASE_URL: &str = "https://api.discogs.com";

/// User agent sent when none is configured; the service rejects requests
/// without one.
pub const DEFAULT_USER_AGENT: &str = concat!("discsync/", env!("CARGO_PKG_VERSION"));

/// Folder new collection items are filed into ("Uncategorized").
const DEFAULT_ADD_FOLDER: u64 = 1;

/// Folder id addressing every folder of a collection.
const ALL_FOLDERS: u64 = 0;

/// Why a request did not produce a payload.
#[derive(Debug)]
enum Rejection {
    RateLimited(Option<Duration>),
    Unauthorized,
    NotFound,
    Failed { status: Option<u16>, message: String },
}

impl Rejection {
    fn failed(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Failed {
            status,
            message: message.into(),
        }
    }

    fn into_outcome<T>(self) -> FetchOutcome<T> {
        match self {
            Self::RateLimited(retry_after) => FetchOutcome::RateLimited { retry_after },
            Self::Unauthorized => FetchOutcome::Unauthorized,
            Self::NotFound => FetchOutcome::NotFound,
            Self::Failed { status, message } => FetchOutcome::Failed { status, message },
        }
    }
}

fn outcome<T>(result: Result<T, Rejection>) -> FetchOutcome<T> {
    match result {
        Ok(payload) => FetchOutcome::ok(payload),
        Err(rejection) => rejection.into_outcome(),
    }
}

fn paged_outcome<T>(result: Result<(T, PaginationInfo), Rejection>) -> FetchOutcome<T> {
    match result {
        Ok((payload, pagination)) => FetchOutcome::page(payload, pagination),
        Err(rejection) => rejection.into_outcome(),
    }
}

/// Parse an integer-seconds `Retry-After` header. HTTP-date values are
/// ignored and fall back to the limiter's exponential schedule.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Classify a response by status code.
fn check_status(response: HttpResponse) -> Result<HttpResponse, Rejection> {
    match response.status {
        200..=299 => Ok(response),
        401 | 403 => Err(Rejection::Unauthorized),
        404 => Err(Rejection::NotFound),
        429 => Err(Rejection::RateLimited(parse_retry_after(
            response.header("retry-after"),
        ))),
        status => Err(Rejection::failed(Some(status), error_message(&response))),
    }
}

/// Extract the `message` field of an error body, or the raw body.
fn error_message(response: &HttpResponse) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_slice::<ErrorBody>(&response.body) {
        Ok(body) => body.message,
        Err(_) => {
            let text = response.text();
            if text.trim().is_empty() {
                format!("HTTP {}", response.status)
            } else {
                text
            }
        }
    }
}

fn decode<W: DeserializeOwned>(response: &HttpResponse) -> Result<W, Rejection> {
    serde_json::from_slice(&response.body).map_err(|e| {
        Rejection::failed(Some(response.status), format!("invalid response body: {e}"))
    })
}

/// Catalog API client.
///
/// Performs one signed HTTP exchange per call and reports a typed
/// [`FetchOutcome`]. It never sleeps or retries; wrap it in a
/// [`RateLimitedClient`](crate::platform::RateLimitedClient) for that.
#[derive(Clone)]
pub struct CatalogClient {
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AuthSigner>,
    base_url: Url,
    user_agent: String,
}

impl CatalogClient {
    /// Create a client using reqwest and personal-token signing.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = CatalogClient::new(DEFAULT_BASE_URL, DEFAULT_USER_AGENT)?;
    /// let client = RateLimitedClient::new(client, limiter, credentials);
    /// ```
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, RemoteError> {
        let transport = ReqwestTransport::with_timeout(DEFAULT_TIMEOUT)?;
        Self::new_with_transport(
            base_url,
            user_agent,
            Arc::new(transport),
            Arc::new(TokenSigner),
        )
    }

    pub fn new_with_transport(
        base_url: &str,
        user_agent: &str,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn AuthSigner>,
    ) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::NotABase(base_url.to_string()));
        }
        let user_agent = if user_agent.trim().is_empty() {
            DEFAULT_USER_AGENT.to_string()
        } else {
            user_agent.to_string()
        };
        Ok(Self {
            transport,
            signer,
            base_url,
            user_agent,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL from path segments and query pairs.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    async fn exchange(
        &self,
        method: HttpMethod,
        url: Url,
        credentials: &Credentials,
    ) -> Result<HttpResponse, Rejection> {
        let url = String::from(url);
        let authorization = self.signer.sign(method, &url, credentials);
        let request = HttpRequest::new(method, url)
            .header("Accept", "application/json")
            .header("User-Agent", self.user_agent.as_str())
            .header("Authorization", authorization);

        tracing::trace!(%method, url = %request.url, "Sending catalog request");
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| Rejection::failed(None, e.to_string()))?;
        check_status(response)
    }

    async fn get_json<W: DeserializeOwned>(
        &self,
        url: Url,
        credentials: &Credentials,
    ) -> Result<W, Rejection> {
        let response = self
            .exchange(HttpMethod::Get, url, credentials)
            .await?;
        decode(&response)
    }

    async fn list_page(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<LibraryItem>, PaginationInfo), Rejection> {
        let page = page.to_string();
        let per_page = per_page.to_string();
        let query = [("page", page.as_str()), ("per_page", per_page.as_str())];
        let user = credentials.username.as_str();

        match list_type {
            ListType::Collection => {
                let folder = ALL_FOLDERS.to_string();
                let url = self.endpoint(
                    &["users", user, "collection", "folders", &folder, "releases"],
                    &query,
                );
                let body: CollectionPage = self.get_json(url, credentials).await?;
                let items: Vec<LibraryItem> =
                    body.releases.iter().map(convert::collection_item).collect();
                let pagination = convert::pagination(body.pagination, items.len());
                Ok((items, pagination))
            }
            ListType::Wantlist => {
                let url = self.endpoint(&["users", user, "wants"], &query);
                let body: WantsPage = self.get_json(url, credentials).await?;
                let items: Vec<LibraryItem> = body.wants.iter().map(convert::want_item).collect();
                let pagination = convert::pagination(body.pagination, items.len());
                Ok((items, pagination))
            }
        }
    }

    async fn membership(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
    ) -> Result<Vec<LibraryItem>, Rejection> {
        let id = release_id.to_string();
        let user = credentials.username.as_str();
        match list_type {
            ListType::Collection => {
                let url = self.endpoint(&["users", user, "collection", "releases", &id], &[]);
                let body: CollectionPage = self.get_json(url, credentials).await?;
                Ok(body.releases.iter().map(convert::collection_item).collect())
            }
            ListType::Wantlist => {
                let url = self.endpoint(&["users", user, "wants", &id], &[]);
                let want: WantItem = self.get_json(url, credentials).await?;
                Ok(vec![convert::want_item(&want)])
            }
        }
    }

    async fn add(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
    ) -> Result<LibraryItem, Rejection> {
        let id = release_id.to_string();
        let user = credentials.username.as_str();
        match list_type {
            ListType::Collection => {
                let folder = DEFAULT_ADD_FOLDER.to_string();
                let url = self.endpoint(
                    &["users", user, "collection", "folders", &folder, "releases", &id],
                    &[],
                );
                let response = self
                    .exchange(HttpMethod::Post, url, credentials)
                    .await?;
                let added: AddedInstance = decode(&response)?;
                Ok(LibraryItem {
                    release_id,
                    instance_id: Some(added.instance_id),
                    title: String::new(),
                    artist: String::new(),
                    year: None,
                    format: None,
                    thumb_url: None,
                    folder_id: Some(DEFAULT_ADD_FOLDER),
                    rating: None,
                    date_added: None,
                })
            }
            ListType::Wantlist => {
                let url = self.endpoint(&["users", user, "wants", &id], &[]);
                let response = self
                    .exchange(HttpMethod::Put, url, credentials)
                    .await?;
                let want: WantItem = decode(&response)?;
                Ok(convert::want_item(&want))
            }
        }
    }

    async fn remove(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
        instance: Option<(u64, u64)>,
    ) -> Result<(), Rejection> {
        let id = release_id.to_string();
        let user = credentials.username.as_str();
        let url = match (list_type, instance) {
            (ListType::Collection, Some((folder_id, instance_id))) => {
                let folder = folder_id.to_string();
                let instance = instance_id.to_string();
                self.endpoint(
                    &[
                        "users",
                        user,
                        "collection",
                        "folders",
                        &folder,
                        "releases",
                        &id,
                        "instances",
                        &instance,
                    ],
                    &[],
                )
            }
            (ListType::Collection, None) => {
                return Err(Rejection::failed(
                    None,
                    "removing from a collection requires a folder and instance id",
                ));
            }
            (ListType::Wantlist, _) => self.endpoint(&["users", user, "wants", &id], &[]),
        };
        self.exchange(HttpMethod::Delete, url, credentials)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl CatalogFetcher for CatalogClient {
    async fn fetch_list_page(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        page: u32,
        per_page: u32,
    ) -> FetchOutcome<Vec<LibraryItem>> {
        paged_outcome(self.list_page(credentials, list_type, page, per_page).await)
    }

    async fn fetch_release(
        &self,
        credentials: &Credentials,
        release_id: u64,
    ) -> FetchOutcome<ReleaseDetail> {
        let id = release_id.to_string();
        let url = self.endpoint(&["releases", &id], &[]);
        outcome(
            self.get_json::<WireRelease>(url, credentials)
                .await
                .map(convert::release_detail),
        )
    }

    async fn search(
        &self,
        credentials: &Credentials,
        query: &str,
    ) -> FetchOutcome<Vec<SearchResult>> {
        let url = self.endpoint(&["database", "search"], &[("q", query), ("type", "release")]);
        outcome(
            self.get_json::<SearchPage>(url, credentials)
                .await
                .map(|page| {
                    page.results
                        .into_iter()
                        .map(convert::search_result)
                        .collect()
                }),
        )
    }

    async fn fetch_market_stats(
        &self,
        credentials: &Credentials,
        release_id: u64,
    ) -> FetchOutcome<MarketStats> {
        let id = release_id.to_string();
        let url = self.endpoint(&["marketplace", "stats", &id], &[]);
        outcome(
            self.get_json::<WireMarketStats>(url, credentials)
                .await
                .map(|stats| convert::market_stats(release_id, stats)),
        )
    }

    async fn fetch_membership(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
    ) -> FetchOutcome<Vec<LibraryItem>> {
        outcome(self.membership(credentials, list_type, release_id).await)
    }

    async fn add_to_list(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
    ) -> FetchOutcome<LibraryItem> {
        outcome(self.add(credentials, list_type, release_id).await)
    }

    async fn remove_from_list(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
        instance: Option<(u64, u64)>,
    ) -> FetchOutcome<()> {
        outcome(self.remove(credentials, list_type, release_id, instance).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockTransport, header_get};

    const BASE: &str = "https://api.example.com";

    fn client(transport: &MockTransport) -> CatalogClient {
        CatalogClient::new_with_transport(
            BASE,
            "discsync-test/1.0",
            Arc::new(transport.clone()),
            Arc::new(TokenSigner),
        )
        .unwrap()
    }

    fn creds() -> Credentials {
        Credentials::new("alice", "tok")
    }

    fn with_retry_after(status: u16, value: &str) -> HttpResponse {
        let mut resp = HttpResponse::json(status, "{}");
        resp.headers
            .push(("Retry-After".to_string(), value.to_string()));
        resp
    }

    const WANTS_PAGE: &str = r#"{
        "pagination": {"page": 1, "pages": 3, "per_page": 2, "items": 5},
        "wants": [
            {"id": 1, "rating": 0, "date_added": "2024-01-01T00:00:00-00:00",
             "basic_information": {"id": 1, "title": "One", "year": 1990,
                "artists": [{"name": "A"}], "formats": [{"name": "CD"}]}},
            {"id": 2, "basic_information": {"id": 2, "title": "Two"}}
        ]
    }"#;

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("3")), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(Some(" 10 ")), Some(Duration::from_secs(10)));
        assert_eq!(
            parse_retry_after(Some("Wed, 21 Oct 2026 07:28:00 GMT")),
            None
        );
        assert_eq!(parse_retry_after(None), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absurd_retry_after_header_backs_off_without_panicking() {
        use crate::platform::{RateLimitConfig, RateLimiter, rate_limits};

        let retry_after = parse_retry_after(Some("18446744073709551615"));
        assert!(retry_after.is_some());

        let limiter = RateLimiter::new(RateLimitConfig::default());
        let waited = tokio::spawn(async move { limiter.backoff(0, retry_after).await })
            .await
            .expect("backoff task");
        assert!(waited <= Duration::from_secs(rate_limits::MAX_RETRY_AFTER_SECS + 1));
    }

    #[test]
    fn test_rejects_non_base_url() {
        let transport = MockTransport::new();
        let result = CatalogClient::new_with_transport(
            "mailto:someone@example.com",
            "",
            Arc::new(transport),
            Arc::new(TokenSigner),
        );
        assert!(matches!(result, Err(RemoteError::NotABase(_))));
    }

    #[tokio::test]
    async fn test_wantlist_page_request_and_pagination() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/users/alice/wants?page=1&per_page=2"),
            HttpResponse::json(200, WANTS_PAGE),
        );

        let outcome = client(&transport)
            .fetch_list_page(&creds(), ListType::Wantlist, 1, 2)
            .await;

        let FetchOutcome::Ok {
            payload,
            pagination: Some(pagination),
        } = outcome
        else {
            panic!("expected a page");
        };
        assert_eq!(payload.len(), 2);
        assert_eq!(payload[0].artist, "A");
        assert_eq!(payload[1].instance_id, None);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.total_items, 5);

        let requests = transport.requests();
        let headers = &requests[0].headers;
        assert_eq!(header_get(headers, "authorization"), Some("Discogs token=tok"));
        assert_eq!(header_get(headers, "user-agent"), Some("discsync-test/1.0"));
    }

    #[tokio::test]
    async fn test_collection_page_uses_all_folders() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/users/alice/collection/folders/0/releases?page=2&per_page=50"),
            HttpResponse::json(
                200,
                r#"{"pagination": {"page": 2, "pages": 2, "per_page": 50, "items": 51},
                    "releases": [{"id": 9, "instance_id": 90, "folder_id": 1,
                        "basic_information": {"id": 9, "title": "Nine"}}]}"#,
            ),
        );

        let outcome = client(&transport)
            .fetch_list_page(&creds(), ListType::Collection, 2, 50)
            .await;
        let FetchOutcome::Ok { payload, .. } = outcome else {
            panic!("expected a page");
        };
        assert_eq!(payload[0].instance_id, Some(90));
        assert_eq!(payload[0].folder_id, Some(1));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let transport = MockTransport::new();
        let url = format!("{BASE}/releases/5");
        transport.push_response(HttpMethod::Get, &url, with_retry_after(429, "3"));
        transport.push_response(HttpMethod::Get, &url, HttpResponse::json(401, "{}"));
        transport.push_response(HttpMethod::Get, &url, HttpResponse::json(403, "{}"));
        transport.push_response(HttpMethod::Get, &url, HttpResponse::json(404, "{}"));
        transport.push_response(
            HttpMethod::Get,
            &url,
            HttpResponse::json(502, r#"{"message": "Bad gateway"}"#),
        );
        transport.push_response(HttpMethod::Get, &url, HttpResponse::json(200, "not json"));

        let client = client(&transport);
        let creds = creds();

        assert_eq!(
            client.fetch_release(&creds, 5).await,
            FetchOutcome::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
        assert_eq!(client.fetch_release(&creds, 5).await, FetchOutcome::Unauthorized);
        assert_eq!(client.fetch_release(&creds, 5).await, FetchOutcome::Unauthorized);
        assert_eq!(client.fetch_release(&creds, 5).await, FetchOutcome::NotFound);
        assert_eq!(
            client.fetch_release(&creds, 5).await,
            FetchOutcome::Failed {
                status: Some(502),
                message: "Bad gateway".to_string()
            }
        );
        assert!(matches!(
            client.fetch_release(&creds, 5).await,
            FetchOutcome::Failed {
                status: Some(200),
                ..
            }
        ));
        // queue drained: transport error, no status
        assert!(matches!(
            client.fetch_release(&creds, 5).await,
            FetchOutcome::Failed { status: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_release_detail() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/releases/249504"),
            HttpResponse::json(
                200,
                r#"{"id": 249504, "title": "Never Gonna Give You Up", "year": 1987,
                    "artists": [{"name": "Rick Astley"}], "formats": [{"name": "Vinyl"}],
                    "genres": ["Pop"], "styles": ["Synth-pop"],
                    "lowest_price": 0.63, "num_for_sale": 58}"#,
            ),
        );

        let outcome = client(&transport).fetch_release(&creds(), 249504).await;
        let FetchOutcome::Ok { payload, .. } = outcome else {
            panic!("expected release");
        };
        assert_eq!(payload.artists, vec!["Rick Astley".to_string()]);
        assert_eq!(payload.year, Some(1987));
        assert_eq!(payload.num_for_sale, Some(58));
    }

    #[tokio::test]
    async fn test_search_encodes_query() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/database/search?q=boards+of+canada&type=release"),
            HttpResponse::json(
                200,
                r#"{"results": [{"id": 1, "title": "Geogaddi", "year": "2002"}]}"#,
            ),
        );

        let outcome = client(&transport)
            .search(&creds(), "boards of canada")
            .await;
        let FetchOutcome::Ok { payload, .. } = outcome else {
            panic!("expected results");
        };
        assert_eq!(payload[0].year, Some(2002));
    }

    #[tokio::test]
    async fn test_market_stats_endpoint() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/marketplace/stats/7"),
            HttpResponse::json(
                200,
                r#"{"lowest_price": {"value": 4.2, "currency": "USD"}, "num_for_sale": 3}"#,
            ),
        );

        let outcome = client(&transport).fetch_market_stats(&creds(), 7).await;
        let FetchOutcome::Ok { payload, .. } = outcome else {
            panic!("expected stats");
        };
        assert_eq!(payload.release_id, 7);
        assert_eq!(payload.lowest_price, Some(4.2));
        assert!(!payload.blocked_from_sale);
    }

    #[tokio::test]
    async fn test_membership_endpoints() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/users/alice/collection/releases/3"),
            HttpResponse::json(
                200,
                r#"{"pagination": {"page": 1, "pages": 1, "per_page": 50, "items": 2},
                    "releases": [
                        {"id": 3, "instance_id": 30, "basic_information": {"id": 3}},
                        {"id": 3, "instance_id": 31, "basic_information": {"id": 3}}]}"#,
            ),
        );
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/users/alice/wants/3"),
            HttpResponse::json(404, r#"{"message": "Release not in wantlist."}"#),
        );

        let client = client(&transport);
        let outcome = client
            .fetch_membership(&creds(), ListType::Collection, 3)
            .await;
        let FetchOutcome::Ok { payload, .. } = outcome else {
            panic!("expected items");
        };
        let instances: Vec<Option<u64>> = payload.iter().map(|i| i.instance_id).collect();
        assert_eq!(instances, vec![Some(30), Some(31)]);

        assert_eq!(
            client
                .fetch_membership(&creds(), ListType::Wantlist, 3)
                .await,
            FetchOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Post,
            format!("{BASE}/users/alice/collection/folders/1/releases/8"),
            HttpResponse::json(201, r#"{"instance_id": 80, "resource_url": "x"}"#),
        );
        transport.push_response(
            HttpMethod::Put,
            format!("{BASE}/users/alice/wants/8"),
            HttpResponse::json(201, r#"{"id": 8, "basic_information": {"id": 8, "title": "Eight"}}"#),
        );
        transport.push_response(
            HttpMethod::Delete,
            format!("{BASE}/users/alice/collection/folders/1/releases/8/instances/80"),
            HttpResponse::json(204, Vec::new()),
        );
        transport.push_response(
            HttpMethod::Delete,
            format!("{BASE}/users/alice/wants/8"),
            HttpResponse::json(204, Vec::new()),
        );

        let client = client(&transport);
        let creds = creds();

        let FetchOutcome::Ok { payload: added, .. } =
            client.add_to_list(&creds, ListType::Collection, 8).await
        else {
            panic!("collection add failed");
        };
        assert_eq!(added.instance_id, Some(80));
        assert_eq!(added.folder_id, Some(1));

        let FetchOutcome::Ok { payload: want, .. } =
            client.add_to_list(&creds, ListType::Wantlist, 8).await
        else {
            panic!("wantlist add failed");
        };
        assert_eq!(want.title, "Eight");

        assert_eq!(
            client
                .remove_from_list(&creds, ListType::Collection, 8, Some((1, 80)))
                .await,
            FetchOutcome::ok(())
        );
        assert_eq!(
            client
                .remove_from_list(&creds, ListType::Wantlist, 8, None)
                .await,
            FetchOutcome::ok(())
        );
        assert!(matches!(
            client
                .remove_from_list(&creds, ListType::Collection, 8, None)
                .await,
            FetchOutcome::Failed { status: None, .. }
        ));

        // the instance-less collection removal never reached the transport
        assert_eq!(transport.requests().len(), 4);
    }
}
