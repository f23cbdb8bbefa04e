use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::entity::list_type::ListType;

use super::credentials::Credentials;

/// Pagination metadata reported by the service for one page.
///
/// The service is authoritative: `total_pages` is re-read from every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationInfo {
    /// Page this metadata belongs to (1-indexed).
    pub page: u32,
    /// Total number of pages.
    pub total_pages: u32,
    /// Page size the server used.
    pub per_page: u32,
    /// Total number of items across all pages.
    pub total_items: u64,
}

impl PaginationInfo {
    /// Metadata for a single-page response holding `items` items.
    #[inline]
    pub fn single_page(items: usize) -> Self {
        Self {
            page: 1,
            total_pages: 1,
            per_page: items as u32,
            total_items: items as u64,
        }
    }

    /// Returns true if there are more pages after this one.
    #[inline]
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Typed outcome of one call to the catalog service.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// Success with payload and, for list endpoints, pagination metadata.
    Ok {
        payload: T,
        pagination: Option<PaginationInfo>,
    },
    /// The service rejected the call with a rate-limit response.
    RateLimited { retry_after: Option<Duration> },
    /// The service rejected the credentials.
    Unauthorized,
    /// The requested resource does not exist.
    NotFound,
    /// Any other failure (5xx, malformed payload, transport error).
    Failed { status: Option<u16>, message: String },
}

impl<T> FetchOutcome<T> {
    /// Success without pagination metadata.
    #[inline]
    pub fn ok(payload: T) -> Self {
        Self::Ok {
            payload,
            pagination: None,
        }
    }

    /// Success carrying pagination metadata.
    #[inline]
    pub fn page(payload: T, pagination: PaginationInfo) -> Self {
        Self::Ok {
            payload,
            pagination: Some(pagination),
        }
    }

    /// Apply `f` to a successful payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            Self::Ok {
                payload,
                pagination,
            } => FetchOutcome::Ok {
                payload: f(payload),
                pagination,
            },
            Self::RateLimited { retry_after } => FetchOutcome::RateLimited { retry_after },
            Self::Unauthorized => FetchOutcome::Unauthorized,
            Self::NotFound => FetchOutcome::NotFound,
            Self::Failed { status, message } => FetchOutcome::Failed { status, message },
        }
    }
}

/// A page of list items together with its pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub items: Vec<LibraryItem>,
    pub pagination: PaginationInfo,
}

/// One item of a remote list, in service-neutral form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryItem {
    /// Catalog release id.
    pub release_id: u64,
    /// Collection instance id; `None` for wantlist entries.
    pub instance_id: Option<u64>,
    pub title: String,
    pub artist: String,
    pub year: Option<i32>,
    pub format: Option<String>,
    pub thumb_url: Option<String>,
    pub folder_id: Option<u64>,
    pub rating: Option<u8>,
    pub date_added: Option<DateTime<FixedOffset>>,
}

/// Search hit returned by a catalog search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub release_id: u64,
    pub title: String,
    pub year: Option<i32>,
    pub thumb_url: Option<String>,
}

/// Full release detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDetail {
    pub release_id: u64,
    pub title: String,
    pub artists: Vec<String>,
    pub year: Option<i32>,
    pub formats: Vec<String>,
    pub genres: Vec<String>,
    pub styles: Vec<String>,
    pub lowest_price: Option<f64>,
    pub num_for_sale: Option<u32>,
}

/// Marketplace price statistics for a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub release_id: u64,
    pub lowest_price: Option<f64>,
    pub currency: Option<String>,
    pub num_for_sale: u32,
    pub blocked_from_sale: bool,
}

/// Whether a release is present on one of the user's lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub list_type: ListType,
    pub release_id: u64,
    /// Collection instance ids (wantlist entries carry none).
    pub instance_ids: Vec<u64>,
    /// True when the release appears on the list at least once.
    pub present: bool,
}

impl Membership {
    /// A negative membership answer.
    pub fn absent(list_type: ListType, release_id: u64) -> Self {
        Self {
            list_type,
            release_id,
            instance_ids: Vec::new(),
            present: false,
        }
    }

    /// Build a membership answer from the list entries the service returned.
    pub fn from_items(list_type: ListType, release_id: u64, items: &[LibraryItem]) -> Self {
        Self {
            list_type,
            release_id,
            instance_ids: items.iter().filter_map(|i| i.instance_id).collect(),
            present: !items.is_empty(),
        }
    }

    /// Number of copies on the list (wantlist membership counts as one).
    pub fn copies(&self) -> usize {
        if !self.present {
            0
        } else {
            self.instance_ids.len().max(1)
        }
    }
}

/// The remote fetch collaborator.
///
/// Implementations perform exactly one signed call per method invocation
/// and report a typed outcome; they never retry and never sleep. Rate
/// limiting, retry and credential handling live in
/// [`RateLimitedClient`](super::RateLimitedClient).
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Fetch page `page` (1-indexed) of one of the user's lists.
    async fn fetch_list_page(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        page: u32,
        per_page: u32,
    ) -> FetchOutcome<Vec<LibraryItem>>;

    /// Fetch full detail for a release.
    async fn fetch_release(
        &self,
        credentials: &Credentials,
        release_id: u64,
    ) -> FetchOutcome<ReleaseDetail>;

    /// Search the catalog for releases.
    async fn search(&self, credentials: &Credentials, query: &str)
    -> FetchOutcome<Vec<SearchResult>>;

    /// Fetch marketplace price statistics.
    async fn fetch_market_stats(
        &self,
        credentials: &Credentials,
        release_id: u64,
    ) -> FetchOutcome<MarketStats>;

    /// Fetch the entries of `release_id` on one of the user's lists.
    ///
    /// `NotFound` means the release is not on the list.
    async fn fetch_membership(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
    ) -> FetchOutcome<Vec<LibraryItem>>;

    /// Add a release to one of the user's lists.
    async fn add_to_list(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
    ) -> FetchOutcome<LibraryItem>;

    /// Remove a release from a list.
    ///
    /// Collection removals name the copy as `(folder_id, instance_id)`.
    async fn remove_from_list(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
        instance: Option<(u64, u64)>,
    ) -> FetchOutcome<()>;
}

#[async_trait]
impl<T: CatalogFetcher + ?Sized> CatalogFetcher for Arc<T> {
    async fn fetch_list_page(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        page: u32,
        per_page: u32,
    ) -> FetchOutcome<Vec<LibraryItem>> {
        (**self)
            .fetch_list_page(credentials, list_type, page, per_page)
            .await
    }

    async fn fetch_release(
        &self,
        credentials: &Credentials,
        release_id: u64,
    ) -> FetchOutcome<ReleaseDetail> {
        (**self).fetch_release(credentials, release_id).await
    }

    async fn search(&self, credentials: &Credentials, query: &str)
    -> FetchOutcome<Vec<SearchResult>> {
        (**self).search(credentials, query).await
    }

    async fn fetch_market_stats(
        &self,
        credentials: &Credentials,
        release_id: u64,
    ) -> FetchOutcome<MarketStats> {
        (**self).fetch_market_stats(credentials, release_id).await
    }

    async fn fetch_membership(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
    ) -> FetchOutcome<Vec<LibraryItem>> {
        (**self)
            .fetch_membership(credentials, list_type, release_id)
            .await
    }

    async fn add_to_list(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
    ) -> FetchOutcome<LibraryItem> {
        (**self).add_to_list(credentials, list_type, release_id).await
    }

    async fn remove_from_list(
        &self,
        credentials: &Credentials,
        list_type: ListType,
        release_id: u64,
        instance: Option<(u64, u64)>,
    ) -> FetchOutcome<()> {
        (**self)
            .remove_from_list(credentials, list_type, release_id, instance)
            .await
    }
}
