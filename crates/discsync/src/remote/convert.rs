//! Conversion from wire types to service-neutral platform types.

use chrono::DateTime;

use super::types::{
    BasicInformation, CollectionRelease, WantItem, WireArtist, WireFormat, WireMarketStats,
    WirePagination, WireRelease, WireSearchResult, WireYear,
};
use crate::platform::{LibraryItem, MarketStats, PaginationInfo, ReleaseDetail, SearchResult};

/// Strip the numeric disambiguation suffix the catalog appends to
/// duplicate artist names ("Nirvana (2)" becomes "Nirvana").
pub fn clean_artist_name(name: &str) -> &str {
    let trimmed = name.trim_end();
    if let Some(open) = trimmed.rfind(" (")
        && trimmed.ends_with(')')
    {
        let inner = &trimmed[open + 2..trimmed.len() - 1];
        if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
            return &trimmed[..open];
        }
    }
    trimmed
}

fn artist_line(artists: &[WireArtist]) -> String {
    artists
        .iter()
        .map(|a| clean_artist_name(&a.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_line(formats: &[WireFormat]) -> Option<String> {
    let first = formats.first()?;
    let mut parts = vec![first.name.as_str()];
    parts.extend(first.descriptions.iter().map(String::as_str));
    Some(parts.join(", "))
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

/// Year 0 means "unknown" in catalog payloads.
fn known_year(year: Option<i32>) -> Option<i32> {
    year.filter(|y| *y > 0)
}

fn base_item(info: &BasicInformation, rating: Option<u8>, date_added: Option<&str>) -> LibraryItem {
    LibraryItem {
        release_id: info.id,
        instance_id: None,
        title: info.title.clone(),
        artist: artist_line(&info.artists),
        year: known_year(info.year),
        format: format_line(&info.formats),
        thumb_url: non_empty(info.thumb.as_ref()),
        folder_id: None,
        rating: rating.filter(|r| *r > 0),
        date_added: date_added.and_then(|d| DateTime::parse_from_rfc3339(d).ok()),
    }
}

pub fn collection_item(release: &CollectionRelease) -> LibraryItem {
    LibraryItem {
        release_id: release.id,
        instance_id: Some(release.instance_id),
        folder_id: release.folder_id,
        ..base_item(
            &release.basic_information,
            release.rating,
            release.date_added.as_deref(),
        )
    }
}

pub fn want_item(want: &WantItem) -> LibraryItem {
    LibraryItem {
        release_id: want.id,
        ..base_item(
            &want.basic_information,
            want.rating,
            want.date_added.as_deref(),
        )
    }
}

/// Pagination metadata for a page, falling back to a single page holding
/// `items` entries when the response carries none.
pub fn pagination(wire: Option<WirePagination>, items: usize) -> PaginationInfo {
    match wire {
        Some(p) => PaginationInfo {
            page: p.page,
            total_pages: p.pages,
            per_page: p.per_page,
            total_items: p.items,
        },
        None => PaginationInfo::single_page(items),
    }
}

pub fn release_detail(release: WireRelease) -> ReleaseDetail {
    ReleaseDetail {
        release_id: release.id,
        artists: release
            .artists
            .iter()
            .map(|a| clean_artist_name(&a.name).to_string())
            .collect(),
        title: release.title,
        year: known_year(release.year),
        formats: release.formats.into_iter().map(|f| f.name).collect(),
        genres: release.genres,
        styles: release.styles,
        lowest_price: release.lowest_price,
        num_for_sale: release.num_for_sale,
    }
}

pub fn search_result(result: WireSearchResult) -> SearchResult {
    SearchResult {
        release_id: result.id,
        year: known_year(result.year.as_ref().and_then(WireYear::value)),
        thumb_url: non_empty(result.thumb.as_ref()),
        title: result.title,
    }
}

pub fn market_stats(release_id: u64, stats: WireMarketStats) -> MarketStats {
    let (lowest_price, currency) = match stats.lowest_price {
        Some(price) => (Some(price.value), price.currency),
        None => (None, None),
    };
    MarketStats {
        release_id,
        lowest_price,
        currency,
        num_for_sale: stats.num_for_sale.unwrap_or(0),
        blocked_from_sale: stats.blocked_from_sale,
    }
}
