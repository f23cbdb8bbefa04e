//! Catalog API wire types.
//!
//! Only the fields the client reads are declared; everything else in the
//! payloads is ignored.

use serde::Deserialize;

/// Pagination object attached to list responses.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WirePagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub items: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireFormat {
    pub name: String,
    #[serde(default)]
    pub descriptions: Vec<String>,
}

/// Release summary embedded in collection and wantlist items.
#[derive(Debug, Clone, Deserialize)]
pub struct BasicInformation {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub artists: Vec<WireArtist>,
    #[serde(default)]
    pub formats: Vec<WireFormat>,
}

/// One copy of a release in the collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionRelease {
    pub id: u64,
    pub instance_id: u64,
    #[serde(default)]
    pub folder_id: Option<u64>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub date_added: Option<String>,
    pub basic_information: BasicInformation,
}

/// One wantlist entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WantItem {
    pub id: u64,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub date_added: Option<String>,
    pub basic_information: BasicInformation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionPage {
    #[serde(default)]
    pub pagination: Option<WirePagination>,
    #[serde(default)]
    pub releases: Vec<CollectionRelease>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WantsPage {
    #[serde(default)]
    pub pagination: Option<WirePagination>,
    #[serde(default)]
    pub wants: Vec<WantItem>,
}

/// Response to adding a release to a collection folder.
#[derive(Debug, Clone, Deserialize)]
pub struct AddedInstance {
    pub instance_id: u64,
}

/// Full release document.
#[derive(Debug, Clone, Deserialize)]
pub struct WireRelease {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub artists: Vec<WireArtist>,
    #[serde(default)]
    pub formats: Vec<WireFormat>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub lowest_price: Option<f64>,
    #[serde(default)]
    pub num_for_sale: Option<u32>,
}

/// Search results report the year as a string, sometimes as a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireYear {
    Number(i32),
    Text(String),
}

impl WireYear {
    pub fn value(&self) -> Option<i32> {
        match self {
            WireYear::Number(y) => Some(*y),
            WireYear::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireSearchResult {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<WireYear>,
    #[serde(default)]
    pub thumb: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub results: Vec<WireSearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePrice {
    pub value: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMarketStats {
    #[serde(default)]
    pub lowest_price: Option<WirePrice>,
    #[serde(default)]
    pub num_for_sale: Option<u32>,
    #[serde(default)]
    pub blocked_from_sale: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_page_deserializes_with_extra_fields() {
        let body = r#"{
            "pagination": {"page": 1, "pages": 2, "per_page": 2, "items": 3, "urls": {}},
            "releases": [{
                "id": 42,
                "instance_id": 7,
                "folder_id": 1,
                "rating": 4,
                "date_added": "2024-03-01T10:00:00-08:00",
                "basic_information": {
                    "id": 42,
                    "title": "Selected Ambient Works",
                    "year": 1992,
                    "thumb": "https://img.example.com/42.jpg",
                    "artists": [{"name": "Aphex Twin", "id": 45}],
                    "formats": [{"name": "Vinyl", "qty": "2", "descriptions": ["LP"]}]
                }
            }]
        }"#;
        let page: CollectionPage = serde_json::from_str(body).unwrap();
        let pagination = page.pagination.unwrap();
        assert_eq!(pagination.pages, 2);
        assert_eq!(pagination.items, 3);
        assert_eq!(page.releases[0].instance_id, 7);
        assert_eq!(page.releases[0].basic_information.artists[0].name, "Aphex Twin");
    }

    #[test]
    fn test_search_year_accepts_string_and_number() {
        let body = r#"{"results": [
            {"id": 1, "title": "A", "year": "1999"},
            {"id": 2, "title": "B", "year": 2001},
            {"id": 3, "title": "C", "year": ""},
            {"id": 4, "title": "D"}
        ]}"#;
        let page: SearchPage = serde_json::from_str(body).unwrap();
        let years: Vec<Option<i32>> = page
            .results
            .iter()
            .map(|r| r.year.as_ref().and_then(WireYear::value))
            .collect();
        assert_eq!(years, vec![Some(1999), Some(2001), None, None]);
    }

    #[test]
    fn test_market_stats_null_price() {
        let stats: WireMarketStats =
            serde_json::from_str(r#"{"lowest_price": null, "num_for_sale": 0, "blocked_from_sale": true}"#)
                .unwrap();
        assert!(stats.lowest_price.is_none());
        assert!(stats.blocked_from_sale);
    }
}
