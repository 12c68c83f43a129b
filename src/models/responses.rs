use serde::{Deserialize, Serialize};

/// Pagination metadata a caller attaches to a paged listing
///
/// Serializes to the JSON carried in the `Pagination` response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationHeader {
    #[serde(rename = "currentPage")]
    pub current_page: u32,
    #[serde(rename = "itemsPerPage")]
    pub items_per_page: u32,
    #[serde(rename = "totalItems")]
    pub total_items: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl PaginationHeader {
    pub const NAME: &'static str = "Pagination";

    pub fn to_header_value(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Header name and JSON value, ready to attach to a response
    pub fn to_header(&self) -> Result<(&'static str, String), serde_json::Error> {
        Ok((Self::NAME, self.to_header_value()?))
    }
}
