use async_trait::async_trait;
use serde::Serialize;
use std::convert::Infallible;

use crate::config::PagingSettings;
use crate::models::PaginationHeader;

/// A requested page, normalized so that number and size are both >= 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number: page_number.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Build a request from caller input, applying the configured
    /// default and maximum page size
    pub fn resolve(page_number: u32, page_size: Option<u32>, settings: &PagingSettings) -> Self {
        let size = page_size
            .unwrap_or(settings.default_page_size)
            .min(settings.max_page_size);
        Self::new(page_number, size)
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items before the first item of this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// ceil(total_count / page_size)
pub fn total_pages(total_count: u64, page_size: u32) -> u64 {
    total_count.div_ceil(u64::from(page_size.max(1)))
}

/// A candidate set that can be counted and sliced without loading it
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;
    type Error: Send;

    /// Size of the full candidate set
    async fn count(&self) -> Result<u64, Self::Error>;

    /// Up to `limit` items starting at `offset`, in the source's order
    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<Self::Item>, Self::Error>;
}

/// One page of results plus the metadata describing the whole set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    #[serde(rename = "currentPage")]
    pub current_page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl<T> PagedList<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            current_page: request.page_number,
            page_size: request.page_size,
            total_count,
            total_pages: total_pages(total_count, request.page_size),
        }
    }

    /// Count the source once and fetch the requested slice once
    ///
    /// A page past the end yields no items but keeps accurate totals.
    pub async fn create<S>(source: &S, request: PageRequest) -> Result<Self, S::Error>
    where
        S: PageSource<Item = T> + ?Sized,
    {
        let total_count = source.count().await?;
        let offset = request.offset();

        let items = if offset >= total_count {
            Vec::new()
        } else {
            source.fetch(offset, request.limit()).await?
        };

        Ok(Self::new(items, total_count, request))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn pagination_header(&self) -> PaginationHeader {
        PaginationHeader {
            current_page: self.current_page,
            items_per_page: self.page_size,
            total_items: self.total_count,
            total_pages: self.total_pages,
        }
    }

    /// Project each item, keeping the page metadata
    pub fn map<U, F>(self, f: F) -> PagedList<U>
    where
        F: FnMut(T) -> U,
    {
        PagedList {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

impl<'a, T> IntoIterator for &'a PagedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Page source over an already filtered and ordered slice
pub struct SliceSource<'a, T> {
    items: &'a [T],
}

impl<'a, T> SliceSource<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self { items }
    }
}

#[async_trait]
impl<T> PageSource for SliceSource<'_, T>
where
    T: Clone + Send + Sync,
{
    type Item = T;
    type Error = Infallible;

    async fn count(&self) -> Result<u64, Infallible> {
        Ok(self.items.len() as u64)
    }

    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<T>, Infallible> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);

        Ok(self
            .items
            .iter()
            .skip(start)
            .take(take)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        items: Vec<u32>,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for CountingSource {
        type Item = u32;
        type Error = Infallible;

        async fn count(&self) -> Result<u64, Infallible> {
            Ok(self.items.len() as u64)
        }

        async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<u32>, Infallible> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            SliceSource::new(&self.items).fetch(offset, limit).await
        }
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(7, 1), 7);
    }

    #[test]
    fn test_page_request_clamps_to_settings() {
        let settings = PagingSettings {
            default_page_size: 10,
            max_page_size: 50,
        };

        assert_eq!(PageRequest::resolve(0, None, &settings), PageRequest::new(1, 10));
        assert_eq!(PageRequest::resolve(3, Some(500), &settings).page_size(), 50);
        assert_eq!(PageRequest::resolve(2, Some(5), &settings).offset(), 5);
    }

    #[test]
    fn test_zero_page_number_reads_the_first_page() {
        let items = [1, 2, 3];
        let request = PageRequest::new(0, 2);
        assert_eq!(request.page_number(), 1);

        let page = tokio_test::block_on(PagedList::create(&SliceSource::new(&items), request)).unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.current_page, 1);

        let unnormalized = PageRequest {
            page_number: 0,
            page_size: 2,
        };
        assert_eq!(unnormalized.offset(), 0);
    }

    #[test]
    fn test_create_slices_requested_page() {
        let items: Vec<u32> = (1..=25).collect();
        let page = tokio_test::block_on(PagedList::create(
            &SliceSource::new(&items),
            PageRequest::new(3, 10),
        ))
        .unwrap();

        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 3);
    }

    #[test]
    fn test_page_past_end_is_empty_without_fetching() {
        let source = CountingSource {
            items: (0..12).collect(),
            fetches: AtomicUsize::new(0),
        };

        let page = tokio_test::block_on(PagedList::create(&source, PageRequest::new(9, 5))).unwrap();

        assert!(page.is_empty());
        assert_eq!(page.total_count, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let items: Vec<u32> = (0..4).collect();
        let page = tokio_test::block_on(PagedList::create(
            &SliceSource::new(&items),
            PageRequest::new(1, 3),
        ))
        .unwrap()
        .map(|n| n.to_string());

        assert_eq!(page.items, vec!["0", "1", "2"]);
        assert_eq!(page.pagination_header().total_pages, 2);
    }
}
