//! Bucket listing.
//!
//! [`Lister::list_page`] fetches one page. [`Lister::list_all`] and
//! [`Lister::count`] follow the continuation marker until the service returns
//! an empty one, strictly one page at a time.

use kodo_models::{ListPage, Listing, Marker};
use tracing::debug;

use crate::client::KodoClient;
use crate::error::KodoResult;
use crate::metrics::record_list_page;

/// Parameters of a single-page listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub prefix: String,
    pub delimiter: String,
    pub marker: Marker,
    /// Page size; the configured default when `None`
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }
}

/// Paginated listing over the `rsf` endpoint.
#[derive(Clone)]
pub struct Lister {
    client: KodoClient,
    page_size: u32,
}

impl Lister {
    /// A `page_size` of zero is treated as one.
    pub fn new(client: KodoClient, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
        }
    }

    /// Fetch one page.
    pub async fn list_page(&self, bucket: &str, query: &ListQuery) -> KodoResult<ListPage> {
        let limit = query.limit.unwrap_or(self.page_size);
        let url = self.page_url(bucket, &query.prefix, &query.delimiter, &query.marker, limit);

        let body = self.client.get("list", url).await?;
        let page: ListPage = KodoClient::decode("list", &body)?;
        record_list_page();

        debug!(
            bucket = %bucket,
            items = page.items.len(),
            more = !page.marker.is_end(),
            "listed page"
        );
        Ok(page)
    }

    /// Follow the listing from `query.marker` to exhaustion, collecting items
    /// and common prefixes in page order.
    pub async fn list_all(&self, bucket: &str, query: ListQuery) -> KodoResult<Listing> {
        let mut listing = Listing::default();
        self.for_each_page(bucket, query, |page| {
            listing.items.extend(page.items);
            listing.common_prefixes.extend(page.common_prefixes);
        })
        .await?;
        Ok(listing)
    }

    /// Sum of item counts over every page from `query.marker`.
    ///
    /// Any page failure fails the count; no partial total is returned.
    pub async fn count(&self, bucket: &str, query: ListQuery) -> KodoResult<u64> {
        let mut amount = 0u64;
        self.for_each_page(bucket, query, |page| {
            amount += page.items.len() as u64;
        })
        .await?;
        Ok(amount)
    }

    async fn for_each_page<F>(
        &self,
        bucket: &str,
        mut query: ListQuery,
        mut visit: F,
    ) -> KodoResult<()>
    where
        F: FnMut(ListPage),
    {
        let mut pages = 0usize;

        loop {
            let mut page = self.list_page(bucket, &query).await?;
            pages += 1;

            let next = std::mem::take(&mut page.marker);
            visit(page);

            if next.is_end() {
                break;
            }
            query.marker = next;
        }

        debug!(bucket = %bucket, pages, "listing exhausted");
        Ok(())
    }

    fn page_url(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: &Marker,
        limit: u32,
    ) -> String {
        let mut url = format!(
            "{}/list?bucket={}",
            self.client.hosts().rsf,
            urlencoding::encode(bucket)
        );
        if !marker.is_end() {
            url.push_str(&format!("&marker={}", urlencoding::encode(marker.as_str())));
        }
        url.push_str(&format!("&limit={}", limit));
        if !prefix.is_empty() {
            url.push_str(&format!("&prefix={}", urlencoding::encode(prefix)));
        }
        if !delimiter.is_empty() {
            url.push_str(&format!("&delimiter={}", urlencoding::encode(delimiter)));
        }
        url
    }
}
