//! Paginated results
//!
//! A [`PaginatedResult`] is an immutable snapshot of one page plus the means
//! to fetch any other page of the same query. Navigation never mutates the
//! cursor: `next_page` and `get_page` return a new one and the old one stays
//! valid.
//!
//! The service keys paging state by a table token returned with the first
//! page. Every re-fetch sends that token back alongside the page number.
//!
//! # Examples
//!
//! ```rust,no_run
//! use xpoz::{XpozClient, ClientOptions, QueryOptions};
//!
//! # async fn example() -> Result<(), xpoz::Error> {
//! let client = XpozClient::new(ClientOptions::from_env()?)?;
//! client.connect().await?;
//!
//! let first = client.twitter().search_posts("rust async", &QueryOptions::new()).await?;
//! println!("{}", first);
//!
//! if first.has_next_page() {
//!     let second = first.next_page().await?;
//!     println!("page 2 has {} posts", second.data.len());
//! }
//!
//! let everything = first.drain_all().await?;
//! let csv_url = first.export_csv().await?;
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::polling::Poller;
use crate::records::{Record, parse_records};
use crate::transport::ToolTransport;
use crate::types::{PaginationInfo, Payload, token};
use crate::{Error, Result};

const EXPORT_OPERATION_KEY: &str = "dataDumpExportOperationId";

/// The query a cursor re-issues to fetch other pages
pub(crate) struct PageSource {
    pub(crate) transport: Arc<dyn ToolTransport>,
    pub(crate) tool: String,
    pub(crate) base_args: Payload,
    pub(crate) poller: Poller,
}

/// One page of typed records with navigation and CSV export
#[derive(Clone)]
pub struct PaginatedResult<T> {
    /// Records on this page
    pub data: Vec<T>,

    /// Paging metadata for this page
    pub pagination: PaginationInfo,

    export_operation_id: Option<String>,
    source: Arc<PageSource>,
}

impl<T: fmt::Debug> fmt::Debug for PaginatedResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatedResult")
            .field("data", &self.data)
            .field("pagination", &self.pagination)
            .field("export_operation_id", &self.export_operation_id)
            .field("tool", &self.source.tool)
            .finish()
    }
}

impl<T> fmt::Display for PaginatedResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PaginatedResult(items={}, page={}/{}, total={})",
            self.data.len(),
            self.pagination.page_number,
            self.pagination.total_pages,
            self.pagination.total_rows
        )
    }
}

impl<T> PaginatedResult<T> {
    /// Server-side token tying this page to its result set
    pub fn table_name(&self) -> Option<&str> {
        self.pagination.table_name.as_deref()
    }

    /// Operation id of the CSV export job started with this query, if any
    pub fn export_operation_id(&self) -> Option<&str> {
        self.export_operation_id.as_deref()
    }

    pub fn has_next_page(&self) -> bool {
        self.pagination.page_number < self.pagination.total_pages
    }
}

impl<T: Record> PaginatedResult<T> {
    /// Build a cursor from a completed response
    pub(crate) fn from_response(raw: &Payload, source: Arc<PageSource>) -> Result<Self> {
        Ok(Self {
            data: parse_records(raw.get("results"))?,
            pagination: PaginationInfo::from_payload(raw),
            export_operation_id: raw.get(EXPORT_OPERATION_KEY).and_then(token),
            source,
        })
    }

    /// Fetch the page after this one
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] on the last page (no request is sent), otherwise
    /// any transport or polling error.
    pub async fn next_page(&self) -> Result<Self> {
        if !self.has_next_page() {
            return Err(Error::OutOfRange {
                page: self.pagination.page_number.saturating_add(1),
                total_pages: self.pagination.total_pages,
            });
        }
        self.fetch_page(self.pagination.page_number + 1).await
    }

    /// Fetch page `page_number` (1-based)
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] when `page_number` is outside `1..=total_pages`
    /// (no request is sent), otherwise any transport or polling error.
    pub async fn get_page(&self, page_number: i64) -> Result<Self> {
        if page_number < 1 || page_number > self.pagination.total_pages {
            return Err(Error::OutOfRange {
                page: page_number,
                total_pages: self.pagination.total_pages,
            });
        }
        self.fetch_page(page_number).await
    }

    /// This page's records followed by those of every later page, in order
    ///
    /// # Errors
    ///
    /// The first transport or polling error; records gathered so far are dropped.
    pub async fn drain_all(&self) -> Result<Vec<T>> {
        let mut all = self.data.clone();
        let mut current = self.pagination.page_number;

        while current < self.pagination.total_pages {
            current += 1;
            let page = self.fetch_page(current).await?;
            log::debug!("fetched page {}/{}", current, self.pagination.total_pages);
            all.extend(page.data);
        }
        Ok(all)
    }

    /// Wait for the export job and return the CSV download URL
    ///
    /// # Errors
    ///
    /// - [`Error::ExportUnavailable`] if the query started no export job
    /// - [`Error::Protocol`] if the job completed without a `downloadUrl`
    /// - any polling error
    pub async fn export_csv(&self) -> Result<String> {
        let operation_id = self
            .export_operation_id
            .as_deref()
            .ok_or(Error::ExportUnavailable)?;

        let result = self
            .source
            .poller
            .wait(self.source.transport.as_ref(), operation_id)
            .await?;

        result
            .get("downloadUrl")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::protocol(format!(
                    "export operation {} completed without a downloadUrl",
                    operation_id
                ))
            })
    }

    async fn fetch_page(&self, page_number: i64) -> Result<Self> {
        let mut args = self.source.base_args.clone();
        args.insert("pageNumber".to_string(), Value::from(page_number));
        if let Some(table) = self.table_name() {
            args.insert("tableName".to_string(), Value::from(table));
        }

        let raw = self
            .source
            .poller
            .call_and_wait(self.source.transport.as_ref(), &self.source.tool, args)
            .await?;

        let mut page = Self::from_response(&raw, Arc::clone(&self.source))?;
        if page.pagination.table_name.is_none() {
            page.pagination.table_name = self.pagination.table_name.clone();
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TwitterPost;
    use crate::test_support::ScriptedTransport;
    use serde_json::json;

    fn page(ids: &[&str], page_number: i64, total_pages: i64) -> Value {
        let results: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
        json!({
            "results": results,
            "pagination": {
                "tableName": "tbl_abc",
                "totalRows": 5,
                "totalPages": total_pages,
                "pageNumber": page_number,
                "pageSize": 2,
                "resultsCount": ids.len()
            }
        })
    }

    fn cursor(transport: &ScriptedTransport, first: Value) -> PaginatedResult<TwitterPost> {
        let mut base_args = Payload::new();
        base_args.insert("query".to_string(), json!("rust"));
        let source = Arc::new(PageSource {
            transport: Arc::new(transport.clone()),
            tool: "getTwitterPostsByKeywords".to_string(),
            base_args,
            poller: Poller::default(),
        });
        PaginatedResult::from_response(first.as_object().unwrap(), source).unwrap()
    }

    fn ids(posts: &[TwitterPost]) -> Vec<&str> {
        posts.iter().filter_map(|p| p.id.as_deref()).collect()
    }

    #[tokio::test]
    async fn test_next_page_sends_page_number_and_token() {
        let transport = ScriptedTransport::new().reply(page(&["3", "4"], 2, 3));
        let first = cursor(&transport, page(&["1", "2"], 1, 3));

        assert!(first.has_next_page());
        let second = first.next_page().await.unwrap();

        assert_eq!(ids(&second.data), vec!["3", "4"]);
        assert_eq!(second.pagination.page_number, 2);
        // the original snapshot is untouched
        assert_eq!(first.pagination.page_number, 1);

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        let (tool, args) = &calls[0];
        assert_eq!(tool, "getTwitterPostsByKeywords");
        assert_eq!(args["query"], "rust");
        assert_eq!(args["pageNumber"], 2);
        assert_eq!(args["tableName"], "tbl_abc");
    }

    #[tokio::test]
    async fn test_get_page_out_of_range_sends_nothing() {
        let transport = ScriptedTransport::new();
        let first = cursor(&transport, page(&["1", "2"], 1, 3));

        for n in [0, 4, 5] {
            let err = first.get_page(n).await.unwrap_err();
            assert_eq!(err.to_string(), format!("Page {} out of range (1-3)", n));
        }
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_next_page_on_last_page() {
        let transport = ScriptedTransport::new();
        let last = cursor(&transport, page(&["5"], 3, 3));

        assert!(!last.has_next_page());
        let err = last.next_page().await.unwrap_err();
        assert!(matches!(err, Error::OutOfRange { page: 4, total_pages: 3 }));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_drain_all_from_first_page() {
        let transport = ScriptedTransport::new()
            .reply(page(&["3", "4"], 2, 3))
            .reply(page(&["5"], 3, 3));
        let first = cursor(&transport, page(&["1", "2"], 1, 3));

        let all = first.drain_all().await.unwrap();
        assert_eq!(ids(&all), vec!["1", "2", "3", "4", "5"]);

        let pages: Vec<i64> = transport
            .calls()
            .iter()
            .map(|(_, args)| args["pageNumber"].as_i64().unwrap())
            .collect();
        assert_eq!(pages, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_drain_all_from_middle_page() {
        let transport = ScriptedTransport::new().reply(page(&["5"], 3, 3));
        let second = cursor(&transport, page(&["3", "4"], 2, 3));

        let all = second.drain_all().await.unwrap();
        assert_eq!(ids(&all), vec!["3", "4", "5"]);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_page_without_token_keeps_original() {
        let transport = ScriptedTransport::new()
            .reply(json!({"results": [{"id": "3"}], "pagination": {"totalPages": 3, "pageNumber": 2}}))
            .reply(page(&["5"], 3, 3));
        let first = cursor(&transport, page(&["1", "2"], 1, 3));

        let second = first.next_page().await.unwrap();
        assert_eq!(second.table_name(), Some("tbl_abc"));

        second.next_page().await.unwrap();
        assert_eq!(transport.calls()[1].1["tableName"], "tbl_abc");
    }

    #[tokio::test]
    async fn test_page_fetch_that_goes_async_is_polled() {
        let transport = ScriptedTransport::new()
            .reply(json!({"operationId": "op_p2", "status": "running"}))
            .reply(page(&["3", "4"], 2, 3));
        let first = cursor(&transport, page(&["1", "2"], 1, 3));

        let second = first.next_page().await.unwrap();
        assert_eq!(ids(&second.data), vec!["3", "4"]);

        let calls = transport.calls();
        assert_eq!(calls[1].0, "checkOperationStatus");
        assert_eq!(calls[1].1["operationId"], "op_p2");
    }

    #[tokio::test]
    async fn test_export_unavailable() {
        let transport = ScriptedTransport::new();
        let first = cursor(&transport, page(&["1"], 1, 1));

        assert_eq!(first.export_operation_id(), None);
        let err = first.export_csv().await.unwrap_err();
        assert!(matches!(err, Error::ExportUnavailable));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_export_polls_for_download_url() {
        let transport = ScriptedTransport::new()
            .reply(json!({"status": "completed", "downloadUrl": "https://files.xpoz.ai/export.csv"}));
        let mut first_page = page(&["1"], 1, 1);
        first_page["dataDumpExportOperationId"] = json!("op_export");
        let first = cursor(&transport, first_page);

        assert_eq!(first.export_operation_id(), Some("op_export"));
        let url = first.export_csv().await.unwrap();
        assert_eq!(url, "https://files.xpoz.ai/export.csv");

        let calls = transport.calls();
        assert_eq!(calls[0].0, "checkOperationStatus");
        assert_eq!(calls[0].1["operationId"], "op_export");
    }

    #[tokio::test]
    async fn test_numeric_tokens_from_text_payload() {
        let raw = crate::decoder::parse_response_text(
            "data:\n  results[1]{id}:\n    \"1\"\n  dataDumpExportOperationId: 99120033\n  pagination:\n    tableName: 4471\n    totalPages: 2\n    pageNumber: 1\n",
        );
        let transport = ScriptedTransport::new()
            .reply(page(&["2"], 2, 2))
            .reply(json!({"status": "completed", "downloadUrl": "https://files.xpoz.ai/all.csv"}));
        let first = cursor(&transport, Value::Object(raw));

        assert_eq!(first.export_operation_id(), Some("99120033"));
        assert_eq!(first.table_name(), Some("4471"));

        first.next_page().await.unwrap();
        let url = first.export_csv().await.unwrap();
        assert_eq!(url, "https://files.xpoz.ai/all.csv");

        let calls = transport.calls();
        assert_eq!(calls[0].1["tableName"], "4471");
        assert_eq!(calls[1].1["operationId"], "99120033");
    }

    #[tokio::test]
    async fn test_next_page_at_max_page_number_does_not_overflow() {
        let transport = ScriptedTransport::new();
        let last = cursor(
            &transport,
            json!({"results": [], "pagination": {"pageNumber": i64::MAX, "totalPages": i64::MAX}}),
        );

        let err = last.next_page().await.unwrap_err();
        assert!(matches!(err, Error::OutOfRange { page: i64::MAX, .. }));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_export_without_url_is_protocol_error() {
        let transport = ScriptedTransport::new().reply(json!({"status": "completed"}));
        let mut first_page = page(&["1"], 1, 1);
        first_page["dataDumpExportOperationId"] = json!("op_export");
        let first = cursor(&transport, first_page);

        let err = first.export_csv().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_display() {
        let transport = ScriptedTransport::new();
        let first = cursor(&transport, page(&["1", "2"], 1, 3));
        assert_eq!(first.to_string(), "PaginatedResult(items=2, page=1/3, total=5)");
    }

    #[test]
    fn test_cursor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PaginatedResult<TwitterPost>>();
    }
}
