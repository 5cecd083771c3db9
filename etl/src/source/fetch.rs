use etl_config::shared::PageConfig;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EtlResult;
use crate::source::client::SubgraphClient;
use crate::source::query::{QueryBindings, QueryTemplate};
use crate::types::Window;

/// The result of draining one window through offset pagination.
#[derive(Debug, Clone, Default)]
pub struct WindowFetch {
    /// All raw records retrieved for the window, in ascending time order.
    pub records: Vec<Value>,
    /// Number of page requests issued.
    pub requests: usize,
    /// True when the pagination ceiling was reached while the last page was still
    /// full: the window may contain more matching records than were retrieved, and
    /// only a smaller window duration can recover them.
    pub saturated: bool,
}

/// Drains single windows through bounded offset pagination.
///
/// Within one window, pages are requested at offsets `0, page_size, 2 * page_size, ...`
/// strictly in order, each in ascending time order, until the window is exhausted or
/// the source's pagination ceiling is hit. A transport or query failure stops paging
/// immediately and surfaces to the caller; the fetcher never advances past a failed
/// page as if the window were exhausted.
#[derive(Debug, Clone, Copy)]
pub struct WindowFetcher<'a, C> {
    client: &'a C,
    template: &'a QueryTemplate,
    page: &'a PageConfig,
}

impl<'a, C: SubgraphClient> WindowFetcher<'a, C> {
    pub fn new(client: &'a C, template: &'a QueryTemplate, page: &'a PageConfig) -> Self {
        Self {
            client,
            template,
            page,
        }
    }

    /// Retrieves the complete set of records matching `window`, subject to the
    /// pagination ceiling.
    pub async fn fetch_window(&self, window: &Window) -> EtlResult<WindowFetch> {
        let mut fetch = WindowFetch::default();

        for page_index in 0..self.page.max_offset_pages {
            let bindings = QueryBindings {
                first: self.page.page_size,
                skip: page_index * self.page.page_size,
                start: window.start_epoch(),
                end: window.end_epoch(),
            };

            let records = match self.client.fetch_page(self.template, bindings).await {
                Ok(records) => records,
                Err(error) => {
                    // The window is possibly incomplete; records from prior pages are
                    // discarded with it, never loaded as if it were exhausted.
                    warn!(
                        window = %window,
                        page = page_index,
                        retrieved = fetch.records.len(),
                        "page request failed mid-window"
                    );
                    return Err(error);
                }
            };
            fetch.requests += 1;

            debug!(
                window = %window,
                page = page_index,
                records = records.len(),
                "fetched page"
            );

            if records.is_empty() {
                break;
            }

            let full_page = records.len() >= self.page.page_size;
            fetch.records.extend(records);

            if !full_page {
                break;
            }

            if page_index + 1 == self.page.max_offset_pages {
                // The ceiling was reached with the page still full; anything beyond
                // it is unreachable at this window duration.
                fetch.saturated = true;
                warn!(
                    window = %window,
                    retrieved = fetch.records.len(),
                    "pagination ceiling reached with a full page; window may be undercounted, \
                     reduce the window duration to recover the remainder"
                );
            }
        }

        Ok(fetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use serde_json::json;

    use crate::bail;
    use crate::error::ErrorKind;

    /// Serves a fixed record set through honest offset pagination, recording the
    /// number of page requests.
    struct ScriptedClient {
        records: Vec<Value>,
        requests: Mutex<usize>,
        fail_at_request: Option<usize>,
    }

    impl ScriptedClient {
        fn with_records(count: usize) -> Self {
            let records = (0..count).map(|i| json!({ "id": format!("0x{i:x}") })).collect();

            Self {
                records,
                requests: Mutex::new(0),
                fail_at_request: None,
            }
        }

        fn requests(&self) -> usize {
            *self.requests.lock().unwrap()
        }
    }

    impl SubgraphClient for ScriptedClient {
        async fn fetch_page(
            &self,
            _template: &QueryTemplate,
            bindings: QueryBindings,
        ) -> EtlResult<Vec<Value>> {
            let mut requests = self.requests.lock().unwrap();
            *requests += 1;

            if Some(*requests) == self.fail_at_request {
                bail!(
                    ErrorKind::SourceTransportFailed,
                    "Source returned non-success status",
                    "HTTP 502"
                );
            }

            let start = bindings.skip.min(self.records.len());
            let end = (bindings.skip + bindings.first).min(self.records.len());

            Ok(self.records[start..end].to_vec())
        }
    }

    fn template() -> QueryTemplate {
        QueryTemplate::from_text(
            r#"{ deposits(first: $first, skip: $skip, where: {timestamp_gte: "$start_ts", timestamp_lt: "$end_ts"}) { id } }"#,
        )
        .unwrap()
    }

    fn page_config() -> PageConfig {
        PageConfig {
            page_size: 1000,
            max_offset_pages: 5,
        }
    }

    fn window() -> Window {
        let range = crate::types::TimeRange::from_dates("2024-01-01", "2024-01-02").unwrap();
        Window {
            start: range.start(),
            end: range.end(),
        }
    }

    #[tokio::test]
    async fn empty_window_issues_one_request() {
        let client = ScriptedClient::with_records(0);
        let template = template();
        let page = page_config();
        let fetcher = WindowFetcher::new(&client, &template, &page);

        let fetch = fetcher.fetch_window(&window()).await.unwrap();

        assert_eq!(fetch.requests, 1);
        assert!(fetch.records.is_empty());
        assert!(!fetch.saturated);
    }

    #[tokio::test]
    async fn short_page_terminates_pagination() {
        // 1500 records: one full page, one short page.
        let client = ScriptedClient::with_records(1500);
        let template = template();
        let page = page_config();
        let fetcher = WindowFetcher::new(&client, &template, &page);

        let fetch = fetcher.fetch_window(&window()).await.unwrap();

        assert_eq!(fetch.requests, 2);
        assert_eq!(fetch.records.len(), 1500);
        assert!(!fetch.saturated);
    }

    #[tokio::test]
    async fn exact_page_multiple_needs_trailing_empty_page() {
        // 2000 records: two full pages, then an empty page confirms exhaustion.
        let client = ScriptedClient::with_records(2000);
        let template = template();
        let page = page_config();
        let fetcher = WindowFetcher::new(&client, &template, &page);

        let fetch = fetcher.fetch_window(&window()).await.unwrap();

        assert_eq!(fetch.requests, 3);
        assert_eq!(fetch.records.len(), 2000);
        assert!(!fetch.saturated);
    }

    #[tokio::test]
    async fn ceiling_caps_retrieval_and_flags_saturation() {
        // 6000 records exceed page_size * max_offset_pages = 5000.
        let client = ScriptedClient::with_records(6000);
        let template = template();
        let page = page_config();
        let fetcher = WindowFetcher::new(&client, &template, &page);

        let fetch = fetcher.fetch_window(&window()).await.unwrap();

        assert_eq!(fetch.requests, 5);
        assert_eq!(fetch.records.len(), 5000);
        assert!(fetch.saturated);
    }

    #[tokio::test]
    async fn exactly_full_ceiling_is_reported_saturated() {
        // 5000 records fill the ceiling exactly; the fetcher cannot distinguish this
        // from a truncated window, so it reports saturation.
        let client = ScriptedClient::with_records(5000);
        let template = template();
        let page = page_config();
        let fetcher = WindowFetcher::new(&client, &template, &page);

        let fetch = fetcher.fetch_window(&window()).await.unwrap();

        assert_eq!(fetch.requests, 5);
        assert_eq!(fetch.records.len(), 5000);
        assert!(fetch.saturated);
    }

    #[tokio::test]
    async fn transport_failure_stops_paging_immediately() {
        let mut client = ScriptedClient::with_records(3000);
        client.fail_at_request = Some(2);
        let template = template();
        let page = page_config();
        let fetcher = WindowFetcher::new(&client, &template, &page);

        let result = fetcher.fetch_window(&window()).await;

        assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::SourceTransportFailed
        );
        // No request is issued past the failing page.
        assert_eq!(client.requests(), 2);
    }
}
