//! NVD REST 클라이언트
//!
//! `{base_url}/{schema_version}?pubStartDate=..&pubEndDate=..&resultsPerPage=..&startIndex=..`
//! 형식으로 요청하고 `totalResults`에 도달할 때까지 페이지를 이어서 가져옵니다.
//!
//! 공개 요청 한도를 지키기 위해 요청 사이에 `request_delay`만큼 대기합니다
//! (API 키 없음: 6초, 있음: 0.6초).

use std::time::Duration;

use metrics::counter;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use nvdmirror_core::metrics as m;

use crate::config::FeedSyncConfig;
use crate::error::{FeedSyncError, RemoteFetchError};
use crate::feed::parse::{FeedPage, parse_feed};
use crate::feed::{FeedBatch, FeedSource};
use crate::planner::DateWindow;

/// API 키 헤더 이름
const API_KEY_HEADER: &str = "apiKey";

/// NVD 피드 클라이언트 (reqwest 기반)
pub struct NvdFeedClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    results_per_page: u32,
    request_delay: Duration,
    /// 마지막 요청 시각 (요청 간 지연 계산용)
    last_request: Mutex<Option<Instant>>,
}

impl NvdFeedClient {
    /// 설정으로 클라이언트를 생성합니다.
    pub fn new(config: &FeedSyncConfig) -> Result<Self, FeedSyncError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("nvdmirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedSyncError::Config {
                field: "feed".to_owned(),
                reason: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
            results_per_page: config.results_per_page,
            request_delay: config.request_delay,
            last_request: Mutex::new(None),
        })
    }

    /// 피드 엔드포인트
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 윈도우의 한 페이지를 요청하는 URL
    pub fn page_url(&self, window: &DateWindow, start_index: u32) -> String {
        format!(
            "{}?pubStartDate={}&pubEndDate={}&resultsPerPage={}&startIndex={}",
            self.endpoint,
            window.start_param(),
            window.end_param(),
            self.results_per_page,
            start_index
        )
    }

    /// 직전 요청 이후 `request_delay`가 지나도록 대기합니다.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.request_delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch_page(
        &self,
        window: &DateWindow,
        start_index: u32,
    ) -> Result<FeedPage, RemoteFetchError> {
        self.throttle().await;

        let url = self.page_url(window, start_index);
        debug!(url = %url, "requesting feed page");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let result = async {
            let response = request
                .send()
                .await
                .map_err(|e| format!("request failed: {e}"))?;

            let status = response.status();
            if !status.is_success() {
                return Err(format!("feed returned HTTP {status}"));
            }

            let body = response
                .text()
                .await
                .map_err(|e| format!("failed to read body: {e}"))?;

            parse_feed(&body).map_err(|e| format!("failed to decode feed: {e}"))
        }
        .await;

        match result {
            Ok(page) => {
                counter!(m::FEED_REQUESTS_TOTAL, m::LABEL_RESULT => "success").increment(1);
                Ok(page)
            }
            Err(reason) => {
                counter!(m::FEED_REQUESTS_TOTAL, m::LABEL_RESULT => "failure").increment(1);
                warn!(window = %window, start_index, reason = %reason, "feed page request failed");
                Err(RemoteFetchError::new(window, reason))
            }
        }
    }
}

impl FeedSource for NvdFeedClient {
    async fn fetch_window(&self, window: &DateWindow) -> Result<FeedBatch, RemoteFetchError> {
        let mut batch = FeedBatch::default();
        let mut start_index: u32 = 0;

        loop {
            let page = self.fetch_page(window, start_index).await?;
            batch.pages += 1;
            batch.raw_count += page.raw_count;
            batch.records.extend(page.records);

            let fetched = u32::try_from(page.raw_count).unwrap_or(u32::MAX);
            start_index = start_index.saturating_add(fetched);
            if fetched == 0 || start_index >= page.total_results {
                break;
            }
            debug!(
                window = %window,
                start_index,
                total_results = page.total_results,
                "fetching next feed page"
            );
        }

        counter!(m::FEED_VULNERABILITIES_TOTAL).increment(batch.raw_count as u64);
        counter!(m::FEED_CANDIDATE_ROWS_TOTAL).increment(batch.records.len() as u64);
        info!(
            window = %window,
            pages = batch.pages,
            vulnerabilities = batch.raw_count,
            candidates = batch.records.len(),
            "feed window fetched"
        );

        Ok(batch)
    }
}
