//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않으면 기록은 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `nvdmirror_`
//! - 모듈명: `feed_`, `store_`, `sync_`, `matcher_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure, cancelled)
pub const LABEL_RESULT: &str = "result";

/// 동기화 단계 레이블 키 (leading_days, whole_months, trailing_days)
pub const LABEL_PHASE: &str = "phase";

/// 판정 사유 레이블 키
pub const LABEL_REASON: &str = "reason";

// ─── Feed 메트릭 ────────────────────────────────────────────────────

/// Feed: 원격 피드 페이지 요청 수 (counter, label: result)
pub const FEED_REQUESTS_TOTAL: &str = "nvdmirror_feed_requests_total";

/// Feed: 응답에 포함된 전체 취약점 수 (counter)
pub const FEED_VULNERABILITIES_TOTAL: &str = "nvdmirror_feed_vulnerabilities_total";

/// Feed: 파싱 후 후보 행 수 (counter)
pub const FEED_CANDIDATE_ROWS_TOTAL: &str = "nvdmirror_feed_candidate_rows_total";

// ─── Store 메트릭 ───────────────────────────────────────────────────

/// Store: 파티션에 추가된 행 수 (counter)
pub const STORE_ROWS_APPENDED_TOTAL: &str = "nvdmirror_store_rows_appended_total";

/// Store: 중복으로 제외된 행 수 (counter)
pub const STORE_ROWS_DEDUPLICATED_TOTAL: &str = "nvdmirror_store_rows_deduplicated_total";

// ─── Sync 메트릭 ────────────────────────────────────────────────────

/// Sync: 완료된 동기화 실행 수 (counter, label: result)
pub const SYNC_RUNS_TOTAL: &str = "nvdmirror_sync_runs_total";

/// Sync: 처리된 윈도우 수 (counter, label: phase)
pub const SYNC_WINDOWS_TOTAL: &str = "nvdmirror_sync_windows_total";

/// Sync: 실행 소요 시간 (histogram, 초)
pub const SYNC_DURATION_SECONDS: &str = "nvdmirror_sync_duration_seconds";

// ─── Matcher 메트릭 ─────────────────────────────────────────────────

/// Matcher: 생성된 판정 수 (counter, label: reason)
pub const MATCHER_VERDICTS_TOTAL: &str = "nvdmirror_matcher_verdicts_total";

/// 모든 메트릭 이름 (검증용)
pub const ALL_METRIC_NAMES: &[&str] = &[
    FEED_REQUESTS_TOTAL,
    FEED_VULNERABILITIES_TOTAL,
    FEED_CANDIDATE_ROWS_TOTAL,
    STORE_ROWS_APPENDED_TOTAL,
    STORE_ROWS_DEDUPLICATED_TOTAL,
    SYNC_RUNS_TOTAL,
    SYNC_WINDOWS_TOTAL,
    SYNC_DURATION_SECONDS,
    MATCHER_VERDICTS_TOTAL,
];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없어도 안전합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    // Feed
    describe_counter!(
        FEED_REQUESTS_TOTAL,
        "Feed page requests, labelled by result"
    );
    describe_counter!(
        FEED_VULNERABILITIES_TOTAL,
        "Raw vulnerability entries returned by the feed"
    );
    describe_counter!(
        FEED_CANDIDATE_ROWS_TOTAL,
        "Candidate rows kept after severity, bound and blacklist filtering"
    );

    // Store
    describe_counter!(
        STORE_ROWS_APPENDED_TOTAL,
        "Rows appended to year partitions"
    );
    describe_counter!(
        STORE_ROWS_DEDUPLICATED_TOTAL,
        "Rows skipped because their cve_id|published key already existed"
    );

    // Sync
    describe_counter!(SYNC_RUNS_TOTAL, "Background sync runs, labelled by result");
    describe_counter!(SYNC_WINDOWS_TOTAL, "Synchronized windows, labelled by phase");
    describe_histogram!(SYNC_DURATION_SECONDS, "Background sync run duration in seconds");

    // Matcher
    describe_counter!(
        MATCHER_VERDICTS_TOTAL,
        "Version verdicts produced, labelled by reason"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metric_names_have_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("nvdmirror_"),
                "Metric '{}' does not start with 'nvdmirror_' prefix",
                name
            );
        }
    }

    #[test]
    fn all_metric_names_are_unique() {
        let mut names: Vec<&str> = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_RESULT, LABEL_PHASE, LABEL_REASON] {
            assert_eq!(label.to_lowercase(), label);
        }
    }
}
