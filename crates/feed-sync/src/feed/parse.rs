//! 피드 응답 파서 -- JSON 디코딩 및 후보 행 추출
//!
//! [`parse_feed`]는 I/O 없는 순수 함수이며 퍼징 대상입니다.
//!
//! # 추출 규칙
//!
//! - 심각도: `cvssMetricV31[].cvssData.baseSeverity` 중 HIGH가 있으면 HIGH,
//!   없고 MEDIUM이 있으면 MEDIUM, 둘 다 없으면 항목 전체를 버립니다.
//! - `configurations[].nodes[].cpeMatch[]` 하나당 후보 행 하나.
//!   `vulnerable`이 참이고 버전 경계가 하나 이상 있어야 합니다.
//! - criteria에 `firmware`가 포함된 행은 버립니다.
//! - 설명은 첫 번째 영어(`en`) 항목입니다.

use serde::Deserialize;

use nvdmirror_core::types::{CveRecord, Severity, VersionBounds};

/// 펌웨어 항목 식별 문자열
const FIRMWARE_MARKER: &str = "firmware";

/// 응답 페이지 하나의 파싱 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPage {
    /// 후보 행
    pub records: Vec<CveRecord>,
    /// 이 페이지의 취약점 수 (필터링 전)
    pub raw_count: usize,
    /// 조건에 맞는 전체 결과 수
    pub total_results: u32,
    /// 이 페이지의 시작 인덱스
    pub start_index: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NvdResponse {
    #[serde(default)]
    start_index: u32,
    #[serde(default)]
    total_results: u32,
    #[serde(default)]
    vulnerabilities: Vec<NvdVulnerability>,
}

#[derive(Debug, Deserialize)]
struct NvdVulnerability {
    cve: NvdCve,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NvdCve {
    id: String,
    #[serde(default)]
    published: String,
    #[serde(default)]
    last_modified: String,
    #[serde(default)]
    descriptions: Vec<NvdDescription>,
    #[serde(default)]
    metrics: Option<NvdMetrics>,
    #[serde(default)]
    configurations: Vec<NvdConfiguration>,
}

#[derive(Debug, Deserialize)]
struct NvdDescription {
    lang: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct NvdMetrics {
    #[serde(rename = "cvssMetricV31", default)]
    cvss_metric_v31: Vec<NvdCvssMetric>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NvdCvssMetric {
    #[serde(default)]
    cvss_data: Option<NvdCvssData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NvdCvssData {
    #[serde(default)]
    base_severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NvdConfiguration {
    #[serde(default)]
    nodes: Vec<NvdNode>,
}

#[derive(Debug, Deserialize)]
struct NvdNode {
    #[serde(rename = "cpeMatch", default)]
    cpe_match: Vec<NvdCpeMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NvdCpeMatch {
    criteria: String,
    #[serde(default)]
    vulnerable: bool,
    #[serde(default)]
    version_start_including: Option<String>,
    #[serde(default)]
    version_end_excluding: Option<String>,
    #[serde(default)]
    version_end_including: Option<String>,
}

/// 피드 응답 JSON을 파싱하여 후보 행을 추출합니다.
pub fn parse_feed(json: &str) -> Result<FeedPage, serde_json::Error> {
    let response: NvdResponse = serde_json::from_str(json)?;

    let records = response
        .vulnerabilities
        .iter()
        .flat_map(|v| candidate_rows(&v.cve))
        .collect();

    Ok(FeedPage {
        records,
        raw_count: response.vulnerabilities.len(),
        total_results: response.total_results,
        start_index: response.start_index,
    })
}

fn severity_of(cve: &NvdCve) -> Option<Severity> {
    let severities: Vec<&str> = cve
        .metrics
        .iter()
        .flat_map(|m| m.cvss_metric_v31.iter())
        .filter_map(|m| m.cvss_data.as_ref()?.base_severity.as_deref())
        .collect();

    if severities.iter().any(|s| s.eq_ignore_ascii_case("HIGH")) {
        Some(Severity::High)
    } else if severities.iter().any(|s| s.eq_ignore_ascii_case("MEDIUM")) {
        Some(Severity::Medium)
    } else {
        None
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn candidate_rows(cve: &NvdCve) -> Vec<CveRecord> {
    let Some(severity) = severity_of(cve) else {
        return Vec::new();
    };

    let description = cve
        .descriptions
        .iter()
        .find(|d| d.lang == "en")
        .map(|d| d.value.clone())
        .unwrap_or_default();

    cve.configurations
        .iter()
        .flat_map(|c| c.nodes.iter())
        .flat_map(|n| n.cpe_match.iter())
        .filter(|m| m.vulnerable && !m.criteria.contains(FIRMWARE_MARKER))
        .filter_map(|m| {
            let bounds = VersionBounds {
                start_including: non_empty(&m.version_start_including),
                end_excluding: non_empty(&m.version_end_excluding),
                end_including: non_empty(&m.version_end_including),
            };
            bounds.has_any().then(|| CveRecord {
                cve_id: cve.id.clone(),
                published: cve.published.clone(),
                last_modified: cve.last_modified.clone(),
                severity,
                criteria: m.criteria.clone(),
                bounds,
                description: description.clone(),
            })
        })
        .collect()
}
