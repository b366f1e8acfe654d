//! 버전 범위 판정 -- 숫자 구성요소의 첫 차이 비교
//!
//! 버전 문자열은 `.`으로 나눈 구성요소 목록입니다. 부족한 쪽은 끝에 `0`
//! 구성요소를 덧붙일 뿐 자르거나 재배열하지 않습니다.
//!
//! # 패딩
//!
//! - 상한 비교: 설치 버전, `end_excluding`, `end_including` 중 가장 긴 길이로 패딩
//! - 하한 비교: `start_including`을 네 버전 중 가장 긴 길이로 패딩.
//!   설치 버전은 상한 기준 길이까지만 패딩되므로 `start_including`이 더 길면
//!   정밀도 부족으로 판정될 수 있습니다.
//!
//! # 판정
//!
//! | 조건 | 결과 | 사유 |
//! |------|------|------|
//! | 비교한 구성요소가 숫자가 아님 | 취약(가정) | `assumed-vulnerable-incomparable` |
//! | 하한 비교 중 설치 버전 구성요소 부족 | 비취약(미확정) | `unknown-insufficient-precision` |
//! | 하한 또는 상한 없음, 취약 | 취약 | `vulnerable-open-ended` |
//! | 양쪽 범위 안 | 취약 | `definite-vulnerable` |
//! | 그 외 | 비취약 | `definite-sane` |
//!
//! `end_excluding`과 `end_including`이 모두 있으면 `end_excluding`을 사용합니다.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use nvdmirror_core::types::VersionBounds;

/// 판정 사유
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictReason {
    /// 하한과 상한 사이 (양쪽 모두 존재)
    DefiniteVulnerable,
    /// 범위 밖
    DefiniteSane,
    /// 숫자가 아닌 구성요소 때문에 비교 불가, 취약으로 가정
    AssumedVulnerableIncomparable {
        /// 비교할 수 없었던 구성요소
        component: String,
        /// 해당 구성요소를 가진 버전 문자열
        version: String,
    },
    /// 설치 버전의 정밀도가 하한 비교에 부족
    UnknownInsufficientPrecision,
    /// 하한 또는 상한이 없어 한쪽이 무조건 취약
    VulnerableOpenEnded,
}

impl VerdictReason {
    /// 사유 태그
    pub fn tag(&self) -> &'static str {
        match self {
            Self::DefiniteVulnerable => "definite-vulnerable",
            Self::DefiniteSane => "definite-sane",
            Self::AssumedVulnerableIncomparable { .. } => "assumed-vulnerable-incomparable",
            Self::UnknownInsufficientPrecision => "unknown-insufficient-precision",
            Self::VulnerableOpenEnded => "vulnerable-open-ended",
        }
    }
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssumedVulnerableIncomparable { component, version } => write!(
                f,
                "{}: non-numeric component '{component}' in '{version}'",
                self.tag()
            ),
            other => f.write_str(other.tag()),
        }
    }
}

/// 판정 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// 취약 여부 (미확정은 비취약)
    pub vulnerable: bool,
    /// 판정 사유
    pub reason: VerdictReason,
}

impl Verdict {
    fn new(vulnerable: bool, reason: VerdictReason) -> Self {
        Self { vulnerable, reason }
    }
}

/// 구성요소 비교 중단 사유
enum Undecidable {
    Incomparable { component: String, version: String },
    InsufficientPrecision,
}

fn components(version: &str) -> Vec<&str> {
    version.trim().split('.').collect()
}

fn padded<'a>(mut parts: Vec<&'a str>, len: usize) -> Vec<&'a str> {
    if parts.len() < len {
        parts.resize(len, "0");
    }
    parts
}

fn numeric(component: &str, version: &str) -> Result<u64, Undecidable> {
    let incomparable = || Undecidable::Incomparable {
        component: component.to_owned(),
        version: version.to_owned(),
    };
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(incomparable());
    }
    component.parse().map_err(|_| incomparable())
}

/// 첫 번째로 다른 구성요소의 대소를 반환합니다. 모두 같으면 `Equal`입니다.
///
/// `installed`가 `bound`보다 짧아 비교가 끝나지 않으면 정밀도 부족입니다.
fn first_difference(
    installed: &[&str],
    installed_raw: &str,
    bound: &[&str],
    bound_raw: &str,
) -> Result<Ordering, Undecidable> {
    for (index, bound_part) in bound.iter().enumerate() {
        let Some(installed_part) = installed.get(index) else {
            return Err(Undecidable::InsufficientPrecision);
        };
        let a = numeric(installed_part, installed_raw)?;
        let b = numeric(bound_part, bound_raw)?;
        match a.cmp(&b) {
            Ordering::Equal => continue,
            decided => return Ok(decided),
        }
    }
    Ok(Ordering::Equal)
}

fn decide(installed: &str, bounds: &VersionBounds) -> Result<Verdict, Undecidable> {
    let upper = bounds
        .end_excluding
        .as_deref()
        .map(|v| (v, false))
        .or_else(|| bounds.end_including.as_deref().map(|v| (v, true)));

    let installed_parts = components(installed);
    let upper_len = [
        Some(installed_parts.len()),
        bounds.end_excluding.as_deref().map(|v| components(v).len()),
        bounds.end_including.as_deref().map(|v| components(v).len()),
    ]
    .into_iter()
    .flatten()
    .max()
    .unwrap_or(0);
    let installed_parts = padded(installed_parts, upper_len);

    let from_vulnerable = match bounds.start_including.as_deref() {
        None => true,
        Some(start) => {
            let start_parts = components(start);
            let lower_len = upper_len.max(start_parts.len());
            let start_parts = padded(start_parts, lower_len);
            first_difference(&installed_parts, installed, &start_parts, start)? != Ordering::Less
        }
    };

    let to_vulnerable = match upper {
        None => true,
        Some((end, inclusive)) => {
            let end_parts = padded(components(end), upper_len);
            match first_difference(&installed_parts, installed, &end_parts, end)? {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => inclusive,
            }
        }
    };

    let vulnerable = from_vulnerable && to_vulnerable;
    let open_ended = bounds.start_including.is_none() || upper.is_none();
    let reason = match (vulnerable, open_ended) {
        (true, true) => VerdictReason::VulnerableOpenEnded,
        (true, false) => VerdictReason::DefiniteVulnerable,
        (false, _) => VerdictReason::DefiniteSane,
    };

    Ok(Verdict::new(vulnerable, reason))
}

/// 설치 버전이 CVE 버전 범위에 포함되는지 판정합니다.
pub fn evaluate(installed: &str, bounds: &VersionBounds) -> Verdict {
    match decide(installed, bounds) {
        Ok(verdict) => verdict,
        Err(Undecidable::Incomparable { component, version }) => Verdict::new(
            true,
            VerdictReason::AssumedVulnerableIncomparable { component, version },
        ),
        Err(Undecidable::InsufficientPrecision) => {
            Verdict::new(false, VerdictReason::UnknownInsufficientPrecision)
        }
    }
}
