//! 중복 제거 인덱스
//!
//! 파티션별 `cve_id|published` 키 집합입니다. 파티션을 처음 추가할 때
//! 기존 행으로 한 번 구축하고 이후 추가분을 누적합니다.

use std::collections::HashSet;

use nvdmirror_core::types::CveRecord;

/// 파티션 하나의 중복 제거 키 집합
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    keys: HashSet<String>,
}

impl DedupIndex {
    /// 빈 인덱스를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 레코드로 인덱스를 구축합니다.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CveRecord>) -> Self {
        Self {
            keys: records.into_iter().map(CveRecord::dedup_key).collect(),
        }
    }

    /// 키가 이미 존재하는지 반환합니다.
    pub fn contains(&self, record: &CveRecord) -> bool {
        self.keys.contains(&record.dedup_key())
    }

    /// 키를 등록합니다. 새 키였으면 `true`를 반환합니다.
    pub fn insert(&mut self, record: &CveRecord) -> bool {
        self.keys.insert(record.dedup_key())
    }

    /// 레코드들의 키를 한꺼번에 등록합니다.
    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a CveRecord>) {
        self.keys.extend(records.into_iter().map(CveRecord::dedup_key));
    }

    /// 등록된 키 수
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// 인덱스가 비어있는지 반환합니다.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
