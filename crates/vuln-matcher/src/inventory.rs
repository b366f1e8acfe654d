//! 설치 패키지 인벤토리 로더
//!
//! 외부 수집기가 만든 JSON을 읽습니다.
//!
//! ```json
//! { "/srv/app/requirements.txt": { "django": "4.1.2", "requests": "2.28.0" } }
//! ```

use std::path::Path;

use tracing::debug;

use nvdmirror_core::types::PackageInventory;

use crate::error::MatcherError;

/// 인벤토리 JSON 문자열을 파싱합니다.
///
/// `origin`은 에러 메시지에 표시할 출처입니다.
pub fn parse_inventory(json: &str, origin: &str) -> Result<PackageInventory, MatcherError> {
    serde_json::from_str(json).map_err(|e| MatcherError::Inventory {
        path: origin.to_owned(),
        reason: e.to_string(),
    })
}

/// 인벤토리 JSON 파일을 읽습니다.
pub fn load_inventory(path: &Path) -> Result<PackageInventory, MatcherError> {
    let origin = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| MatcherError::Inventory {
        path: origin.clone(),
        reason: e.to_string(),
    })?;

    let inventory = parse_inventory(&content, &origin)?;
    debug!(
        path = %origin,
        sources = inventory.len(),
        packages = inventory.values().map(|p| p.len()).sum::<usize>(),
        "inventory loaded"
    );
    Ok(inventory)
}
