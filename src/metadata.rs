//! 컬럼 메타데이터 캐시
//!
//! 소스 테이블의 컬럼별 charset/collation과 PK 여부를 보관합니다.
//! open 시점에 한 번 로드되고, 명시적 reload 때만 갱신됩니다.

use crate::events::Field;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 컬럼 메타데이터 (charset/collation은 비문자 컬럼이면 빈 문자열)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// 컬럼명
    pub name: String,
    /// 문자셋명 (e.g., "utf8mb4")
    pub charset: String,
    /// 콜레이션명 (e.g., "utf8mb4_bin")
    pub collation: String,
    /// PK 구성 컬럼 여부
    pub is_primary_key: bool,
}

/// 컬럼명 → 메타데이터 맵
pub type ColumnInfoMap = HashMap<String, ColumnInfo>;

/// 컬럼의 charset/collation 조회 (캐시에 없으면 빈 문자열 쌍)
pub fn charset_and_collation(column_name: &str, col_info_map: &ColumnInfoMap) -> (String, String) {
    if let Some(col_info) = col_info_map.get(column_name) {
        return (col_info.charset.clone(), col_info.collation.clone());
    }
    (String::new(), String::new())
}

/// 현재 Field 목록에서 PK 컬럼만 순서대로 추출
///
/// FIELD 이벤트가 올 때마다 다시 계산되어 통째로 교체됩니다.
pub fn pk_fields(col_info_map: &ColumnInfoMap, fields: &[Field]) -> Vec<Field> {
    fields
        .iter()
        .filter(|field| {
            col_info_map
                .get(&field.name)
                .map(|col_info| col_info.is_primary_key)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}
