//! 행 이벤트 변환기
//!
//! ROW 이벤트의 before/after 원시 값 쌍을 분류된 행 뮤테이션으로 변환합니다.
//! - before 없음, after 있음 → INSERT
//! - before 있음, after 없음 → DELETE
//! - 둘 다 있음 → UPDATE
//! - 둘 다 없음 → 유효하지 않은 이벤트 (복구 불가)

use crate::error::{CdcError, Result};
use crate::events::{CellValue, Field, RowEvent};
use serde::{Deserialize, Serialize};

/// 디코딩된 행 이미지
///
/// 위치 기반 접근(`values`)과 컬럼명 기반 접근(`get`)을 모두 지원합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowImage {
    /// 순서대로 나열된 컬럼명들
    pub columns: Vec<String>,
    /// 컬럼 순서와 일치하는 값들
    pub values: Vec<CellValue>,
}

impl RowImage {
    /// 컬럼명으로 값 조회
    pub fn get(&self, column_name: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|name| name == column_name)
            .map(|index| &self.values[index])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// 원시 값들을 컬럼 기술자와 위치대로 짝지어 행 이미지로 디코딩
///
/// 두 목록의 길이가 다르면 짧은 쪽까지만 사용합니다.
pub fn decode_row(fields: &[Field], raw: &[CellValue]) -> RowImage {
    let count = fields.len().min(raw.len());
    RowImage {
        columns: fields[..count]
            .iter()
            .map(|field| field.name.clone())
            .collect(),
        values: raw[..count].to_vec(),
    }
}

/// 행 뮤테이션 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Insert => "INSERT",
            MutationKind::Update => "UPDATE",
            MutationKind::Delete => "DELETE",
        }
    }
}

/// 분류된 행 뮤테이션
///
/// 불변식: Insert는 after만, Delete는 before만, Update는 둘 다 가집니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowMutation {
    pub kind: MutationKind,
    pub before: Option<RowImage>,
    pub after: Option<RowImage>,
}

/// ROW 이벤트의 변경 쌍들을 각각 독립적으로 분류
pub fn translate_row_event(event: &RowEvent, fields: &[Field]) -> Result<Vec<RowMutation>> {
    let mut mutations = Vec::with_capacity(event.row_changes.len());

    for row_change in &event.row_changes {
        let mutation = match (&row_change.before, &row_change.after) {
            (None, Some(after)) => RowMutation {
                kind: MutationKind::Insert,
                before: None,
                after: Some(decode_row(fields, after)),
            },
            (Some(before), None) => RowMutation {
                kind: MutationKind::Delete,
                before: Some(decode_row(fields, before)),
                after: None,
            },
            (Some(before), Some(after)) => RowMutation {
                kind: MutationKind::Update,
                before: Some(decode_row(fields, before)),
                after: Some(decode_row(fields, after)),
            },
            (None, None) => {
                return Err(CdcError::InvalidEvent(format!(
                    "row change for table {} has neither before nor after image",
                    event.table_name
                )));
            }
        };
        mutations.push(mutation);
    }

    Ok(mutations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RowChange;

    fn sample_fields() -> Vec<Field> {
        vec![
            Field::new("id", "INT64"),
            Field::new("name", "VARCHAR"),
            Field::new("age", "INT32"),
        ]
    }

    fn sample_row() -> Vec<CellValue> {
        vec![
            CellValue::Int64(1),
            CellValue::String("a".to_string()),
            CellValue::Int32(30),
        ]
    }

    fn row_event(changes: Vec<RowChange>) -> RowEvent {
        RowEvent {
            table_name: "users".to_string(),
            row_changes: changes,
        }
    }

    #[test]
    fn test_insert_classification() {
        let event = row_event(vec![RowChange {
            before: None,
            after: Some(sample_row()),
        }]);

        let mutations = translate_row_event(&event, &sample_fields()).unwrap();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].kind, MutationKind::Insert);
        assert!(mutations[0].before.is_none());

        let after = mutations[0].after.as_ref().unwrap();
        assert_eq!(after.get("id"), Some(&CellValue::Int64(1)));
        assert_eq!(after.get("name"), Some(&CellValue::String("a".to_string())));
    }

    #[test]
    fn test_delete_classification() {
        let event = row_event(vec![RowChange {
            before: Some(sample_row()),
            after: None,
        }]);

        let mutations = translate_row_event(&event, &sample_fields()).unwrap();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].kind, MutationKind::Delete);
        assert!(mutations[0].after.is_none());
        assert!(mutations[0].before.is_some());
    }

    #[test]
    fn test_update_classification() {
        let mut updated = sample_row();
        updated[2] = CellValue::Int32(31);

        let event = row_event(vec![RowChange {
            before: Some(sample_row()),
            after: Some(updated),
        }]);

        let mutations = translate_row_event(&event, &sample_fields()).unwrap();
        assert_eq!(mutations[0].kind, MutationKind::Update);

        let before = mutations[0].before.as_ref().unwrap();
        let after = mutations[0].after.as_ref().unwrap();
        assert_eq!(before.get("age"), Some(&CellValue::Int32(30)));
        assert_eq!(after.get("age"), Some(&CellValue::Int32(31)));
    }

    #[test]
    fn test_neither_image_is_invalid() {
        let event = row_event(vec![RowChange {
            before: None,
            after: None,
        }]);

        let result = translate_row_event(&event, &sample_fields());
        assert!(matches!(result, Err(CdcError::InvalidEvent(_))));
    }

    #[test]
    fn test_invalid_pair_produces_no_mutation() {
        let event = row_event(vec![
            RowChange {
                before: None,
                after: Some(sample_row()),
            },
            RowChange {
                before: None,
                after: None,
            },
        ]);

        // 하나라도 유효하지 않으면 전체가 에러
        assert!(translate_row_event(&event, &sample_fields()).is_err());
    }

    #[test]
    fn test_decode_row_idempotent() {
        let fields = sample_fields();
        let raw = sample_row();

        let first = decode_row(&fields, &raw);
        let second = decode_row(&fields, &raw);
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_row_length_mismatch() {
        let fields = sample_fields();
        let raw = vec![CellValue::Int64(1)];

        let image = decode_row(&fields, &raw);
        assert_eq!(image.len(), 1);
        assert_eq!(image.get("id"), Some(&CellValue::Int64(1)));
        assert_eq!(image.get("name"), None);
    }
}
