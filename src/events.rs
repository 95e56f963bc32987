//! 업스트림 스트리밍 프로토콜의 이벤트 타입 및 데이터 구조 정의
//!
//! VStream 방식의 이벤트 시퀀스를 표현합니다:
//! FIELD (컬럼 정의) → ROW (변경 데이터) → VGTID (위치 갱신) → COMMIT (트랜잭션 경계)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 셀 값 (다양한 소스 타입 지원)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(DateTime<Utc>),
    Date(String),
    Time(String),
    Decimal(String),
    Json(serde_json::Value),
}

impl CellValue {
    pub fn as_string(&self) -> Option<String> {
        match self {
            CellValue::String(s) => Some(s.clone()),
            CellValue::Int64(i) => Some(i.to_string()),
            CellValue::UInt64(u) => Some(u.to_string()),
            CellValue::Double(d) => Some(d.to_string()),
            CellValue::DateTime(dt) => Some(dt.to_rfc3339()),
            CellValue::Decimal(d) => Some(d.clone()),
            CellValue::Null => Some("NULL".to_string()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// FIELD 이벤트가 알려주는 컬럼 기술자 (순서 보장)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// 컬럼명
    pub name: String,
    /// 컬럼 타입명 (e.g., "INT64", "VARCHAR")
    pub column_type: String,
}

impl Field {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// FIELD 이벤트 데이터 (현재 행 형태 정의, 통째로 교체됨)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldEvent {
    /// 테이블명
    pub table_name: String,
    /// 순서대로 나열된 컬럼 기술자들
    pub fields: Vec<Field>,
}

/// 행 단위 변경 (before/after 이미지 쌍)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowChange {
    /// 변경 전 원시 값들 (DELETE/UPDATE의 경우)
    pub before: Option<Vec<CellValue>>,
    /// 변경 후 원시 값들 (INSERT/UPDATE의 경우)
    pub after: Option<Vec<CellValue>>,
}

/// ROW 이벤트 데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowEvent {
    /// 테이블명
    pub table_name: String,
    /// 변경된 행들
    pub row_changes: Vec<RowChange>,
}

/// 테이블별 last-primary-key 토큰 (초기 복사 재개용)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableLastPk {
    /// 테이블명
    pub table_name: String,
    /// 마지막으로 처리된 PK 값들 (없으면 복사 완료)
    pub lastpk: Option<Vec<CellValue>>,
}

/// 샤드별 GTID 및 복사 진행 상태
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardGtid {
    /// 스키마명 (keyspace)
    pub keyspace: String,
    /// 샤드명
    pub shard: String,
    /// GTID 문자열
    pub gtid: String,
    /// 테이블별 last-pk 토큰들
    #[serde(default)]
    pub table_pks: Vec<TableLastPk>,
}

/// VGTID 이벤트 데이터 (복수 샤드 지원 형식, 여기서는 단일 샤드 "0"만 사용)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VGtid {
    pub shard_gtids: Vec<ShardGtid>,
}

/// 스트림 필터 규칙 (테이블 매칭 + 필터 쿼리)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// 매칭할 테이블명
    #[serde(rename = "match")]
    pub match_table: String,
    /// 필터 표현식 (select 문 형태)
    pub filter: String,
}

/// 스트림 필터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub rules: Vec<Rule>,
}

/// 요청 대상 태블릿 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TabletType {
    Primary,
    Replica,
    Rdonly,
}

/// 스트림 시작 요청 (마지막 체크포인트로 시드됨)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    pub tablet_type: TabletType,
    pub vgtid: VGtid,
    pub filter: Filter,
}

/// 업스트림이 보내는 타입별 이벤트
///
/// 알 수 없는 타입은 `Unknown`으로 역직렬화되어 무시됩니다 (전방 호환).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VEvent {
    Field { field_event: FieldEvent },
    Row { row_event: RowEvent },
    Vgtid { vgtid: VGtid },
    Begin,
    Commit,
    CopyCompleted,
    Heartbeat,
    #[serde(other)]
    Unknown,
}

/// 스트림 응답 (이벤트 묶음, 수신 순서 보장)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResponse {
    pub events: Vec<VEvent>,
}
