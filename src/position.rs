//! 복제 위치 추적 (재시작 체크포인트)
//!
//! GTID + 마지막으로 처리된 PK 이미지로 재개 지점을 표현합니다.
//! VGTID 이벤트로만 전진하고, 커밋 경계에서만 유효합니다.

use crate::mutation::RowImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 재개 가능한 복제 위치
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// GTID 문자열 (빈 문자열이면 처음부터 스트리밍)
    pub gtid: String,
    /// 초기 복사 중 마지막으로 처리된 PK 이미지 (복사 완료 시 None)
    pub last_pk: Option<RowImage>,
}

impl Position {
    pub fn new(gtid: impl Into<String>) -> Self {
        Position {
            gtid: gtid.into(),
            last_pk: None,
        }
    }

    /// 아직 체크포인트가 없는 최초 상태인지 여부
    pub fn is_initial(&self) -> bool {
        self.gtid.is_empty() && self.last_pk.is_none()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.last_pk {
            Some(last_pk) => write!(f, "{} (lastpk: {} cols)", self.gtid, last_pk.len()),
            None => write!(f, "{}", self.gtid),
        }
    }
}
