//! CDC 관련 에러 타입

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CdcError {
    #[error("설정 에러: {0}")]
    ConfigError(String),

    #[error("업스트림 연결 에러: {0}")]
    ConnectionError(String),

    #[error("스트림 프로토콜 에러: {0}")]
    ProtocolError(String),

    #[error("스트림 처리 에러: {0}")]
    StreamError(String),

    #[error("쿼리 실행 에러: {0}")]
    QueryError(String),

    #[error("유효하지 않은 이벤트: {0}")]
    InvalidEvent(String),

    #[error("바인드 변수 생성 에러: {0}")]
    BindError(String),

    #[error("스토리지 훅 에러: {0}")]
    StorageError(String),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O 에러: {0}")]
    IoError(String),
}

impl From<io::Error> for CdcError {
    fn from(err: io::Error) -> Self {
        CdcError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CdcError>;
