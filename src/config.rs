//! CDC 컨슈머 설정
//!
//! 시작 시점에 환경 변수에서 한 번 구성되고, 이후에는 불변 값으로
//! 컨슈머에 소유권째 전달됩니다. 전역 상태 없음.

use crate::error::{CdcError, Result};
use regex::Regex;
use std::env;

/// CDC 컨슈머 설정 값
#[derive(Debug, Clone)]
pub struct CdcConfig {
    /// 소스/타깃 스키마명
    pub table_schema: String,
    /// 소스 테이블명
    pub source_table_name: String,
    /// 타깃 테이블명 (미지정 시 소스 테이블명)
    pub target_table_name: String,
    /// 스트림 필터 표현식 (미지정 시 "select * from <소스 테이블>")
    pub filter_statement: String,
    /// 업스트림 호스트
    pub upstream_host: String,
    /// 메타데이터 조회용 MySQL 포트
    pub upstream_mysql_port: u16,
    /// 이벤트 스트림 포트
    pub upstream_stream_port: u16,
    /// 메타데이터 연결 사용자
    pub upstream_user: String,
    /// 메타데이터 연결 비밀번호
    pub upstream_password: String,
}

impl Default for CdcConfig {
    fn default() -> Self {
        CdcConfig {
            table_schema: String::new(),
            source_table_name: String::new(),
            target_table_name: String::new(),
            filter_statement: String::new(),
            upstream_host: "127.0.0.1".to_string(),
            upstream_mysql_port: 15306,
            upstream_stream_port: 15991,
            upstream_user: "root".to_string(),
            upstream_password: String::new(),
        }
    }
}

impl CdcConfig {
    /// 환경 변수에서 설정 구성
    pub fn from_env() -> Result<Self> {
        let defaults = CdcConfig::default();

        let mut config = CdcConfig {
            table_schema: env::var("TABLE_SCHEMA").unwrap_or_default(),
            source_table_name: env::var("SOURCE_TABLE_NAME").unwrap_or_default(),
            target_table_name: env::var("TARGET_TABLE_NAME").unwrap_or_default(),
            filter_statement: env::var("FILTER_STATEMENT").unwrap_or_default(),
            upstream_host: env::var("UPSTREAM_HOST").unwrap_or(defaults.upstream_host),
            upstream_mysql_port: parse_port("UPSTREAM_MYSQL_PORT", defaults.upstream_mysql_port)?,
            upstream_stream_port: parse_port("UPSTREAM_STREAM_PORT", defaults.upstream_stream_port)?,
            upstream_user: env::var("UPSTREAM_USER").unwrap_or(defaults.upstream_user),
            upstream_password: env::var("UPSTREAM_PASSWORD").unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// 필수 값 검증 및 기본값 채우기
    ///
    /// 스키마와 소스 테이블명은 필수. 타깃 테이블명은 소스 테이블명으로,
    /// 필터는 "select * from <소스 테이블>"로 기본 설정됩니다.
    pub fn validate(&mut self) -> Result<()> {
        if self.table_schema.is_empty() {
            return Err(CdcError::ConfigError("table-schema is required".to_string()));
        }
        if self.source_table_name.is_empty() {
            return Err(CdcError::ConfigError(
                "source-table-name is required".to_string(),
            ));
        }
        if self.upstream_host.is_empty() {
            return Err(CdcError::ConfigError("upstream-host is required".to_string()));
        }

        if self.target_table_name.is_empty() {
            self.target_table_name = self.source_table_name.clone();
        }
        if self.filter_statement.is_empty() {
            self.filter_statement = format!("select * from {}", self.source_table_name);
        }

        // 필터는 select 문이어야 함
        let select_pattern = Regex::new(r"(?i)^\s*select\b")
            .map_err(|e| CdcError::ConfigError(format!("invalid filter pattern: {}", e)))?;
        if !select_pattern.is_match(&self.filter_statement) {
            return Err(CdcError::ConfigError(format!(
                "filter-statement must be a select statement: {}",
                self.filter_statement
            )));
        }

        Ok(())
    }
}

fn parse_port(var_name: &str, default: u16) -> Result<u16> {
    match env::var(var_name) {
        Ok(value) => value
            .parse()
            .map_err(|_| CdcError::ConfigError(format!("invalid port in {}: {}", var_name, value))),
        Err(_) => Ok(default),
    }
}
