//! 업스트림 메타데이터 연결 관리
//!
//! 업스트림의 MySQL 호환 포트로 컬럼 메타데이터(charset/collation/PK)를
//! 조회합니다. 이벤트 스트림과는 별개의 연결입니다.

use crate::config::CdcConfig;
use crate::error::{CdcError, Result};
use crate::metadata::{ColumnInfo, ColumnInfoMap};
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts};

/// 메타데이터 연결 래퍼
pub struct MetadataConnection {
    conn: Conn,
}

impl MetadataConnection {
    pub async fn connect(config: &CdcConfig) -> Result<Self> {
        let opts = build_opts(config)?;
        let pool = mysql_async::Pool::new(opts);

        let conn = pool.get_conn().await.map_err(|e| {
            CdcError::ConnectionError(format!("Failed to connect to upstream: {}", e))
        })?;

        Ok(MetadataConnection { conn })
    }

    /// 업스트림 서버 버전 조회
    pub async fn server_version(&mut self) -> Result<String> {
        let result: Vec<(String,)> = self
            .conn
            .query("SELECT @@version")
            .await
            .map_err(|e| CdcError::QueryError(format!("Failed to query version: {}", e)))?;

        result
            .into_iter()
            .next()
            .map(|(version,)| version)
            .ok_or_else(|| CdcError::QueryError("No version available".to_string()))
    }

    /// 테이블의 컬럼 메타데이터 조회
    ///
    /// INFORMATION_SCHEMA에서 컬럼별 charset/collation과 PK 여부를
    /// 선언 순서대로 읽어 맵으로 구성합니다.
    pub async fn column_info(&mut self, schema: &str, table: &str) -> Result<ColumnInfoMap> {
        let query = format!(
            "SELECT COLUMN_NAME, CHARACTER_SET_NAME, COLLATION_NAME, COLUMN_KEY \
             FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = '{}' AND TABLE_NAME = '{}' \
             ORDER BY ORDINAL_POSITION",
            schema, table
        );

        let result: Vec<(String, Option<String>, Option<String>, String)> = self
            .conn
            .query(&query)
            .await
            .map_err(|e| CdcError::QueryError(format!("Failed to query column info: {}", e)))?;

        if result.is_empty() {
            return Err(CdcError::QueryError(format!(
                "No columns found for {}.{}",
                schema, table
            )));
        }

        let mut col_info_map = ColumnInfoMap::new();
        for (name, charset, collation, column_key) in result {
            col_info_map.insert(
                name.clone(),
                ColumnInfo {
                    name,
                    charset: charset.unwrap_or_default(),
                    collation: collation.unwrap_or_default(),
                    is_primary_key: column_key == "PRI",
                },
            );
        }

        Ok(col_info_map)
    }

    pub async fn close(self) -> Result<()> {
        // mysql_async::Conn은 Drop 시 자동으로 정리됨
        Ok(())
    }
}

fn build_opts(config: &CdcConfig) -> Result<Opts> {
    let connection_string = format!(
        "mysql://{}:{}@{}:{}",
        config.upstream_user,
        config.upstream_password,
        config.upstream_host,
        config.upstream_mysql_port
    );

    connection_string
        .parse()
        .map_err(|_| CdcError::ConnectionError("Failed to parse connection string".to_string()))
}
