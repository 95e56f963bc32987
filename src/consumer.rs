//! CDC 컨슈머 - 이벤트 스트림 소비 및 디스패치
//!
//! 단일 순차 루프로 진행됩니다:
//! 1. open: 업스트림 연결 + 컬럼 메타데이터 로드
//! 2. start_stream: 마지막 체크포인트로 시드된 스트림 요청
//! 3. run: 이벤트 수신 → 타입별 디스패치 → 커밋 경계마다 플러시
//!
//! 수신 대기가 유일한 중단 지점이며, 플러시는 COMMIT을 관찰한 반복 안에서
//! 동기적으로 끝납니다. 스토리지보다 앞서 읽어나가지 않습니다.

use crate::config::CdcConfig;
use crate::connection::MetadataConnection;
use crate::error::{CdcError, Result};
use crate::events::{
    Field, Filter, Rule, ShardGtid, StreamRequest, TableLastPk, TabletType, VEvent, VGtid,
};
use crate::metadata::{self, ColumnInfoMap};
use crate::mutation::{decode_row, translate_row_event, RowMutation};
use crate::position::Position;
use crate::spi::StorageHook;
use crate::sqlgen::{generate_sql, SqlStatement};
use crate::stream_client::{EventReceiver, VStreamClient};
use tracing::{debug, info};

/// CDC 컨슈머
///
/// Field/PkFields/Position/Batch는 모두 이 루프가 단독 소유합니다.
pub struct CdcConsumer {
    config: CdcConfig,
    stream_client: VStreamClient,
    storage: Box<dyn StorageHook>,
    metadata_conn: Option<MetadataConnection>,
    col_info_map: ColumnInfoMap,
    fields: Vec<Field>,
    pk_fields: Vec<Field>,
    position: Position,
    batch: Vec<RowMutation>,
    /// 활성 이벤트 스트림 (start_stream이 설정)
    pub event_reader: Option<EventReceiver>,
}

impl CdcConsumer {
    /// 새 CDC 컨슈머 생성
    pub fn new(config: CdcConfig, storage: Box<dyn StorageHook>) -> Self {
        let stream_client =
            VStreamClient::new(config.upstream_host.clone(), config.upstream_stream_port);
        CdcConsumer {
            config,
            stream_client,
            storage,
            metadata_conn: None,
            col_info_map: ColumnInfoMap::new(),
            fields: Vec::new(),
            pk_fields: Vec::new(),
            position: Position::default(),
            batch: Vec::new(),
            event_reader: None,
        }
    }

    /// 업스트림 연결 및 컬럼 메타데이터 로드
    ///
    /// 여기서의 실패는 복구 불가입니다. 이 계층은 재시도하지 않으며,
    /// 프로세스 재시작이 복구 경로입니다.
    pub async fn open(&mut self) -> Result<()> {
        let mut conn = MetadataConnection::connect(&self.config).await?;

        let version = conn.server_version().await?;
        info!("Connected to upstream server: {}", version);

        self.storage.open().await?;

        self.metadata_conn = Some(conn);
        self.reload_column_info().await?;

        Ok(())
    }

    /// 컬럼 메타데이터 캐시 재로드 (open 이후 명시적으로만 호출)
    pub async fn reload_column_info(&mut self) -> Result<()> {
        let conn = self
            .metadata_conn
            .as_mut()
            .ok_or_else(|| CdcError::ConnectionError("consumer is not open".to_string()))?;

        self.col_info_map = conn
            .column_info(&self.config.table_schema, &self.config.source_table_name)
            .await?;

        info!(
            "Loaded column info for {}.{} ({} columns)",
            self.config.table_schema,
            self.config.source_table_name,
            self.col_info_map.len()
        );
        Ok(())
    }

    /// 마지막 체크포인트로 시드된 스트림 요청 생성 및 송신
    pub async fn start_stream(&mut self) -> Result<()> {
        if let Some(position) = self.storage.load_position().await? {
            info!("Resuming from checkpoint: {}", position);
            self.position = position;
        } else {
            info!("No checkpoint found, streaming from the start");
        }

        let request = StreamRequest {
            tablet_type: TabletType::Primary,
            vgtid: VGtid {
                shard_gtids: vec![ShardGtid {
                    keyspace: self.config.table_schema.clone(),
                    shard: "0".to_string(),
                    gtid: self.position.gtid.clone(),
                    table_pks: vec![TableLastPk {
                        table_name: self.config.source_table_name.clone(),
                        lastpk: self
                            .position
                            .last_pk
                            .as_ref()
                            .map(|last_pk| last_pk.values.clone()),
                    }],
                }],
            },
            filter: Filter {
                rules: vec![Rule {
                    match_table: self.config.source_table_name.clone(),
                    filter: self.config.filter_statement.clone(),
                }],
            },
        };

        self.event_reader = Some(self.stream_client.start_stream(&request).await?);
        info!("cdc consumer start streaming");
        Ok(())
    }

    /// 이벤트 수신 루프
    ///
    /// 정상 EOF와 전송 에러 모두 루프를 끝낼 뿐 더 전파하지 않습니다.
    /// 마지막으로 플러시된 체크포인트가 재개 지점으로 남습니다.
    pub async fn run(&mut self) -> Result<()> {
        let mut reader = self
            .event_reader
            .take()
            .ok_or_else(|| CdcError::StreamError("stream is not started".to_string()))?;

        loop {
            let response = match reader.recv().await {
                None => {
                    info!("cdc consumer ended");
                    return Ok(());
                }
                Some(Err(e)) => {
                    info!("cdc consumer exit for error: {}", e);
                    return Ok(());
                }
                Some(Ok(response)) => response,
            };

            for event in response.events {
                self.dispatch_event(event).await?;
            }
        }
    }

    /// 이벤트 타입별 디스패치
    async fn dispatch_event(&mut self, event: VEvent) -> Result<()> {
        match event {
            VEvent::Field { field_event } => {
                self.fields = field_event.fields;
                self.pk_fields = metadata::pk_fields(&self.col_info_map, &self.fields);
                debug!(
                    "Field event: {} columns, {} pk columns",
                    self.fields.len(),
                    self.pk_fields.len()
                );
            }
            VEvent::Row { row_event } => {
                let mutations = translate_row_event(&row_event, &self.fields)?;
                self.batch.extend(mutations);
            }
            VEvent::Vgtid { vgtid } => {
                self.apply_vgtid(vgtid);
            }
            VEvent::Commit => {
                if self.batch.is_empty() {
                    return Ok(());
                }
                self.flush_batch().await?;
                self.batch.clear();
            }
            VEvent::CopyCompleted => {
                info!("cdc consumer copy completed");
            }
            VEvent::Begin | VEvent::Heartbeat | VEvent::Unknown => {}
        }
        Ok(())
    }

    /// VGTID 이벤트로 보류 중인 위치 갱신
    fn apply_vgtid(&mut self, vgtid: VGtid) {
        if let Some(shard_gtid) = vgtid.shard_gtids.into_iter().next() {
            if !shard_gtid.gtid.is_empty() {
                self.position.gtid = shard_gtid.gtid;
            }
            if let Some(table_pk) = shard_gtid.table_pks.into_iter().next() {
                // 토큰이 비어 있으면 복사 완료로 보고 last_pk를 지움
                self.position.last_pk = table_pk
                    .lastpk
                    .map(|values| decode_row(&self.pk_fields, &values));
            }
        }
    }

    /// 배치 전체를 파라미터화된 구문으로 변환
    ///
    /// 스토리지 훅 구현이 실제 재생 SQL이 필요할 때도 사용합니다.
    pub fn generate_batch_sql(&self, batch: &[RowMutation]) -> Result<Vec<SqlStatement>> {
        batch
            .iter()
            .map(|mutation| {
                generate_sql(
                    &self.config.table_schema,
                    &self.config.target_table_name,
                    mutation,
                    &self.pk_fields,
                    &self.col_info_map,
                )
            })
            .collect()
    }

    /// 커밋 경계 플러시: 배치 저장 후 체크포인트 저장 (엄격한 순서)
    ///
    /// 두 단계를 하나의 트랜잭션으로 묶지 않으므로 at-least-once입니다.
    /// 둘 사이에서 죽으면 재시작 후 같은 배치가 다시 재생될 수 있습니다.
    /// exactly-once가 필요하면 호스트가 store_batch와 store_position을
    /// 원자적으로 묶어야 합니다. 어느 단계의 에러든 치명적입니다.
    /// 체크포인트를 건너뛰면 소스와 타깃의 괴리가 무한히 커질 수 있습니다.
    async fn flush_batch(&mut self) -> Result<()> {
        // 생성 단계의 바인드 에러(스키마 드리프트)는 저장 전에 드러남
        let statements = self.generate_batch_sql(&self.batch)?;
        for statement in &statements {
            debug!("Replaying: {}", statement.sql);
        }

        info!(
            "Flushing batch of {} mutations at position {}",
            self.batch.len(),
            self.position
        );

        self.storage.store_batch(&self.batch).await?;
        self.storage.store_position(&self.position).await?;
        Ok(())
    }

    /// 컨슈머 종료
    pub async fn close(&mut self) -> Result<()> {
        self.storage.close().await?;
        if let Some(conn) = self.metadata_conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}
