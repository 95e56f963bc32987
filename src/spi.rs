//! 플러그형 스토리지 인터페이스 (호스트 구현)
//!
//! 복제된 행과 체크포인트의 실제 영속화는 호스트 몫입니다.
//! 모든 메서드는 기본 no-op이라 변환/생성 로직만 단독으로 돌릴 수 있습니다.
//!
//! exactly-once가 필요하면 store_batch와 store_position을 호스트가
//! 하나의 트랜잭션으로 묶어야 합니다. 이 코어는 둘을 순서대로 호출할 뿐입니다.

use crate::error::Result;
use crate::mutation::RowMutation;
use crate::position::Position;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// 스토리지 훅
#[async_trait]
pub trait StorageHook: Send {
    /// 컨슈머 open 시 호출
    async fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// 컨슈머 close 시 호출
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// 마지막 체크포인트 로드 (최초 실행이면 None)
    async fn load_position(&mut self) -> Result<Option<Position>> {
        Ok(None)
    }

    /// 뮤테이션 배치를 영속화
    async fn store_batch(&mut self, _batch: &[RowMutation]) -> Result<()> {
        Ok(())
    }

    /// 체크포인트를 영속화
    async fn store_position(&mut self, _position: &Position) -> Result<()> {
        Ok(())
    }
}

/// 아무것도 하지 않는 기본 스토리지
#[derive(Debug, Default)]
pub struct NoopStorage;

#[async_trait]
impl StorageHook for NoopStorage {}

#[derive(Debug, Default)]
struct MemoryStorageInner {
    batches: Vec<Vec<RowMutation>>,
    position: Option<Position>,
    opened: bool,
    closed: bool,
}

/// 메모리 스토리지
///
/// 배치와 체크포인트를 메모리에 쌓아둡니다. 단독 실행 싱크이자
/// 테스트에서 호출 기록 확인용으로 사용합니다.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// 체크포인트를 미리 심어둔 스토리지 생성 (재시작 시나리오용)
    pub fn with_position(position: Position) -> Self {
        let storage = MemoryStorage::default();
        storage.inner.lock().position = Some(position);
        storage
    }

    /// 지금까지 저장된 배치들
    pub fn stored_batches(&self) -> Vec<Vec<RowMutation>> {
        self.inner.lock().batches.clone()
    }

    /// 마지막으로 저장된 체크포인트
    pub fn last_position(&self) -> Option<Position> {
        self.inner.lock().position.clone()
    }

    pub fn is_opened(&self) -> bool {
        self.inner.lock().opened
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[async_trait]
impl StorageHook for MemoryStorage {
    async fn open(&mut self) -> Result<()> {
        self.inner.lock().opened = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.lock().closed = true;
        Ok(())
    }

    async fn load_position(&mut self) -> Result<Option<Position>> {
        Ok(self.inner.lock().position.clone())
    }

    async fn store_batch(&mut self, batch: &[RowMutation]) -> Result<()> {
        self.inner.lock().batches.push(batch.to_vec());
        Ok(())
    }

    async fn store_position(&mut self, position: &Position) -> Result<()> {
        self.inner.lock().position = Some(position.clone());
        Ok(())
    }
}
