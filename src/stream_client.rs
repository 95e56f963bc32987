//! 이벤트 스트림 클라이언트
//!
//! 스트림 요청을 보낸 뒤 백그라운드 태스크가 응답 프레임을 읽어
//! 채널로 밀어 넣습니다. 정상 EOF면 채널이 닫히고, 전송/디코딩 에러는
//! Err 하나를 보낸 뒤 중단합니다.

use crate::error::Result;
use crate::events::{StreamRequest, StreamResponse};
use crate::protocol::{decode_message, encode_message, FrameChannel};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// 디스패처가 수신하는 이벤트 스트림 핸들
pub type EventReceiver = mpsc::UnboundedReceiver<Result<StreamResponse>>;

/// 스트림 클라이언트
#[derive(Debug, Clone)]
pub struct VStreamClient {
    hostname: String,
    port: u16,
}

impl VStreamClient {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        VStreamClient {
            hostname: hostname.into(),
            port,
        }
    }

    /// 스트림 시작: 요청 프레임 송신 후 수신 태스크 기동
    pub async fn start_stream(&self, request: &StreamRequest) -> Result<EventReceiver> {
        let mut channel = FrameChannel::connect(&self.hostname, self.port).await?;

        let payload = encode_message(request)?;
        channel.write_frame(&payload).await?;

        info!(
            "Stream request sent to {}:{} (gtid: {:?})",
            self.hostname,
            self.port,
            request
                .vgtid
                .shard_gtids
                .first()
                .map(|shard| shard.gtid.as_str())
        );

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            Self::read_stream_responses(channel, tx).await;
        });

        Ok(rx)
    }

    /// 응답 프레임을 읽어 채널로 전달
    async fn read_stream_responses(
        mut channel: FrameChannel,
        tx: mpsc::UnboundedSender<Result<StreamResponse>>,
    ) {
        let mut response_count: u64 = 0;
        loop {
            match channel.read_frame().await {
                Ok(None) => {
                    info!("Stream ended after {} responses", response_count);
                    break;
                }
                Ok(Some(payload)) => match decode_message::<StreamResponse>(&payload) {
                    Ok(response) => {
                        response_count += 1;
                        debug!(
                            "Received stream response #{} ({} events)",
                            response_count,
                            response.events.len()
                        );
                        if tx.send(Ok(response)).is_err() {
                            // 수신 측이 먼저 종료됨
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to decode stream response: {}", e);
                        let _ = tx.send(Err(e));
                        break;
                    }
                },
                Err(e) => {
                    error!("Stream transport error: {}", e);
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    }
}
