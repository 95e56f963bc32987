//! 스트림 전송 프레임 처리
//!
//! 업스트림 스트림 엔드포인트와 주고받는 프레임 형식:
//! 4 바이트 길이 (little-endian) + serde_json 페이로드

use crate::error::{CdcError, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, Cursor};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// 프레임 헤더 크기 (길이 필드)
const FRAME_HEADER_SIZE: usize = 4;

/// 허용하는 최대 프레임 크기 (손상된 헤더 방어)
const MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// 프레임 채널
pub struct FrameChannel {
    stream: TcpStream,
}

impl FrameChannel {
    /// 새 프레임 채널 생성 (TCP 연결)
    pub async fn connect(hostname: &str, port: u16) -> Result<Self> {
        let addr = format!("{}:{}", hostname, port);
        let stream = TcpStream::connect(&addr).await.map_err(|e| {
            CdcError::ConnectionError(format!("Failed to connect to {}: {}", addr, e))
        })?;

        debug!("Connected to stream endpoint at {}", addr);

        Ok(FrameChannel { stream })
    }

    /// 프레임 읽기 (정상 EOF면 None)
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        match self.stream.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => {
                return Err(CdcError::IoError(format!(
                    "Failed to read frame header: {}",
                    e
                )))
            }
        }

        let mut cursor = Cursor::new(&header[..]);
        let length = ReadBytesExt::read_u32::<LittleEndian>(&mut cursor)
            .map_err(|e| CdcError::ProtocolError(format!("Failed to read frame length: {}", e)))?;

        if length > MAX_FRAME_SIZE {
            return Err(CdcError::ProtocolError(format!(
                "Frame too large: {} bytes",
                length
            )));
        }

        let mut buffer = vec![0u8; length as usize];
        self.stream
            .read_exact(&mut buffer)
            .await
            .map_err(|e| CdcError::IoError(format!("Failed to read frame body: {}", e)))?;

        Ok(Some(buffer))
    }

    /// 프레임 쓰기
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let mut frame = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
        frame.put_u32_le(payload.len() as u32);
        frame.put_slice(payload);

        self.stream
            .write_all(&frame)
            .await
            .map_err(|e| CdcError::IoError(format!("Failed to write frame: {}", e)))?;
        self.stream
            .flush()
            .await
            .map_err(|e| CdcError::IoError(format!("Failed to flush: {}", e)))?;

        Ok(())
    }
}

/// 메시지를 프레임 페이로드로 직렬화
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// 프레임 페이로드를 메시지로 역직렬화
pub fn decode_message<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload)
        .map_err(|e| CdcError::ProtocolError(format!("Failed to decode frame payload: {}", e)))
}
