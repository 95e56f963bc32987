/// CDC 컨슈머 실행 바이너리
///
/// 환경 변수로 설정을 읽어 스트림을 소비하고, 기본 no-op 스토리지로
/// 동작합니다. 실제 영속화는 StorageHook 구현을 주입해 사용합니다.
use rust_cdc::consumer::CdcConsumer;
use rust_cdc::spi::NoopStorage;
use rust_cdc::{CdcConfig, Result};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // 로깅 초기화
    tracing_subscriber::fmt::init();

    let config = match CdcConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("cdc consumer error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting CDC consumer for {}.{} -> {}.{}",
        config.table_schema,
        config.source_table_name,
        config.table_schema,
        config.target_table_name
    );

    if let Err(e) = run(config).await {
        error!("cdc consumer fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: CdcConfig) -> Result<()> {
    let mut consumer = CdcConsumer::new(config, Box::new(NoopStorage));

    consumer.open().await?;
    consumer.start_stream().await?;

    // 정상 EOF나 전송 에러는 run이 조용히 끝나는 것으로 관찰됨
    consumer.run().await?;

    consumer.close().await?;
    info!("CDC consumer stopped");
    Ok(())
}
