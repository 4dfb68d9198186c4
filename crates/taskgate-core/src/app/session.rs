//! Session - 1 接続分の handshake と command loop
//!
//! # フロー
//! 1. validator を実行し、0 以外なら `REJECTED` を送って切断
//! 2. 出力 channel を BroadcastHub に登録
//! 3. 1 行 = 1 command を読み、応答を同じ channel に流す
//! 4. EOF / I/O エラーで登録解除
//!
//! 応答と broadcast は同じ channel を通るので、1 接続内の順序は送信順のまま。

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, WriteHalf};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

use super::scheduler::SchedulerCore;
use super::protocol::{self, Command};
use crate::error::Rejection;

pub struct Session<S> {
    core: Arc<SchedulerCore>,
    stream: S,
    peer: String,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(core: Arc<SchedulerCore>, stream: S, peer: impl Into<String>) -> Self {
        Self {
            core,
            stream,
            peer: peer.into(),
        }
    }

    pub async fn run(self) {
        let Session { core, stream, peer } = self;
        let (reader, mut writer) = tokio::io::split(stream);

        let code = core.validate_client().await;
        if code != 0 {
            tracing::warn!(peer = %peer, code, "Client validation failed");
            let line = core.reply(Err(Rejection::ValidationFailed(code)));
            if let Err(e) = write_line(&mut writer, &line).await {
                tracing::debug!(peer = %peer, error = %e, "Could not deliver rejection");
            }
            let _ = writer.shutdown().await;
            return;
        }
        tracing::info!(peer = %peer, "Client validated");

        let (tx, rx) = unbounded_channel();
        let listener = core.hub().register(tx.clone());
        let writer_task = tokio::spawn(write_loop(writer, rx, peer.clone()));

        // 不正な UTF-8 でも切断せず、置換文字入りの行として扱う
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(peer = %peer, error = %e, "Read failed");
                    break;
                }
            }
            let decoded = String::from_utf8_lossy(&buf);
            let line = decoded.trim_end_matches(['\n', '\r']);
            tracing::info!(peer = %peer, request = %line, "Request received");

            let response = respond(&core, Command::parse(line)).await;
            if tx.send(response).is_err() {
                // writer 側が先に終了している
                break;
            }
        }

        core.hub().unregister(listener);
        drop(tx);
        let _ = writer_task.await;
        tracing::info!(peer = %peer, "Connection closed");
    }
}

/// Execute one parsed command and format the reply line.
async fn respond(core: &SchedulerCore, command: Result<Command, Rejection>) -> String {
    let result = match command {
        Ok(Command::RequestTask(request)) => core
            .submit(&request)
            .await
            .map(|task| protocol::queued_message(&task)),
        Ok(Command::QueueStatus) => Ok(core.queue_report().await),
        Ok(Command::CancelTask(raw_id)) => core
            .cancel(raw_id)
            .await
            .map(|task| protocol::cancelled_message(&task)),
        Ok(Command::TaskHistory) => Ok(core.history_report()),
        Err(reason) => Err(reason),
    };
    core.reply(result)
}

async fn write_loop<S>(mut writer: WriteHalf<S>, mut rx: UnboundedReceiver<String>, peer: String)
where
    S: AsyncRead + AsyncWrite,
{
    while let Some(line) = rx.recv().await {
        if let Err(e) = write_line(&mut writer, &line).await {
            tracing::debug!(peer = %peer, error = %e, "Write failed");
            // rx を drop すると hub 側の次の send で自動的に外れる
            return;
        }
    }
    let _ = writer.shutdown().await;
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
