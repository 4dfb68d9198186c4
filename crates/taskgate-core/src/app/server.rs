//! Server - TCP accept loop
//!
//! 接続ごとに Session を tokio::spawn し、accept は止めない。
//! Dispatcher もここで起動し、shutdown で一緒に止める。

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use super::scheduler::SchedulerCore;
use super::dispatcher::Dispatcher;
use super::session::Session;
use crate::error::{Result, TaskgateError};

pub struct Server {
    listener: TcpListener,
    core: Arc<SchedulerCore>,
}

impl Server {
    pub async fn bind(addr: SocketAddr, core: Arc<SchedulerCore>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TaskgateError::Bind { addr, source })?;
        Ok(Self { listener, core })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Running sessions and workers are not waited for.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "Server listening");

        let dispatcher = Dispatcher::new(Arc::clone(&self.core)).spawn();

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::info!(peer = %peer, "Client connected");
                        let session = Session::new(Arc::clone(&self.core), stream, peer.to_string());
                        tokio::spawn(session.run());
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        dispatcher.abort();
        Ok(())
    }
}
