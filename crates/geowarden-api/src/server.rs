//! Control API server.

use crate::api::create_router;
use axum::Router;
use geowarden_supervisor::Supervisor;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// HTTP server wrapping the control API router.
///
/// A failure to bind the control port is fatal at startup and propagates to
/// the invoker; everything after that is handled per request.
pub struct ControlServer {
    port: u16,
    router: Router,
}

impl ControlServer {
    pub fn new(supervisor: Arc<Supervisor>, port: u16) -> Self {
        Self {
            port,
            router: create_router(supervisor),
        }
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("control API listening on {}", addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }

    /// Bind and serve until the task is aborted.
    pub async fn run(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geowarden_supervisor::{ChildProcessConfig, OutputOptions};
    use std::collections::HashMap;
    use std::time::Duration;

    fn test_supervisor() -> Arc<Supervisor> {
        let config = ChildProcessConfig {
            executable_path: "/bin/sleep".to_string(),
            args: vec!["30".to_string()],
            working_directory: None,
            environment: HashMap::new(),
            graceful_timeout: Duration::from_secs(5),
            health_check: None,
        };
        Arc::new(Supervisor::new(config, OutputOptions { capacity: 10 }))
    }

    #[tokio::test]
    async fn test_server_shuts_down_on_signal() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        // Port 0 picks a free port
        let server = ControlServer::new(test_supervisor(), 0);
        let handle = tokio::spawn(async move {
            server
                .run_with_shutdown(async {
                    let _ = rx.await;
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = tx.send(());

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
