use super::protocol::{Request, Response};
use crate::error::{PolicyError, Result};
use crate::resolve::Resolver;
use crate::router::ProxyRouter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

/// Query server configuration
pub struct QueryServerConfig<R> {
    /// Unix domain socket path to listen on
    pub socket_path: PathBuf,
    /// Router answering the queries
    pub router: Arc<ProxyRouter<R>>,
}

impl<R> Clone for QueryServerConfig<R> {
    fn clone(&self) -> Self {
        Self {
            socket_path: self.socket_path.clone(),
            router: Arc::clone(&self.router),
        }
    }
}

/// Answers routing queries from host processes
pub struct QueryServer<R> {
    config: QueryServerConfig<R>,
}

impl<R: Resolver + Send + Sync + 'static> QueryServer<R> {
    pub fn new(config: QueryServerConfig<R>) -> Self {
        Self { config }
    }

    /// Start listening on the Unix domain socket
    pub async fn start(&self) -> Result<()> {
        // Remove a stale socket left by a previous run
        let _ = std::fs::remove_file(&self.config.socket_path);

        let listener = UnixListener::bind(&self.config.socket_path)?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve(&self, listener: UnixListener) -> Result<()> {
        info!("Policy queries on {:?}", self.config.socket_path);

        loop {
            let (socket, _) = listener.accept().await?;
            let router = Arc::clone(&self.config.router);

            tokio::spawn(async move {
                if let Err(e) = handle_client(socket, router).await {
                    debug!("Client error: {}", e);
                }
            });
        }
    }
}

/// Serve requests from one client until it hangs up
async fn handle_client<R: Resolver + Send + Sync + 'static>(
    stream: UnixStream,
    router: Arc<ProxyRouter<R>>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let response = match Request::parse(&line) {
            Ok(request) => answer(&router, request).await?,
            Err(e) => {
                debug!("Rejected request {:?}: {}", line, e);
                Response::Error
            }
        };

        writer.write_all(format!("{}\n", response).as_bytes()).await?;
        writer.flush().await?;
    }

    debug!("Client disconnected");
    Ok(())
}

async fn answer<R: Resolver + Send + Sync + 'static>(
    router: &Arc<ProxyRouter<R>>,
    request: Request,
) -> Result<Response> {
    match request {
        Request::Query { app, host, port } => {
            // Resolution blocks, keep it off the reactor
            let router = Arc::clone(router);
            let decision = tokio::task::spawn_blocking(move || router.route(&app, &host, port))
                .await
                .map_err(|e| {
                    warn!("Evaluation task failed: {}", e);
                    PolicyError::Query(e.to_string())
                })?;
            Ok(Response::Decision(decision))
        }
        Request::Forget { app } => {
            router.forget_app(&app);
            Ok(Response::Ok)
        }
    }
}
