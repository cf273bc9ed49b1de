use crate::body::{ResponseBody, req_body};
use crate::error::{ServerBuildError, ServerError};
use crate::handler::RequestHandler;
use crate::responder::into_response;
use http::{Request, Response};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::ops::Deref;
use std::pin::pin;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// The peer address of the connection a request arrived on, stored in the request
/// extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(SocketAddr);

impl From<SocketAddr> for RemoteAddr {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl Deref for RemoteAddr {
    type Target = SocketAddr;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server").field("address", &self.address).finish_non_exhaustive()
    }
}

pub struct ServerBuilder {
    handler: Option<Arc<dyn RequestHandler>>,
    address: Option<io::Result<Vec<SocketAddr>>>,
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder").field("address", &self.address).finish_non_exhaustive()
    }
}

impl ServerBuilder {
    fn new() -> Self {
        Self { handler: None, address: None }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(|addrs| addrs.collect()));
        self
    }

    pub fn handler(mut self, handler: impl RequestHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let handler = self.handler.ok_or(ServerBuildError::MissingHandler)?;
        let address = self
            .address
            .ok_or(ServerBuildError::MissingAddress)?
            .map_err(|source| ServerBuildError::InvalidAddress { source })?;
        if address.is_empty() {
            return Err(ServerBuildError::MissingAddress);
        }
        Ok(Server { handler, address })
    }
}

/// An HTTP/1 server driving every request through one [`RequestHandler`].
pub struct Server {
    handler: Arc<dyn RequestHandler>,
    address: Vec<SocketAddr>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds and serves until ctrl-c.
    pub async fn start(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(cause = %e, "failed to listen for ctrl-c, serving until killed");
                std::future::pending::<()>().await;
            }
        })
        .await;

        Ok(())
    }

    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let listener = TcpListener::bind(self.address.as_slice()).await.map_err(|e| {
            error!(cause = %e, address = ?self.address, "bind server error");
            e
        })?;
        info!("start listening at {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Accepts connections on `listener` until `shutdown` completes.
    ///
    /// Each connection is served on its own task; connections still open at
    /// shutdown keep running until their peer closes them.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = pin!(shutdown);

        loop {
            let (tcp_stream, remote_addr) = tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested, stop accepting connections");
                    return;
                }
                accepted = listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            tokio::spawn(serve_connection(Arc::clone(&self.handler), tcp_stream, remote_addr));
        }
    }
}

async fn serve_connection(handler: Arc<dyn RequestHandler>, tcp_stream: TcpStream, remote_addr: SocketAddr) {
    let service = service_fn(move |req: Request<Incoming>| {
        let handler = Arc::clone(&handler);
        async move { Ok::<_, Infallible>(dispatch(handler.as_ref(), req, remote_addr).await) }
    });

    match http1::Builder::new().serve_connection(TokioIo::new(tcp_stream), service).await {
        Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
        Err(e) => error!(%remote_addr, cause = %e, "service has error, connection shutdown"),
    }
}

async fn dispatch(handler: &dyn RequestHandler, req: Request<Incoming>, remote_addr: SocketAddr) -> Response<ResponseBody> {
    let mut req = req.map(req_body);
    req.extensions_mut().insert(RemoteAddr::from(remote_addr));
    into_response(handler.invoke(req).await)
}
