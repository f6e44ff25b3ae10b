//! Echo server components, wired through the container.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::Context;
use armature::{BuildContext, Hook};
use axum::Router;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Listen address, supplied at the application root.
pub struct EchoConfig {
    pub addr: String,
}

/// Returns request bodies unchanged.
pub struct EchoHandler;

impl EchoHandler {
    pub fn respond(&self, body: String) -> String {
        body
    }
}

pub fn new_echo_handler(_cx: &mut BuildContext) -> anyhow::Result<EchoHandler> {
    Ok(EchoHandler)
}

/// Builds the router, dispatching `POST /echo` to the handler.
pub fn new_router(cx: &mut BuildContext) -> anyhow::Result<Router> {
    let echo = cx.get::<EchoHandler>()?;
    Ok(Router::new().route(
        "/echo",
        post(move |body: String| async move { echo.respond(body) }),
    ))
}

/// The HTTP server. Construction only records intent: the listener is bound
/// by the start hook, the serve loop runs on its own task, and the stop hook
/// signals graceful shutdown and joins that task.
pub struct HttpServer {
    bound: Arc<OnceLock<SocketAddr>>,
}

impl HttpServer {
    /// The address the listener actually bound, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.get().copied()
    }
}

pub fn new_http_server(cx: &mut BuildContext) -> anyhow::Result<HttpServer> {
    let config = cx.get::<EchoConfig>()?;
    let router = cx.get::<Router>()?;

    let addr = config.addr.clone();
    let bound = Arc::new(OnceLock::new());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task: Arc<Mutex<Option<JoinHandle<std::io::Result<()>>>>> = Arc::new(Mutex::new(None));

    let start_router = (*router).clone();
    let start_bound = Arc::clone(&bound);
    let start_task = Arc::clone(&task);
    let stop_task = Arc::clone(&task);

    cx.lifecycle().append(
        Hook::named("serve")
            .on_start(move || async move {
                let listener = TcpListener::bind(&addr)
                    .await
                    .with_context(|| format!("failed to bind {addr}"))?;
                let local = listener.local_addr()?;
                let _ = start_bound.set(local);
                tracing::info!(addr = %local, "starting HTTP server");
                let handle = tokio::spawn(async move {
                    axum::serve(listener, start_router)
                        .with_graceful_shutdown(async {
                            let _ = shutdown_rx.await;
                        })
                        .await
                });
                *start_task.lock().unwrap() = Some(handle);
                Ok(())
            })
            .on_stop(move || async move {
                tracing::info!("stopping HTTP server");
                let _ = shutdown_tx.send(());
                let handle = stop_task.lock().unwrap().take();
                if let Some(handle) = handle {
                    handle.await??;
                }
                Ok(())
            }),
    );

    Ok(HttpServer { bound })
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature::{App, ServiceKey};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn post_echo(addr: SocketAddr, body: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "POST /echo HTTP/1.1\r\nHost: {addr}\r\nContent-Type: text/plain\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len(),
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8(response).unwrap();
        response
            .split_once("\r\n\r\n")
            .map(|(_, body)| body.to_string())
            .unwrap()
    }

    #[tokio::test]
    async fn echoes_while_running_and_refuses_after_stop() {
        let mut app = App::builder()
            .supply(EchoConfig {
                addr: "127.0.0.1:0".into(),
            })
            .provide("new_echo_handler", &[], new_echo_handler)
            .provide(
                "new_router",
                &[ServiceKey::of::<EchoHandler>()],
                new_router,
            )
            .provide(
                "new_http_server",
                &[ServiceKey::of::<EchoConfig>(), ServiceKey::of::<Router>()],
                new_http_server,
            )
            .invoke(
                "serve",
                &[ServiceKey::of::<HttpServer>()],
                |cx: &mut BuildContext| {
                    let _ = cx.get::<HttpServer>();
                    async {}
                },
            )
            .build()
            .await
            .unwrap();

        app.start().await.unwrap();
        let addr = app.get::<HttpServer>().unwrap().local_addr().unwrap();

        let echoed = post_echo(addr, "hello armature").await;
        assert_eq!(echoed, "hello armature");

        app.stop().await.unwrap();

        // The listener is gone once stop returns.
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
