//! Echo server with a custom JSON event sink and an explicit
//! start/signal/stop loop instead of [`App::run`].

mod logger;

use std::sync::{Arc, Mutex};

use armature::{App, BuildContext, Hook, ServiceKey, shutdown_signal};
use axum::Router;
use axum::routing::post;
use logger::JsonSink;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Echo server owning its serve task. The provider only constructs it; the
/// hooks registered by the `start_http_server` invoke target drive it.
pub struct HttpServer {
    addr: String,
    router: Router,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
}

impl HttpServer {
    /// Binds the listener and moves the serve loop onto its own task.
    pub async fn start(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "starting HTTP server");

        let (tx, rx) = oneshot::channel();
        *self.shutdown.lock().unwrap() = Some(tx);

        let router = self.router.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
        });
        *self.task.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Signals the serve task to wind down and joins it.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        tracing::info!("stopping HTTP server");
        if let Some(tx) = self.shutdown.lock().unwrap().take() {
            let _ = tx.send(());
        }
        let handle = self.task.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.await??;
        }
        Ok(())
    }
}

fn new_http_server(_cx: &mut BuildContext) -> anyhow::Result<HttpServer> {
    let router = Router::new().route("/echo", post(|body: String| async move { body }));
    Ok(HttpServer {
        addr: "127.0.0.1:8080".into(),
        router,
        shutdown: Mutex::new(None),
        task: Mutex::new(None),
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = App::builder()
        .event_sink(JsonSink::new())
        .provide("new_http_server", &[], new_http_server)
        .invoke(
            "start_http_server",
            &[ServiceKey::of::<HttpServer>()],
            |cx: &mut BuildContext| {
                if let Ok(server) = cx.get::<HttpServer>() {
                    let start_server = Arc::clone(&server);
                    cx.lifecycle().append(
                        Hook::named("http")
                            .on_start(move || async move { start_server.start().await })
                            .on_stop(move || async move { server.shutdown().await }),
                    );
                }
                async {}
            },
        )
        .build()
        .await;

    let mut app = match app {
        Ok(app) => app,
        Err(err) => {
            tracing::error!(error = %err, "failed to build application");
            std::process::exit(1);
        }
    };

    if let Err(err) = app.start().await {
        tracing::error!(error = %err, "failed to start application");
        std::process::exit(1);
    }

    let signal = shutdown_signal().await;
    tracing::info!(signal, "shutting down application");

    if let Err(err) = app.stop().await {
        tracing::error!(error = %err, "failed to stop application");
        std::process::exit(1);
    }
}
