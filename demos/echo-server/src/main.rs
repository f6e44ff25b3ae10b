//! HTTP echo server assembled through the container.
//!
//! `POST /echo` returns the request body unchanged. The server starts when
//! the application starts, and SIGINT/SIGTERM shuts it down gracefully.

mod server;

use armature::{App, BuildContext, ServiceKey};
use axum::Router;
use server::{EchoConfig, EchoHandler, HttpServer, new_echo_handler, new_http_server, new_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = App::builder()
        .supply(EchoConfig {
            addr: "127.0.0.1:8080".into(),
        })
        .provide("new_echo_handler", &[], new_echo_handler)
        .provide("new_router", &[ServiceKey::of::<EchoHandler>()], new_router)
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
        .await;

    let app = match app {
        Ok(app) => app,
        Err(err) => {
            tracing::error!(error = %err, "failed to build application");
            std::process::exit(1);
        }
    };

    std::process::exit(app.run().await);
}
