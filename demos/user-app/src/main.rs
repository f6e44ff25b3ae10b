//! Save/find demo: a user service resolved through the container and driven
//! by an invoke target.

mod infra;
mod user;

use std::sync::Arc;

use armature::{App, AppBuilder, BuildContext, ServiceKey};
use infra::InMemoryRepository;
use user::{UserRepository, UserService};
use uuid::Uuid;

/// Groups the user providers under one module, shown in events.
fn user_module(builder: AppBuilder) -> AppBuilder {
    builder.module("user", |builder| {
        builder
            .provide("new_repository", &[], |_: &mut BuildContext| {
                Ok(Arc::new(InMemoryRepository::new()) as Arc<dyn UserRepository>)
            })
            .provide(
                "new_user_service",
                &[ServiceKey::of::<Arc<dyn UserRepository>>()],
                |cx: &mut BuildContext| {
                    let repository = cx.get::<Arc<dyn UserRepository>>()?;
                    Ok(UserService::new((*repository).clone()))
                },
            )
    })
}

/// Entry point behavior. Errors are handled here; they cannot propagate
/// through the invoke boundary.
async fn run_app(service: armature::Result<Arc<UserService>>) {
    let Ok(service) = service else {
        return;
    };
    let id = Uuid::new_v4().to_string();

    if let Err(err) = service.save_user(&id, "example user").await {
        tracing::error!(error = %err, "error saving user");
        return;
    }
    match service.user(&id).await {
        Ok(username) => tracing::info!(%id, %username, "retrieved user"),
        Err(err) => tracing::error!(error = %err, "error getting user"),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = user_module(App::builder())
        .invoke(
            "run_app",
            &[ServiceKey::of::<UserService>()],
            |cx: &mut BuildContext| run_app(cx.get::<UserService>()),
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
