//! User domain: the service and its persistence boundary.

use std::sync::Arc;

use async_trait::async_trait;

/// Persistence boundary for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save(&self, id: &str, username: &str) -> anyhow::Result<()>;
    async fn find(&self, id: &str) -> anyhow::Result<String>;
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn save_user(&self, id: &str, username: &str) -> anyhow::Result<()> {
        self.repository.save(id, username).await
    }

    pub async fn user(&self, id: &str) -> anyhow::Result<String> {
        self.repository.find(id).await
    }
}
