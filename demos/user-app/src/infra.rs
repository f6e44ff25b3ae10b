//! In-memory stand-in for a real persistence layer.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;

use crate::user::UserRepository;

#[derive(Default)]
pub struct InMemoryRepository {
    users: Mutex<HashMap<String, String>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn save(&self, id: &str, username: &str) -> anyhow::Result<()> {
        self.users
            .lock()
            .unwrap()
            .insert(id.to_string(), username.to_string());
        Ok(())
    }

    async fn find(&self, id: &str) -> anyhow::Result<String> {
        match self.users.lock().unwrap().get(id) {
            Some(username) => Ok(username.clone()),
            None => bail!("user {id} not found"),
        }
    }
}
