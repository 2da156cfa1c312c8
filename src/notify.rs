use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

/// Direct channel to the administrator, used for size alerts and write failures.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify(&self, text: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AdminNotifier for MemoryNotifier {
    async fn notify(&self, text: &str) -> anyhow::Result<()> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_owned());
        Ok(())
    }
}
