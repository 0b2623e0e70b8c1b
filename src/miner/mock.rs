//! Mock miner for testing

use std::sync::Mutex;
use std::time::Duration;

use crate::miner::{DropMiner, MinerError};

/// How a mock mining run behaves
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Never returns on its own
    RunForever,
    /// Returns the result after the delay
    FinishAfter(Duration, Result<(), MinerError>),
}

/// Records channels and follows a fixed behavior
pub struct MockMiner {
    behavior: MockBehavior,
    channels: Mutex<Vec<String>>,
}

impl MockMiner {
    /// Creates a mock with the given behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            channels: Mutex::new(Vec::new()),
        }
    }

    /// Channels mining was started on, in order
    pub fn channels(&self) -> Vec<String> {
        self.channels.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DropMiner for MockMiner {
    async fn mine(&self, channel: &str) -> Result<(), MinerError> {
        self.channels.lock().unwrap().push(channel.to_string());
        match &self.behavior {
            MockBehavior::RunForever => {
                std::future::pending::<()>().await;
                Ok(())
            }
            MockBehavior::FinishAfter(delay, result) => {
                tokio::time::sleep(*delay).await;
                result.clone()
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
