//! Canned planner for tests and offline runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{PlanError, PlanGenerator, PlanRequest, PlanResponse};

pub struct StaticPlanner {
    response: Result<PlanResponse, String>,
    last_request: Mutex<Option<PlanRequest>>,
    call_count: AtomicU32,
}

impl StaticPlanner {
    pub fn new(response: PlanResponse) -> Self {
        Self {
            response: Ok(response),
            last_request: Mutex::new(None),
            call_count: AtomicU32::new(0),
        }
    }

    /// A planner whose every call fails with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            last_request: Mutex::new(None),
            call_count: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<PlanRequest> {
        match self.last_request.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl PlanGenerator for StaticPlanner {
    async fn generate(&self, request: &PlanRequest) -> Result<PlanResponse, PlanError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some(request.clone());
        }
        self.response.clone().map_err(PlanError::Transport)
    }
}
