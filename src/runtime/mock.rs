//! Recording surface runtime for tests.
//!
//! Hands out sequential surface ids, records every call, and can be told
//! to fail the next create or remove.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::{CreateOptions, RuntimeError, SurfaceRuntime};
use crate::protocol::SurfaceId;

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeCall {
    Create { url: String, focused: bool },
    Focus(SurfaceId),
    Remove(SurfaceId),
    Send { surface: SurfaceId, payload: Value },
}

pub struct MockRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
    next_surface: AtomicU64,
    fail_create: AtomicBool,
    fail_remove: AtomicBool,
}

impl MockRuntime {
    /// Surface ids are handed out sequentially from `first_surface`.
    pub fn new(first_surface: u64) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_surface: AtomicU64::new(first_surface),
            fail_create: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
        }
    }

    /// Make the next `create` call fail.
    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Make the next `remove` call fail, as if the surface were gone.
    pub fn fail_next_remove(&self) {
        self.fail_remove.store(true, Ordering::SeqCst);
    }

    /// Drain the recorded calls.
    pub fn take_calls(&self) -> Vec<RuntimeCall> {
        std::mem::take(&mut *self.calls.lock().expect("mock lock"))
    }

    fn record(&self, call: RuntimeCall) {
        self.calls.lock().expect("mock lock").push(call);
    }
}

#[async_trait]
impl SurfaceRuntime for MockRuntime {
    async fn create(&self, url: &str, options: CreateOptions) -> Result<SurfaceId, RuntimeError> {
        self.record(RuntimeCall::Create {
            url: url.to_string(),
            focused: options.focused,
        });
        if self.fail_create.swap(false, Ordering::SeqCst) {
            return Err(RuntimeError::CreateFailed("creation refused".into()));
        }
        Ok(SurfaceId(self.next_surface.fetch_add(1, Ordering::SeqCst)))
    }

    async fn focus(&self, id: SurfaceId) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Focus(id));
        Ok(())
    }

    async fn remove(&self, id: SurfaceId) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Remove(id));
        if self.fail_remove.swap(false, Ordering::SeqCst) {
            return Err(RuntimeError::Closed);
        }
        Ok(())
    }

    async fn send(&self, id: SurfaceId, payload: Value) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::Send {
            surface: id,
            payload,
        });
        Ok(())
    }
}
