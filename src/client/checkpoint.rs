//! Checkpoints: markers in a collection's processing queue.
//!
//! A checkpoint is created with
//! [`Collection::checkpoint`](crate::client::Collection::checkpoint) and is
//! reached once every change sent before it has been applied. Until then,
//! each status accessor polls the server. A reached checkpoint keeps its final
//! status without further polls; an expired one fails every accessor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::resource::RestPoseResource;
use crate::error::{RestPoseError, Result};

/// Status reported by the server for a checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckPointStatus {
    pub reached: bool,
    /// Errors raised while processing changes sent before the checkpoint.
    /// The server may report only some of them.
    pub errors: Vec<Value>,
    pub total_errors: u64,
}

/// Where a checkpoint is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckPointState {
    Pending,
    Reached(CheckPointStatus),
    /// The server no longer knows the checkpoint.
    Expired,
}

impl CheckPointState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CheckPointState::Pending)
    }
}

/// Controls [`CheckPoint::wait_with`].
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Give up with a timeout error after this long.
    pub timeout: Option<Duration>,
    /// Give up with a cancellation error once this is set.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl WaitOptions {
    pub fn new(poll_interval: Duration) -> Self {
        WaitOptions {
            poll_interval,
            timeout: None,
            cancel: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// A checkpoint in a collection's processing queue.
#[derive(Debug)]
pub struct CheckPoint {
    check_id: String,
    path: String,
    resource: RestPoseResource,
    poll_interval: Duration,
    state: Mutex<CheckPointState>,
}

impl CheckPoint {
    pub(crate) fn new(
        check_id: String,
        collection_path: &str,
        resource: RestPoseResource,
        poll_interval: Duration,
    ) -> Self {
        let path = format!("{collection_path}/checkpoint/{check_id}");
        CheckPoint {
            check_id,
            path,
            resource,
            poll_interval,
            state: Mutex::new(CheckPointState::Pending),
        }
    }

    /// The server-assigned identifier.
    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    /// The last known state, without polling.
    pub fn state(&self) -> CheckPointState {
        self.state.lock().clone()
    }

    /// Poll if still pending, and return the final status once reached.
    fn refresh(&self) -> Result<Option<CheckPointStatus>> {
        let mut state = self.state.lock();
        if *state == CheckPointState::Pending {
            debug!(check_id = %self.check_id, "polling checkpoint");
            let body: Value = self
                .resource
                .get(&self.path)?
                .expect_status(&[200])?
                .json()?;
            if body.is_null() {
                warn!(check_id = %self.check_id, "checkpoint expired");
                *state = CheckPointState::Expired;
            } else {
                let status: CheckPointStatus = serde_json::from_value(body)?;
                if status.reached {
                    *state = CheckPointState::Reached(status);
                }
            }
        }
        match &*state {
            CheckPointState::Pending => Ok(None),
            CheckPointState::Reached(status) => Ok(Some(status.clone())),
            CheckPointState::Expired => Err(RestPoseError::checkpoint_expired(&self.check_id)),
        }
    }

    /// True once every change before the checkpoint has been processed.
    pub fn reached(&self) -> Result<bool> {
        Ok(self.refresh()?.is_some())
    }

    /// Errors from processing changes before the checkpoint, or `None` if
    /// it has not been reached.
    pub fn errors(&self) -> Result<Option<Vec<Value>>> {
        Ok(self.refresh()?.map(|status| status.errors))
    }

    /// Total number of errors, or `None` if not yet reached.
    pub fn total_errors(&self) -> Result<Option<u64>> {
        Ok(self.refresh()?.map(|status| status.total_errors))
    }

    /// Wait until reached, polling at the configured interval.
    pub fn wait(&self) -> Result<&Self> {
        self.wait_with(&WaitOptions::new(self.poll_interval))
    }

    /// Wait until reached, with an optional timeout and cancellation flag.
    pub fn wait_with(&self, options: &WaitOptions) -> Result<&Self> {
        let started = Instant::now();
        loop {
            if self.refresh()?.is_some() {
                return Ok(self);
            }
            if options.cancelled() {
                return Err(RestPoseError::cancelled(format!(
                    "wait for checkpoint {}",
                    self.check_id
                )));
            }
            let mut delay = options.poll_interval;
            if let Some(timeout) = options.timeout {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    return Err(RestPoseError::timeout(format!(
                        "checkpoint {} not reached after {:?}",
                        self.check_id, timeout
                    )));
                }
                delay = delay.min(timeout - elapsed);
            }
            thread::sleep(delay);
        }
    }
}
