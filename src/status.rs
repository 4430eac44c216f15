// src/status.rs

//! Progress tracking for long-running backend jobs.
//!
//! A claim run can take tens of minutes. Views that show a progress popup or an error
//! banner observe one [`ProcessingController`] instead of sharing mutable flags: the
//! controller owns the [`ProcessingStatus`], and every change goes through its methods
//! and is broadcast over a `tokio::sync::watch` channel.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Lifecycle of a single long-running job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState<T> {
    Idle,
    Running { started_at: DateTime<Utc> },
    Succeeded { result: T, finished_at: DateTime<Utc> },
    Failed { error: String, finished_at: DateTime<Utc> },
}

impl<T> JobState<T> {
    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            JobState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// The job state plus the progress popup's visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingStatus<T> {
    pub state: JobState<T>,
    pub popup_visible: bool,
    /// Set when the user closed the popup; a finishing job will not reopen it.
    pub dismissed: bool,
}

impl<T> Default for ProcessingStatus<T> {
    fn default() -> Self {
        ProcessingStatus {
            state: JobState::Idle,
            popup_visible: false,
            dismissed: false,
        }
    }
}

/// Owner of a [`ProcessingStatus`]; clones share the same underlying channel.
#[derive(Debug)]
pub struct ProcessingController<T> {
    sender: Arc<watch::Sender<ProcessingStatus<T>>>,
}

impl<T> Clone for ProcessingController<T> {
    fn clone(&self) -> Self {
        ProcessingController {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ProcessingController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> ProcessingController<T> {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(ProcessingStatus::default());
        ProcessingController {
            sender: Arc::new(sender),
        }
    }

    /// A read-only projection that is notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<ProcessingStatus<T>> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> ProcessingStatus<T> {
        self.sender.borrow().clone()
    }

    /// Moves to `Running` and shows the popup. Returns `false` without changing anything
    /// if a job is already running.
    pub fn start(&self) -> bool {
        self.sender.send_if_modified(|status| {
            if status.state.is_running() {
                log::warn!("Ignoring start request: a job is already running");
                return false;
            }
            *status = ProcessingStatus {
                state: JobState::Running {
                    started_at: Utc::now(),
                },
                popup_visible: true,
                dismissed: false,
            };
            true
        })
    }

    /// [`start`](Self::start) that hands back a guard owning the running job. Dropping the
    /// guard before it finishes the job fails it as cancelled, so an abandoned future
    /// never leaves the controller stuck in `Running`.
    pub fn begin(&self) -> Option<RunningJob<'_, T>> {
        self.start().then_some(RunningJob {
            controller: self,
            finished: false,
        })
    }

    pub fn succeed(&self, result: T) {
        self.finish(JobState::Succeeded {
            result,
            finished_at: Utc::now(),
        });
    }

    pub fn fail(&self, error: impl Into<String>) {
        self.finish(JobState::Failed {
            error: error.into(),
            finished_at: Utc::now(),
        });
    }

    fn finish(&self, state: JobState<T>) {
        self.sender.send_modify(|status| {
            if !status.state.is_running() {
                log::debug!("Job finished while not marked as running");
            }
            status.state = state;
            status.popup_visible = !status.dismissed;
        });
    }

    /// Hides the popup for the remainder of the current job.
    pub fn dismiss(&self) {
        self.sender.send_modify(|status| {
            status.popup_visible = false;
            status.dismissed = true;
        });
    }

    /// Back to `Idle`, popup hidden. Refused while a job is running.
    pub fn reset(&self) -> bool {
        self.sender.send_if_modified(|status| {
            if status.state.is_running() {
                return false;
            }
            *status = ProcessingStatus::default();
            true
        })
    }

    /// Elapsed time of the running job, if any.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        match &self.sender.borrow().state {
            JobState::Running { started_at } => Some(Utc::now() - *started_at),
            _ => None,
        }
    }
}

/// A job started with [`ProcessingController::begin`].
#[derive(Debug)]
pub struct RunningJob<'c, T: Clone + Send + Sync + 'static> {
    controller: &'c ProcessingController<T>,
    finished: bool,
}

impl<T: Clone + Send + Sync + 'static> RunningJob<'_, T> {
    pub fn succeed(mut self, result: T) {
        self.finished = true;
        self.controller.succeed(result);
    }

    pub fn fail(mut self, error: impl Into<String>) {
        self.finished = true;
        self.controller.fail(error);
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for RunningJob<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("Running job dropped before finishing; marking it cancelled");
            self.controller.fail(CANCELLED);
        }
    }
}

/// Error recorded for a job whose guard was dropped mid-flight.
pub const CANCELLED: &str = "cancelled";
