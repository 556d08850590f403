//! Timed choreography for Lumunus sessions.
//!
//! The engines here own a session from `lumunus-core`, turn user actions into
//! sequences of delayed steps on a [`Scheduler`], and publish a snapshot to
//! subscribers after every state change.
//!
//! Each engine carries a generation counter. Resetting or rebinding a session
//! bumps it and cancels the in-flight step, and any step that still fires with
//! an older generation is discarded.

pub mod prep_engine;
pub mod scheduler;
mod subscription;
pub mod turn_engine;

pub use prep_engine::PrepEngine;
pub use scheduler::{ManualScheduler, Scheduler, Task, TaskHandle, TokioScheduler};
pub use subscription::Subscription;
pub use turn_engine::TurnEngine;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a listener panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
