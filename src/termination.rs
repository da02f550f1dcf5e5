//! Shutdown jobs of a container tree.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::key::Reflect;
use crate::types::TypeInfo;

type Job = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    jobs: Vec<Job>,
    terminated: bool,
}

/// Cleanup jobs run when the container tree shuts down.
///
/// Jobs run in reverse order of registration, exactly once, when
/// [`Container::shutdown`](crate::Container::shutdown) is called or the
/// root container is dropped. A job added after shutdown runs immediately.
/// The termination is bound in every container and can be injected like any
/// component.
///
/// # Examples
///
/// ```rust
/// use fluid_tools::Registry;
/// use std::sync::{Arc, Mutex};
///
/// let container = Registry::new().build();
/// let log = Arc::new(Mutex::new(Vec::new()));
///
/// let termination = container.termination();
/// let first = log.clone();
/// termination.add(move || first.lock().unwrap().push("pool"));
/// let second = log.clone();
/// termination.add(move || second.lock().unwrap().push("server"));
///
/// container.shutdown();
/// container.shutdown();
/// assert_eq!(*log.lock().unwrap(), vec!["server", "pool"]);
/// ```
#[derive(Clone, Default)]
pub struct ContainerTermination {
    state: Arc<Mutex<State>>,
}

impl ContainerTermination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a job.
    pub fn add<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if state.terminated {
            drop(state);
            tracing::warn!("termination job added after shutdown; running it now");
            job();
            return;
        }
        state.jobs.push(Box::new(job));
    }

    /// Registers a job whose failure is logged.
    pub fn add_fallible<F, E>(&self, name: &'static str, job: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: fmt::Display,
    {
        self.add(move || {
            if let Err(error) = job() {
                tracing::warn!(job = name, %error, "termination job failed");
            }
        });
    }

    /// Runs the pending jobs, last registered first.
    pub fn run(&self) {
        let jobs = {
            let mut state = self.state.lock();
            state.terminated = true;
            std::mem::take(&mut state.jobs)
        };
        if !jobs.is_empty() {
            tracing::debug!(jobs = jobs.len(), "running termination jobs");
        }
        for job in jobs.into_iter().rev() {
            job();
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    /// Number of jobs waiting for shutdown.
    pub fn pending(&self) -> usize {
        self.state.lock().jobs.len()
    }
}

impl fmt::Debug for ContainerTermination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ContainerTermination")
            .field("pending", &state.jobs.len())
            .field("terminated", &state.terminated)
            .finish()
    }
}

impl Reflect for ContainerTermination {
    fn type_info() -> TypeInfo {
        TypeInfo::final_class::<Self>().into()
    }
}
