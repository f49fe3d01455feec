//! Request coordination
//!
//! All creation requests go through a single admission task. It
//! parallelizes creations for different functions and ensures that for a
//! given function only one request runs the creation pipeline; every other
//! request for that function waits for it to finish and then reads the
//! service registry.
//!
//! The admission task exclusively owns the in-flight marker table. A
//! finished creation does not touch the table itself: it sends a release
//! message back to the admission task, which removes the marker and wakes
//! its waiters in the same step. No admission can be interleaved between
//! the two, so a request can never be taken for a fresh miss while its
//! function still has a creation in flight.

use std::{collections::HashMap, sync::Arc, time::Instant};

use log::{debug, error, info, warn};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::{JoinHandle, JoinSet},
};
use uuid::Uuid;

use crate::{
    core::{
        error::{ExecutorError, ExecutorResult},
        identity::FunctionIdentity,
        traits::ServiceRegistry,
        types::ServiceHandle,
    },
    metrics::{ADMISSIONS, CREATIONS, CREATION_LATENCY},
};

use super::{dispatcher::BackendDispatcher, resolver::EnvironmentResolver};

/// Outcome delivered to each requester.
///
/// `Ok(None)` is the empty result of a backend that produced no service.
pub type CreationResult = ExecutorResult<Option<Arc<ServiceHandle>>>;

/// Sink receiving exactly one [`CreationResult`].
pub type ResultSink = oneshot::Sender<CreationResult>;

struct CreationRequest {
    id: Uuid,
    function: FunctionIdentity,
    respond_to: ResultSink,
}

enum Command {
    Create(CreationRequest),
    Stats(oneshot::Sender<CoordinatorStats>),
}

/// How a creation pipeline ended, as seen by its waiters.
#[derive(Clone, Debug)]
enum Outcome {
    Created,
    Failed(ExecutorError),
}

struct Release {
    function: FunctionIdentity,
    outcome: Outcome,
}

/// A creation pipeline is running for this function.
struct InFlightMarker {
    done: watch::Sender<Option<Outcome>>,
    waiters: usize,
}

/// Snapshot of the admission state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Functions with a creation pipeline running
    pub in_flight: usize,
    /// Requests waiting on one of those pipelines
    pub waiters: usize,
}

/// Everything a creation pipeline or a waiter needs.
pub(crate) struct Pipeline {
    pub(crate) resolver: EnvironmentResolver,
    pub(crate) dispatcher: BackendDispatcher,
    pub(crate) registry: Arc<dyn ServiceRegistry>,
}

impl Pipeline {
    async fn create_service_for_function(&self, function: &FunctionIdentity) -> CreationResult {
        info!("[{}] No cached function service found, creating one", function);

        let env = self.resolver.resolve(function).await?;
        // Appropriate backend handles the service creation
        self.dispatcher.create_service(function, &env).await
    }

    fn service_after_wait(&self, function: &FunctionIdentity, outcome: Outcome) -> CreationResult {
        match outcome {
            Outcome::Created => match self.registry.get_by_function(function) {
                Ok(fsvc) => Ok(Some(fsvc)),
                Err(err) => Err(ExecutorError::WaitFailed(format!(
                    "creation for {function} finished but no service is registered: {err}"
                ))),
            },
            Outcome::Failed(err) => Err(ExecutorError::WaitFailed(format!(
                "joined an in-flight creation for {function} that failed: {err}"
            ))),
        }
    }
}

/// Releases the marker of a creation task, even if the task panics.
struct ReleaseGuard {
    function: FunctionIdentity,
    releases: mpsc::UnboundedSender<Release>,
    released: bool,
}

impl ReleaseGuard {
    fn release(mut self, outcome: Outcome) {
        self.send(outcome);
    }

    fn send(&mut self, outcome: Outcome) {
        self.released = true;
        let release = Release {
            function: self.function.clone(),
            outcome,
        };
        if self.releases.send(release).is_err() {
            error!("[{}] admission task is gone, marker not released", self.function);
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if !self.released {
            let err = ExecutorError::Internal(format!(
                "creation task for {} aborted",
                self.function
            ));
            self.send(Outcome::Failed(err));
        }
    }
}

/// Handle to the admission task.
pub struct RequestCoordinator {
    commands: mpsc::UnboundedSender<Command>,
    admission: JoinHandle<()>,
}

impl RequestCoordinator {
    /// Start the admission task. Must be called inside a tokio runtime.
    pub(crate) fn start(pipeline: Arc<Pipeline>) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (releases, release_rx) = mpsc::unbounded_channel();

        let admission = Admission {
            pipeline,
            markers: HashMap::new(),
            tasks: JoinSet::new(),
            releases,
        };

        Self {
            commands,
            admission: tokio::spawn(admission.run(command_rx, release_rx)),
        }
    }

    /// Queue a creation request; the outcome is delivered to `sink`.
    pub fn submit(&self, function: FunctionIdentity, sink: ResultSink) {
        let request = CreationRequest {
            id: Uuid::new_v4(),
            function,
            respond_to: sink,
        };
        debug!("[{}] request {} submitted", request.function, request.id);

        if let Err(mpsc::error::SendError(Command::Create(request))) =
            self.commands.send(Command::Create(request))
        {
            let _ = request.respond_to.send(Err(ExecutorError::Unavailable(
                "request coordinator is shut down".to_string(),
            )));
        }
    }

    /// Submit and wait for the outcome.
    pub async fn create(&self, function: FunctionIdentity) -> CreationResult {
        let (sink, result) = oneshot::channel();
        self.submit(function.clone(), sink);
        result.await.unwrap_or_else(|_| {
            Err(ExecutorError::Internal(format!(
                "creation for {function} ended without a result"
            )))
        })
    }

    pub async fn stats(&self) -> ExecutorResult<CoordinatorStats> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Stats(tx))
            .map_err(|_| ExecutorError::Unavailable("request coordinator is shut down".to_string()))?;
        rx.await
            .map_err(|_| ExecutorError::Internal("admission task dropped stats request".to_string()))
    }

    /// Stop admitting requests and wait for every spawned task to finish.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(err) = self.admission.await {
            error!("Admission task failed: {}", err);
        }
    }
}

struct Admission {
    pipeline: Arc<Pipeline>,
    markers: HashMap<FunctionIdentity, InFlightMarker>,
    tasks: JoinSet<()>,
    releases: mpsc::UnboundedSender<Release>,
}

impl Admission {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut releases: mpsc::UnboundedReceiver<Release>,
    ) {
        let mut accepting = true;

        loop {
            tokio::select! {
                biased;

                Some(release) = releases.recv() => self.release(release),

                command = commands.recv(), if accepting => match command {
                    Some(Command::Create(request)) => self.admit(request),
                    Some(Command::Stats(tx)) => {
                        let _ = tx.send(self.stats());
                    }
                    None => {
                        info!("Request channel closed, draining {} tasks", self.tasks.len());
                        accepting = false;
                    }
                },

                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(err) = joined {
                        error!("Creation or wait task failed: {}", err);
                    }
                }
            }

            if !accepting && self.tasks.is_empty() && self.markers.is_empty() {
                break;
            }
        }

        info!("Admission task stopped");
    }

    fn admit(&mut self, request: CreationRequest) {
        let CreationRequest {
            id,
            function,
            respond_to,
        } = request;

        // is this the first one to request the function?
        if let Some(marker) = self.markers.get_mut(&function) {
            ADMISSIONS.with_label_values(&["duplicate"]).inc();
            marker.waiters += 1;
            let done = marker.done.subscribe();
            self.spawn_waiter(id, function, done, respond_to);
            return;
        }

        ADMISSIONS.with_label_values(&["miss"]).inc();
        let (done, _) = watch::channel(None);
        self.markers
            .insert(function.clone(), InFlightMarker { done, waiters: 0 });
        self.spawn_creation(id, function, respond_to);
    }

    fn spawn_creation(&mut self, id: Uuid, function: FunctionIdentity, respond_to: ResultSink) {
        let guard = ReleaseGuard {
            function: function.clone(),
            releases: self.releases.clone(),
            released: false,
        };
        let pipeline = self.pipeline.clone();

        self.tasks.spawn(async move {
            let started = Instant::now();
            let result = pipeline.create_service_for_function(&function).await;
            CREATION_LATENCY.observe(started.elapsed().as_secs_f64() * 1000.0);

            let outcome = match &result {
                Ok(_) => {
                    CREATIONS.with_label_values(&["success"]).inc();
                    Outcome::Created
                }
                Err(err) => {
                    CREATIONS.with_label_values(&["failure"]).inc();
                    warn!("[{}] request {} creation failed: {}", function, id, err);
                    Outcome::Failed(err.clone())
                }
            };

            if respond_to.send(result).is_err() {
                debug!("[{}] request {} abandoned before completion", function, id);
            }
            guard.release(outcome);
        });
    }

    fn spawn_waiter(
        &mut self,
        id: Uuid,
        function: FunctionIdentity,
        mut done: watch::Receiver<Option<Outcome>>,
        respond_to: ResultSink,
    ) {
        let pipeline = self.pipeline.clone();

        self.tasks.spawn(async move {
            info!("Waiting for concurrent request for the same function: {}", function);

            let outcome = match done.wait_for(Option::is_some).await {
                Ok(outcome) => (*outcome).clone(),
                Err(_) => None,
            };
            let result = match outcome {
                Some(outcome) => pipeline.service_after_wait(&function, outcome),
                None => Err(ExecutorError::WaitFailed(format!(
                    "creation for {function} was dropped without completing"
                ))),
            };

            if respond_to.send(result).is_err() {
                debug!("[{}] request {} abandoned while waiting", function, id);
            }
        });
    }

    /// Remove the marker and wake its waiters as one step.
    fn release(&mut self, release: Release) {
        match self.markers.remove(&release.function) {
            Some(marker) => {
                debug!(
                    "[{}] releasing marker, waking {} waiters",
                    release.function, marker.waiters
                );
                marker.done.send_replace(Some(release.outcome));
            }
            None => warn!("[{}] release without an in-flight marker", release.function),
        }
    }

    fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            in_flight: self.markers.len(),
            waiters: self.markers.values().map(|marker| marker.waiters).sum(),
        }
    }
}
