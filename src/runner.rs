//! Per-case lifecycle: a registered case starts running when its receiver and
//! scrape target are listening, and is evaluated once the window closes.
//!
//! Starting and supervising the sender under test is up to the caller; the
//! runner only owns the endpoints the sender talks to and the case deadline.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cases::TestCase;
use crate::config::RunSettings;
use crate::http::{build_exposition_router, build_router, AppState};
use crate::storage::{Batch, BatchStore, MemoryBatches};

/// How long in-flight requests may take to finish once a window has closed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A case whose endpoints are live and collecting batches.
pub struct RunningCase {
    case: TestCase,
    store: Arc<MemoryBatches>,
    shutdown: watch::Sender<bool>,
    servers: Vec<JoinHandle<io::Result<()>>>,
    receiver_addr: SocketAddr,
    exposition_addr: SocketAddr,
}

impl RunningCase {
    /// Bind the receiver and the scrape target for `case` and start serving.
    ///
    /// Each call gets a fresh, empty batch store.
    ///
    /// # Parameters
    ///
    /// - `case` - Case to run
    /// - `receiver` - Address for the remote write receiver
    /// - `exposition` - Address for the scrape target
    ///
    /// # Errors
    ///
    /// Returns an I/O error if either address cannot be bound.
    pub async fn start(
        case: TestCase,
        receiver: SocketAddr,
        exposition: SocketAddr,
    ) -> io::Result<Self> {
        let store = Arc::new(MemoryBatches::new());
        let state = AppState::builder()
            .with_batches(store.clone())
            .with_behavior(case.receiver)
            .build()?;

        let receiver_listener = TcpListener::bind(receiver).await?;
        let exposition_listener = TcpListener::bind(exposition).await?;
        let receiver_addr = receiver_listener.local_addr()?;
        let exposition_addr = exposition_listener.local_addr()?;

        let (shutdown, _) = watch::channel(false);
        let servers = vec![
            spawn_server(receiver_listener, build_router(state), &shutdown),
            spawn_server(exposition_listener, build_exposition_router(case.exposition), &shutdown),
        ];

        info!(
            case = case.name,
            "running: scrape http://{exposition_addr}/metrics, write to http://{receiver_addr}/api/v1/write"
        );

        Ok(Self { case, store, shutdown, servers, receiver_addr, exposition_addr })
    }

    pub fn case(&self) -> &TestCase {
        &self.case
    }

    /// Address the receiver is bound to.
    pub fn receiver_addr(&self) -> SocketAddr {
        self.receiver_addr
    }

    /// Address the scrape target is bound to.
    pub fn exposition_addr(&self) -> SocketAddr {
        self.exposition_addr
    }

    /// Close both endpoints and return the batches received.
    ///
    /// Requests still in flight get [`SHUTDOWN_GRACE`] to finish; after that
    /// they are abandoned and their payloads are never stored.
    pub async fn close(self) -> (TestCase, Vec<Batch>) {
        self.shutdown.send_replace(true);

        for server in self.servers {
            let abort = server.abort_handle();
            match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => warn!(case = self.case.name, "server error: {}", e),
                Ok(Err(e)) => warn!(case = self.case.name, "server task failed: {}", e),
                Err(_) => {
                    warn!(case = self.case.name, "abandoning in-flight requests");
                    abort.abort();
                }
            }
        }

        (self.case, self.store.snapshot())
    }
}

fn spawn_server(
    listener: TcpListener,
    router: axum::Router,
    shutdown: &watch::Sender<bool>,
) -> JoinHandle<io::Result<()>> {
    let mut closed = shutdown.subscribe();
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                // Sender dropped counts as shutdown too.
                let _ = closed.wait_for(|closed| *closed).await;
            })
            .await
    })
}

/// Verdict of one evaluated case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub passed: bool,
    pub batches: usize,
    pub samples: usize,
    pub failures: Vec<String>,
}

/// Evaluate a case against the batches received while it ran.
pub fn evaluate(case: &TestCase, batches: &[Batch], tolerance: f64) -> CaseReport {
    let failures: Vec<String> =
        case.evaluate(batches, tolerance).iter().map(ToString::to_string).collect();
    let report = CaseReport {
        name: case.name.to_string(),
        passed: failures.is_empty(),
        batches: batches.len(),
        samples: batches.iter().map(Batch::len).sum(),
        failures,
    };

    if report.passed {
        info!(case = case.name, batches = report.batches, "passed");
    } else {
        for failure in &report.failures {
            warn!(case = case.name, "{}", failure);
        }
    }
    report
}

/// Run one case for the configured window and evaluate it.
///
/// # Errors
///
/// Returns an I/O error if the endpoints cannot be bound.
pub async fn run_case(case: TestCase, settings: &RunSettings) -> io::Result<CaseReport> {
    let running =
        RunningCase::start(case, settings.receiver_addr, settings.exposition_addr).await?;
    tokio::time::sleep(settings.window).await;
    let (case, batches) = running.close().await;
    Ok(evaluate(&case, &batches, settings.tolerance))
}

/// Run every case in turn. A case that fails, or cannot start, never stops the rest.
pub async fn run_all(cases: &[TestCase], settings: &RunSettings) -> Summary {
    let mut summary = Summary::default();
    for case in cases {
        let report = match run_case(*case, settings).await {
            Ok(report) => report,
            Err(e) => {
                warn!(case = case.name, "could not start: {}", e);
                CaseReport {
                    name: case.name.to_string(),
                    passed: false,
                    batches: 0,
                    samples: 0,
                    failures: vec![format!("could not start: {e}")],
                }
            }
        };
        summary.cases.push(report);
    }
    summary
}

/// Verdicts of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub cases: Vec<CaseReport>,
}

impl Summary {
    /// Whether every case passed.
    pub fn passed(&self) -> bool {
        self.cases.iter().all(|c| c.passed)
    }

    /// Number of failed cases.
    pub fn failed(&self) -> usize {
        self.cases.iter().filter(|c| !c.passed).count()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            let verdict = if case.passed { "PASS" } else { "FAIL" };
            writeln!(
                f,
                "{verdict} {} ({} batches, {} samples)",
                case.name, case.batches, case.samples
            )?;
            for failure in &case.failures {
                writeln!(f, "    {failure}")?;
            }
        }
        write!(f, "{}/{} cases passed", self.cases.len() - self.failed(), self.cases.len())
    }
}
