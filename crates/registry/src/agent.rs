use crate::error::Error;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Options for creating a new [`RegistryAgent`].
#[derive(Clone, Debug)]
pub struct RegistryAgentOptions {
    /// Client used to reach the registry (usually mTLS).
    pub client: Client,

    /// Deployment the documents are registered under.
    pub deployment: Option<String>,

    /// Directory holding `*.yml` / `*.yaml` indicator documents.
    pub documents_dir: PathBuf,

    /// Time between registration passes.
    pub interval: Duration,

    /// Base URL of the registry (or a registry proxy).
    pub registry_url: String,

    /// Service the documents are registered under.
    pub service: Option<String>,
}

/// Keeps the documents in a directory registered by re-posting them on an
/// interval.
pub struct RegistryAgent {
    interval: Duration,
    registrar: Arc<Registrar>,
    shutdown_token: CancellationToken,
    task_tracker: TaskTracker,
}

struct Registrar {
    client: Client,
    documents_dir: PathBuf,
    params: Vec<(&'static str, String)>,
    register_url: String,
}

impl RegistryAgent {
    /// Creates a new instance of `RegistryAgent`.
    #[must_use]
    pub fn new(
        RegistryAgentOptions {
            client,
            deployment,
            documents_dir,
            interval,
            registry_url,
            service,
        }: RegistryAgentOptions,
    ) -> Self {
        let params = [("deployment", deployment), ("service", service)]
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value)))
            .collect();

        Self {
            interval,
            registrar: Arc::new(Registrar {
                client,
                documents_dir,
                params,
                register_url: format!("{}/v1/register", registry_url.trim_end_matches('/')),
            }),
            shutdown_token: CancellationToken::new(),
            task_tracker: TaskTracker::new(),
        }
    }

    /// Registers every document once, returning how many were accepted.
    pub async fn register_all(&self) -> usize {
        self.registrar.register_all().await
    }

    /// Starts registering immediately and then once per interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the agent was already started, the interval is
    /// zero, or the document directory cannot be read.
    pub fn start(&self) -> Result<JoinHandle<()>, Error> {
        if self.task_tracker.is_closed() {
            return Err(Error::AlreadyStarted);
        }

        if self.interval.is_zero() {
            return Err(Error::ZeroInterval);
        }

        let dir = &self.registrar.documents_dir;
        if !dir.is_dir() {
            return Err(Error::Io(
                format!("failed to read {}", dir.display()),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }

        let interval = self.interval;
        let registrar = self.registrar.clone();
        let shutdown_token = self.shutdown_token.clone();

        let join_handle = self.task_tracker.spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    () = shutdown_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let registered = registrar.register_all().await;
                debug!(registered, "registration pass complete");
            }
        });

        self.task_tracker.close();

        Ok(join_handle)
    }

    /// Stops the loop and waits for the current pass to finish.
    pub async fn shutdown(&self) {
        info!("registry agent shutting down...");

        self.shutdown_token.cancel();
        self.task_tracker.wait().await;

        info!("registry agent shutdown");
    }
}

impl Registrar {
    async fn register_all(&self) -> usize {
        let paths = match document_paths(&self.documents_dir).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "failed to list indicator documents");
                return 0;
            }
        };

        let mut registered = 0;
        for path in paths {
            match self.register(&path).await {
                Ok(()) => registered += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "failed to register indicator document"),
            }
        }

        registered
    }

    async fn register(&self, path: &Path) -> Result<(), Error> {
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Io(format!("failed to read {}", path.display()), e))?;

        let response = self
            .client
            .post(&self.register_url)
            .query(&self.params)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        debug!(path = %path.display(), "registered indicator document");

        Ok(())
    }
}

async fn document_paths(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let io_error = |e| Error::Io(format!("failed to read {}", dir.display()), e);

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yml" || ext == "yaml");

        if is_yaml && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths)
}
