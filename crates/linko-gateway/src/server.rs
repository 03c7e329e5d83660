use crate::app::App;
use crate::config::{CacheBackendArg, Config, StorageBackendArg};
use crate::state::AppState;
use linko_cache::{spawn_sweeper, MemoryCacheStore, RedisCacheStore, UrlCache};
use linko_core::retry::retry;
use linko_core::{BackgroundTasks, CacheError, CacheStore, CoreError, Repository, StorageError};
use linko_generator::{CounterHashGenerator, CounterSettings};
use linko_redirector::RedirectorService;
use linko_shortener::{persist_queue, ShortenerService, WorkerReport, WriteBehindWorker};
use linko_storage::{InMemoryRepository, MySqlRepository};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] CoreError),
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),
    #[error("cache startup failed: {0}")]
    Cache(#[from] CacheError),
    #[error("storage startup failed: {0}")]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a running gateway needs besides the HTTP listener.
pub struct Runtime {
    pub state: AppState,
    pub tasks: BackgroundTasks,
    pub shutdown: CancellationToken,
    pub worker: JoinHandle<WorkerReport>,
}

impl Runtime {
    /// Wires the pipelines on top of the given stores and starts the
    /// write-behind worker.
    pub fn start<R: Repository, S: CacheStore>(
        config: &Config,
        cache_store: Arc<S>,
        repository: Arc<R>,
    ) -> Result<Self, ServerError> {
        let length = config.code_length()?;
        let settings = config.cache_settings();
        let counter = CounterSettings::builder().length(length).build();

        let generator = Arc::new(CounterHashGenerator::new(Arc::clone(&cache_store), counter));
        let cache = UrlCache::new(cache_store, settings);
        let tasks = BackgroundTasks::new(config.background_limit);
        let shutdown = CancellationToken::new();

        let (queue, receiver) = persist_queue(config.queue_capacity);
        debug!(capacity = queue.max_capacity(), "persist queue ready");
        let worker = WriteBehindWorker::new(
            Arc::clone(&repository),
            cache.clone(),
            receiver,
            config.worker_policy(),
        );
        let worker = tokio::spawn(worker.run(shutdown.clone()));

        let shortener = ShortenerService::new(generator, cache.clone(), queue, &config.base_url);
        let redirector =
            RedirectorService::new(repository, cache, tasks.clone(), config.hit_policy());

        Ok(Self {
            state: AppState::new(Arc::new(shortener), Arc::new(redirector), length),
            tasks,
            shutdown,
            worker,
        })
    }

    /// Drains the persist queue, then waits for in-flight background work.
    pub async fn stop(self, config: &Config) {
        drop(self.state);
        self.shutdown.cancel();

        match tokio::time::timeout(config.shutdown_timeout(), self.worker).await {
            Ok(Ok(report)) => info!(
                persisted = report.persisted,
                failed = report.failed,
                "persist queue drained"
            ),
            Ok(Err(e)) => error!(error = %e, "write-behind worker panicked"),
            Err(_) => warn!("timed out draining the persist queue"),
        }

        if !self.tasks.shutdown(config.shutdown_timeout()).await {
            warn!(pending = self.tasks.len(), "abandoning background tasks");
        }
    }
}

/// Connects the configured backends and serves until a shutdown signal.
pub async fn run(config: Config) -> Result<(), ServerError> {
    config.code_length()?;
    let listener = TcpListener::bind(config.listen_addr).await?;

    match config.cache {
        CacheBackendArg::Memory => {
            let store = Arc::new(MemoryCacheStore::new());
            let sweeper = spawn_sweeper(&store, config.cache_sweep_interval());
            let result = with_storage(&config, listener, store).await;
            sweeper.abort();
            result
        }
        CacheBackendArg::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or(ServerError::MissingSetting("redis url"))?;
            let store = connect_redis(&config, url).await?;
            with_storage(&config, listener, Arc::new(store)).await
        }
    }
}

async fn with_storage<S: CacheStore>(
    config: &Config,
    listener: TcpListener,
    cache_store: Arc<S>,
) -> Result<(), ServerError> {
    match config.storage {
        StorageBackendArg::Memory => {
            serve(config, listener, cache_store, Arc::new(InMemoryRepository::new())).await
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or(ServerError::MissingSetting("mysql dsn"))?;
            let repository = MySqlRepository::connect_with_retry(
                dsn,
                config.store_timeout(),
                &config.connect_policy(),
            )
            .await?;
            repository.migrate().await?;
            info!("connected to mysql");
            serve(config, listener, cache_store, Arc::new(repository)).await
        }
    }
}

async fn connect_redis(config: &Config, url: &str) -> Result<RedisCacheStore, CacheError> {
    let timeout = config.store_timeout();
    let store = retry(
        &config.connect_policy(),
        "redis connect",
        |_| RedisCacheStore::connect(url, timeout),
        CacheError::is_transient,
    )
    .await
    .map_err(|e| e.source)?;
    info!("connected to redis");
    Ok(store)
}

async fn serve<R: Repository, S: CacheStore>(
    config: &Config,
    listener: TcpListener,
    cache_store: Arc<S>,
    repository: Arc<R>,
) -> Result<(), ServerError> {
    let runtime = Runtime::start(config, cache_store, repository)?;
    let app = App::router(runtime.state.clone());

    info!(
        listen_addr = %listener.local_addr()?,
        cache = %config.cache,
        storage = %config.storage,
        "starting linko gateway"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("http server stopped");
    runtime.stop(config).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
