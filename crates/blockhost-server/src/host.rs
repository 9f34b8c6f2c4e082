//! Startup sequence and serving.

use std::collections::HashSet;
use std::sync::Arc;

use axum::Router;
use blockhost_block::Plugin;
use blockhost_config::HostConfig;
use blockhost_lifecycle::{ReplayReport, TriggerLifecycle};
use blockhost_runtime::PluginRuntime;
use blockhost_trigger_store::{SqliteTriggerStore, TriggerStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::error::ServerError;
use crate::routes::{PluginState, plugin_routes};

/// A prepared host: store initialized, triggers replayed, routes built.
pub struct App {
  pub router: Router,
  pub runtimes: Vec<Arc<PluginRuntime>>,
  pub lifecycle: Arc<TriggerLifecycle>,
  /// Outcome of replaying remembered triggers across all plugins.
  pub replay: ReplayReport,
}

/// Prepare a host over `store`.
///
/// The store is initialized first and any failure there aborts startup.
/// Remembered triggers of every plugin are then replayed; replay failures
/// are logged and counted in [`App::replay`]. Cancelling `cancel` ends every
/// execution started through the returned router.
#[instrument(skip_all, fields(plugins = plugins.len()))]
pub async fn build(
  store: Arc<dyn TriggerStore>,
  plugins: Vec<Arc<dyn Plugin>>,
  config: &HostConfig,
  cancel: CancellationToken,
) -> Result<App, ServerError> {
  store.initialize().await.inspect_err(|e| {
    error!(error = %e, "failed to initialize trigger store");
  })?;

  let mut seen = HashSet::new();
  for plugin in &plugins {
    let uid = &plugin.manifest().uid;
    if !seen.insert(uid.clone()) {
      return Err(ServerError::DuplicatePlugin { uid: uid.clone() });
    }
  }

  let lifecycle = Arc::new(TriggerLifecycle::new(store));
  let runtimes: Vec<Arc<PluginRuntime>> = plugins
    .into_iter()
    .map(|plugin| Arc::new(PluginRuntime::new(plugin, lifecycle.clone())))
    .collect();

  let mut replay = ReplayReport::default();
  for runtime in &runtimes {
    let report = runtime.replay(config.replay_concurrency).await;
    info!(plugin = %runtime.uid(), replayed = report.succeeded, "plugin triggers replayed");
    replay.merge(&report);
  }
  if !replay.is_clean() {
    warn!(
      failed = replay.failed,
      corrupt = replay.corrupt,
      unreadable = replay.unreadable,
      "some remembered triggers were not replayed"
    );
  }

  let mut router = Router::new();
  for runtime in &runtimes {
    let state = PluginState {
      runtime: runtime.clone(),
      cancel: cancel.clone(),
      max_body_bytes: config.max_request_body_bytes,
    };
    router = router.nest(&format!("/{}", runtime.uid()), plugin_routes(state));
  }
  let router = router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

  Ok(App {
    router,
    runtimes,
    lifecycle,
    replay,
  })
}

/// Run a host until `cancel` is triggered.
///
/// Opens the SQLite trigger store named by the config and hands it to
/// [`serve_on`].
pub async fn serve(
  config: HostConfig,
  plugins: Vec<Arc<dyn Plugin>>,
  cancel: CancellationToken,
) -> Result<(), ServerError> {
  let store = Arc::new(SqliteTriggerStore::connect(&config.database_url).await?);
  serve_on(store, config, plugins, cancel).await
}

/// Run a host over an already opened store until `cancel` is triggered.
///
/// Prepares the host with [`build`], then serves on the configured address.
/// Shutdown stops accepting connections and cancels in-flight executions.
/// The store is closed on every exit path, failed startup included.
pub async fn serve_on(
  store: Arc<SqliteTriggerStore>,
  config: HostConfig,
  plugins: Vec<Arc<dyn Plugin>>,
  cancel: CancellationToken,
) -> Result<(), ServerError> {
  let result = run(store.clone(), &config, plugins, cancel).await;
  store.close().await;
  match &result {
    Ok(()) => info!("blockhost stopped"),
    Err(e) => error!(error = %e, "blockhost stopped with an error"),
  }
  result
}

async fn run(
  store: Arc<SqliteTriggerStore>,
  config: &HostConfig,
  plugins: Vec<Arc<dyn Plugin>>,
  cancel: CancellationToken,
) -> Result<(), ServerError> {
  let app = build(store, plugins, config, cancel.clone()).await?;

  let listener = TcpListener::bind(config.listen_addr)
    .await
    .map_err(|source| ServerError::Bind {
      addr: config.listen_addr,
      source,
    })?;
  info!(addr = %config.listen_addr, "blockhost listening");

  let shutdown = cancel.clone();
  axum::serve(listener, app.router)
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(ServerError::Serve)
}
