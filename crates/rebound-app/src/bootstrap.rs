use std::sync::Arc;
use std::time::Instant;

use crate::error::{AppError, AppResult};
use rebound_api::{ApiServer, LiveCatalog, SharedCatalog};
use rebound_config::Settings;
use rebound_core::{LegacyClientMatcher, MirrorBases, PinningRules, RedirectEngine};
use rebound_data::{CatalogSnapshot, CatalogStore, CatalogWatcher, SnapshotHandle};
use rebound_telemetry::{
    GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging, log_format_from_name,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const ENV_BUILD_SHA: &str = "REBOUND_BUILD_SHA";

/// Dependencies required to bootstrap the bounce service.
pub(crate) struct BootstrapDependencies {
    settings: Settings,
    telemetry: Metrics,
    store: CatalogStore,
    snapshot: CatalogSnapshot,
    watcher: CatalogWatcher,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) async fn from_env() -> AppResult<Self> {
        let settings =
            Settings::from_env().map_err(|err| AppError::config("settings.from_env", err))?;
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let store = CatalogStore::new(&settings.database_url)
            .await
            .map_err(|err| AppError::data("catalog_store.new", err))?;
        let (snapshot, watcher) = store
            .watch(settings.refresh_interval)
            .await
            .map_err(|err| AppError::data("catalog_store.watch", err))?;

        Ok(Self {
            settings,
            telemetry,
            store,
            snapshot,
            watcher,
        })
    }
}

/// Entry point for the bounce service boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or service startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env().await?;
    Box::pin(run_app_with(dependencies)).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies {
        settings,
        telemetry,
        store,
        snapshot,
        watcher,
    } = dependencies;

    let build_sha = std::env::var(ENV_BUILD_SHA).unwrap_or_else(|_| "dev".to_string());
    let format =
        log_format_from_name(settings.log_format.as_deref()).unwrap_or_else(LogFormat::infer);
    init_logging(&LoggingConfig {
        level: &settings.log_filter,
        format,
        build_sha: &build_sha,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("rebound");

    info!("Bounce service bootstrap starting");
    record_catalog_shape(&telemetry, &snapshot);
    info!(
        products = snapshot.catalog.product_count(),
        aliases = snapshot.catalog.alias_count(),
        "catalog loaded"
    );

    let snapshots = SnapshotHandle::new(snapshot);
    let refresh_task = spawn_refresh_task(watcher, snapshots.clone(), telemetry.clone());

    let engine = redirect_engine(&settings)?;
    let catalog: SharedCatalog = Arc::new(LiveCatalog::new(snapshots, store));
    let addr = settings.bind_addr;
    let api = ApiServer::new(
        catalog,
        engine,
        telemetry,
        settings.pin_https_header,
        settings.cache_max_age_secs,
    );

    info!(addr = %addr, "Launching bounce listener");
    let serve_result = api.serve(addr).await;

    if !refresh_task.is_finished() {
        refresh_task.abort();
    }
    match refresh_task.await {
        Err(err) if !err.is_cancelled() => {
            warn!(error = %err, "catalog refresh task join failed");
        }
        _ => {}
    }

    serve_result.map_err(|err| AppError::serve("api_server.serve", err))?;
    info!("Bounce service shutdown complete");
    Ok(())
}

/// Assemble the redirect engine from resolved settings.
fn redirect_engine(settings: &Settings) -> AppResult<RedirectEngine> {
    let matcher =
        LegacyClientMatcher::new().map_err(|err| AppError::engine("legacy_matcher.new", err))?;
    Ok(RedirectEngine::new(
        PinningRules::default(),
        matcher,
        MirrorBases::new(
            settings.mirror_http_host.clone(),
            settings.mirror_https_host.clone(),
        ),
        settings.stub_root_url.clone(),
        settings.fallback_url.clone(),
    ))
}

/// Reload the catalog on the configured interval, publishing each fresh
/// snapshot through the shared handle. A failed reload keeps the previous
/// snapshot in place and counts the failure.
fn spawn_refresh_task(
    watcher: CatalogWatcher,
    snapshots: SnapshotHandle,
    telemetry: Metrics,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            watcher.tick().await;
            let reload_started = Instant::now();
            match watcher.reload().await {
                Ok(snapshot) => {
                    telemetry.observe_catalog_refresh_latency(reload_started.elapsed());
                    record_catalog_shape(&telemetry, &snapshot);
                    debug!(
                        products = snapshot.catalog.product_count(),
                        aliases = snapshot.catalog.alias_count(),
                        "catalog refreshed"
                    );
                    snapshots.replace(snapshot).await;
                }
                Err(err) => {
                    telemetry.inc_catalog_refresh_failure();
                    warn!(error = %err, "catalog refresh failed; serving the previous snapshot");
                }
            }
        }
    })
}

fn record_catalog_shape(telemetry: &Metrics, snapshot: &CatalogSnapshot) {
    telemetry.set_catalog_products(gauge_value(snapshot.catalog.product_count()));
    telemetry.set_catalog_aliases(gauge_value(snapshot.catalog.alias_count()));
}

fn gauge_value(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use rebound_core::{Outcome, ProductCatalog, RequestParams};

    use super::*;

    fn sample_settings() -> AppResult<Settings> {
        Settings::from_lookup(|name| match name {
            "REBOUND_DATABASE_URL" => Some("postgres://localhost/bounce".to_string()),
            "REBOUND_MIRROR_HTTP_HOST" => Some("download.example.net".to_string()),
            "REBOUND_MIRROR_HTTPS_HOST" => Some("download-ssl.example.net".to_string()),
            "REBOUND_STUB_ROOT_URL" => Some("https://stubs.example.net/builds".to_string()),
            _ => None,
        })
        .map_err(|err| AppError::config("settings.from_lookup", err))
    }

    #[test]
    fn redirect_engine_builds_from_settings() -> AppResult<()> {
        let settings = sample_settings()?;
        let engine = redirect_engine(&settings)?;

        let catalog = ProductCatalog::builder()
            .location("Firefox-43.0.1", false, "win", "/firefox/:lang/setup.exe")
            .build();
        let outcome = engine
            .resolve(
                &catalog,
                &RequestParams::new(Some("firefox-43.0.1"), None, None),
                "Mozilla/5.0 (Windows NT 10.0; rv:43.0) Gecko/20100101 Firefox/43.0",
                false,
            )
            .map_err(|err| AppError::engine("engine.resolve", err))?;
        assert!(matches!(outcome, Outcome::Redirect { .. }));
        Ok(())
    }

    #[test]
    fn catalog_shape_is_recorded_in_gauges() -> AppResult<()> {
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let catalog = ProductCatalog::builder()
            .alias("firefox-latest", "Firefox-43.0.1")
            .location("Firefox-43.0.1", false, "win", "/firefox/:lang/setup.exe")
            .location(
                "Thunderbird-38.5.0",
                false,
                "win",
                "/thunderbird/:lang/setup.exe",
            )
            .build();

        record_catalog_shape(&telemetry, &CatalogSnapshot::new(catalog));

        let shape = telemetry.snapshot();
        assert_eq!(shape.catalog_products, 2);
        assert_eq!(shape.catalog_aliases, 1);
        Ok(())
    }

    #[test]
    fn gauge_value_saturates_on_overflow() {
        assert_eq!(gauge_value(3), 3);
        assert_eq!(gauge_value(usize::MAX), i64::MAX);
    }
}
