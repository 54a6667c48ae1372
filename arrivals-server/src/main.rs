use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arrivals_server::cache::ScheduleCacheConfig;
use arrivals_server::feeds::{MetroClient, MetroConfig};
use arrivals_server::poller::{Poller, PollerConfig};
use arrivals_server::query::ArrivalsQuery;
use arrivals_server::reconcile::ReconcileConfig;
use arrivals_server::snapshot::SnapshotStore;
use arrivals_server::stations::StationTable;
use arrivals_server::web::{AppState, create_router};

/// A snapshot older than a few missed live cycles is surfaced as stale.
const MISSED_CYCLES_BEFORE_STALE: u32 = 3;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Get credentials from environment
    let username = std::env::var("METRO_API_USERNAME").unwrap_or_else(|_| {
        warn!("METRO_API_USERNAME not set, feed fetches will fail");
        String::new()
    });
    let password = std::env::var("METRO_API_PASSWORD").unwrap_or_else(|_| {
        warn!("METRO_API_PASSWORD not set, feed fetches will fail");
        String::new()
    });

    // Build the station reference table and feed client
    let stations = Arc::new(StationTable::network());
    info!(stations = stations.len(), "loaded station table");

    let client = MetroClient::new(MetroConfig::new(&username, &password))
        .expect("failed to create metro client");

    // Snapshot store, stale once a few live cycles have been missed
    let poller_config = PollerConfig::for_table(&stations);
    let stale_after = poller_config.track_interval * MISSED_CYCLES_BEFORE_STALE;
    let store = Arc::new(SnapshotStore::new(stale_after));

    // Spawn the per-feed polling tasks
    let poller = Arc::new(Poller::new(
        Arc::new(client),
        stations.clone(),
        store.clone(),
        poller_config,
        ReconcileConfig::default(),
        &ScheduleCacheConfig::default(),
    ));
    poller.spawn();

    // Build the query surface and router
    let query = ArrivalsQuery::new(store, stations);
    let app = create_router(AppState::new(query));

    // Bind and serve
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("arrivals board listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app).await.expect("server error");
}
