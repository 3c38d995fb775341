//! Butler API server

use std::sync::Arc;

use butler_api::{openai::OpenAiReasoner, router, AppConfig, AppState, ReasoningService};
use ha_client::HaClient;
use home_state::{DeviceController, DeviceStateStore, SyncAdapter};
use schedule_engine::{ActionExecutor, ScheduleStore, Scheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "butler_api=debug,home_state=debug,schedule_engine=debug,info".into()
            }),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!("Starting Butler API server");

    let devices = Arc::new(DeviceStateStore::with_seed());
    let sync = if config.ha_live() {
        tracing::info!("Home Assistant mirroring enabled ({})", config.ha_url);
        let client = HaClient::new(&config.ha_url, &config.ha_token, config.ha_timeout)?;
        SyncAdapter::new(Arc::new(client))
    } else {
        if config.ha_enabled {
            tracing::warn!("HA_ENABLED is set but HA_TOKEN is empty; running on seed devices");
        }
        SyncAdapter::disabled()
    };

    if sync.is_enabled() {
        match sync.status().await {
            Some(status) if status.connected => {
                let synced = sync.pull_sync(&devices).await;
                tracing::info!("Synced {} devices from Home Assistant", synced);
            }
            Some(status) => tracing::warn!(
                "Home Assistant unreachable ({}); keeping seed devices",
                status.message
            ),
            None => {}
        }
    }

    let reasoner: Option<Arc<dyn ReasoningService>> = if config.openai_api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY not set; only fast-path commands will be understood");
        None
    } else {
        Some(Arc::new(OpenAiReasoner::new(
            &config.openai_base_url,
            &config.openai_api_key,
            &config.model_name,
        )?))
    };

    let schedules = Arc::new(ScheduleStore::new());
    let controller = DeviceController::new(devices.clone(), sync.clone());
    let scheduler = Arc::new(Scheduler::new(
        schedules.clone(),
        ActionExecutor::new(controller),
        config.scheduler_poll,
    ));
    let _scheduler_task = scheduler.start();

    let state = AppState::new(devices, schedules, sync, reasoner, scheduler);
    let app = router(state);

    tracing::info!("Listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
