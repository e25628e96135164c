use anyhow::{Context, Result};
use goodfriend::bin_common::{
    init_logging, load_config_from_env, BinaryRunner, ConfigType, RunConfig, ShutdownSignal,
};
use goodfriend::goodfriend_client::{
    AnnouncementStream, ApiClient, ClientConfig, IdentityHasher, PlayerEventStream,
    PlayerEventStreamUpdate,
};
use goodfriend::hyperstream::StreamEvent;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Follows the player event and announcement streams and logs login
/// changes for the configured content ids
struct StreamWatcher {
    run_config: RunConfig,
    config: ClientConfig,
    api: ApiClient,
    hasher: IdentityHasher,
    shutdown: ShutdownSignal,
    updates_seen: u64,
    friends_matched: u64,
}

impl StreamWatcher {
    fn new(config: ClientConfig) -> Result<Self> {
        let api = ApiClient::from_config(&config)?;
        let hasher = config.identity_hasher()?;
        let shutdown = ShutdownSignal::new();
        shutdown.spawn_signal_handler();

        Ok(Self {
            run_config: RunConfig::new("GoodFriend Stream Watcher").with_status_interval(60),
            config,
            api,
            hasher,
            shutdown,
            updates_seen: 0,
            friends_matched: 0,
        })
    }

    async fn log_metadata(&self) {
        match self.api.get_metadata().await {
            Ok(metadata) => {
                info!(
                    "Service: {}/{} clients ({:.0}% load)",
                    metadata.connected_clients,
                    metadata.max_capacity,
                    metadata.load() * 100.0
                );
                if let Some(url) = &metadata.new_api_url {
                    warn!("Service has moved to {}", url);
                }
            }
            Err(e) => warn!("Failed to fetch metadata: {}", e),
        }
    }

    fn handle_player_event(&mut self, event: StreamEvent<PlayerEventStreamUpdate>) {
        match event {
            StreamEvent::StateChanged(state) => debug!("[players] state -> {}", state),
            StreamEvent::Connected => info!("[players] connected"),
            StreamEvent::Heartbeat => debug!("[players] heartbeat"),
            StreamEvent::Message(update) => {
                self.updates_seen += 1;
                let matched = self.hasher.find_match(
                    &self.config.watched_content_ids,
                    &update.content_id_hash,
                    &update.content_id_salt,
                );
                match matched {
                    Some(content_id) => {
                        self.friends_matched += 1;
                        info!(
                            "Friend {} {} (territory {}, world {})",
                            content_id,
                            if update.logged_in { "logged in" } else { "logged out" },
                            update.territory_id,
                            update.world_id
                        );
                    }
                    None => debug!("[players] unmatched update {}", update.hash_hex()),
                }
            }
            StreamEvent::Error(e) => warn!("[players] stream error: {}", e),
            StreamEvent::Disconnected => info!("[players] disconnected"),
        }
    }

    fn handle_announcement_event(
        &self,
        event: StreamEvent<goodfriend::goodfriend_client::AnnouncementStreamUpdate>,
    ) {
        match event {
            StreamEvent::Message(announcement) => info!(
                "[announcement:{}] {}",
                announcement.kind, announcement.message
            ),
            StreamEvent::Error(e) => warn!("[announcements] stream error: {}", e),
            StreamEvent::Connected => info!("[announcements] connected"),
            StreamEvent::Disconnected => info!("[announcements] disconnected"),
            _ => {}
        }
    }

    fn log_status(&self, players: &PlayerEventStream, announcements: &AnnouncementStream) {
        let p = players.metrics();
        let a = announcements.metrics();
        info!(
            "Status: players {} ({} msgs, {} reconnects, backoff {:?}) | announcements {} ({} msgs)",
            p.connection_state,
            p.messages_received,
            p.reconnect_count,
            p.current_backoff,
            a.connection_state,
            a.messages_received
        );
    }
}

impl BinaryRunner for StreamWatcher {
    async fn run(&mut self) -> Result<()> {
        self.log_metadata().await;

        let settings = self.config.stream_settings();
        let players = self.api.player_event_stream(settings)?;
        let announcements = self.api.announcement_stream(settings)?;
        let player_events = players.events();
        let announcement_events = announcements.events();

        players.connect()?;
        announcements.connect()?;

        let mut last_status = Instant::now();
        while self.shutdown.is_running() {
            let mut idle = true;
            while let Ok(event) = player_events.try_recv() {
                self.handle_player_event(event);
                idle = false;
            }
            while let Ok(event) = announcement_events.try_recv() {
                self.handle_announcement_event(event);
                idle = false;
            }

            if last_status.elapsed() >= self.run_config.status_interval() {
                self.log_status(&players, &announcements);
                last_status = Instant::now();
            }

            if idle {
                self.shutdown
                    .interruptible_sleep(Duration::from_millis(100))
                    .await;
            }
        }

        if let Err(e) = players.shutdown().await {
            error!("Player stream shutdown failed: {}", e);
        }
        if let Err(e) = announcements.shutdown().await {
            error!("Announcement stream shutdown failed: {}", e);
        }
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn summary(&self) -> Option<String> {
        Some(format!(
            "{} player updates, {} from watched friends",
            self.updates_seen, self.friends_matched
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging("info");

    let config_path = load_config_from_env(ConfigType::Client);
    let config = ClientConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    info!("API: {}", config.api_base_url);
    info!("Watching {} content ids", config.watched_content_ids.len());
    if config.group_key.is_empty() {
        info!("Group: public");
    } else {
        info!("Group: private");
    }

    let mut watcher = StreamWatcher::new(config)?;
    watcher.execute().await
}
