//! Watch command - connect the realtime channel and print events.

use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use bl_api::BookingApi;
use bl_channel::{ChannelManager, EventDispatcher, HeartbeatConfig, ReconnectConfig};
use bl_core::config::ConfigHandle;
use bl_core::error::BlResult;
use bl_models::TransitionPolicy;
use bl_services::event_bus::{AppEvent, EventBus};
use bl_services::{BookingCache, SessionService, TriggerService, UpdateRouter};

pub async fn run(config: ConfigHandle) -> BlResult<()> {
    let (api, credentials) = super::create_api_client(&config).await?;
    let (actor_id, endpoint, policy, reconnect, heartbeat) = {
        let cfg = config.read().await;
        (
            cfg.server.actor_id.clone(),
            cfg.effective_realtime_endpoint().to_string(),
            TransitionPolicy::from_config(&cfg.policy),
            ReconnectConfig::from_realtime(&cfg.realtime),
            HeartbeatConfig { interval: cfg.realtime.heartbeat_interval(), ..Default::default() },
        )
    };

    let bus = EventBus::new(256);
    let cache = Arc::new(BookingCache::new(policy, bus.clone()));
    let dyn_api: Arc<dyn BookingApi> = api.clone();
    let router = Arc::new(UpdateRouter::new(
        Arc::clone(&cache),
        Arc::clone(&dyn_api),
        bus.clone(),
    ));
    let triggers = Arc::new(TriggerService::new(Arc::clone(&cache), dyn_api, bus.clone()));

    let channel = Arc::new(
        ChannelManager::new(actor_id, endpoint, credentials, EventDispatcher::new(256))
            .with_reconnect_config(reconnect)
            .with_heartbeat_config(heartbeat),
    );
    let mut session = SessionService::new(channel, router, triggers, bus.clone());

    // Seed the cache so pushed updates have a baseline to compare against.
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("loading bookings...");
    match api.list_bookings().await {
        Ok(records) => {
            spinner.set_message(format!("loaded {} booking(s), connecting...", records.len()));
            for record in records {
                cache.adopt(record).await;
            }
        }
        Err(e) => warn!("initial booking list failed: {e}"),
    }

    let mut events = bus.subscribe();
    session.startup().await?;
    spinner.finish_and_clear();
    println!("Watching for events (ctrl-c to stop)...");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("event watcher lagged, skipped {n} event(s)");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    session.shutdown_sequence().await;
    Ok(())
}

fn print_event(event: &AppEvent) {
    let stamp = chrono::Local::now().format("%H:%M:%S");
    match event {
        AppEvent::BookingChanged { booking_id, status, version } => {
            println!("{stamp} {} {booking_id} -> {status} (v{version})", style("booking").cyan());
        }
        AppEvent::PaymentReceipt { booking_id, order_ref, transaction_id } => {
            println!(
                "{stamp} {} {booking_id} order {order_ref} paid ({transaction_id})",
                style("payment").green()
            );
        }
        AppEvent::PaymentAmbiguous { booking_id, reason } => {
            println!(
                "{stamp} {} {booking_id} verification ambiguous: {reason}",
                style("payment").yellow()
            );
        }
        AppEvent::ChatMessage { room, from, body } => {
            println!("{stamp} {} [{room}] {from}: {body}", style("chat").magenta());
        }
        AppEvent::TypingChanged { room, from, is_typing } => {
            if *is_typing {
                println!("{stamp} {} [{room}] {from} is typing...", style("chat").dim());
            }
        }
        AppEvent::ConnectivityChanged { connected, detail } => {
            let label = if *connected { style("online").green() } else { style("offline").red() };
            println!("{stamp} {label} ({detail})");
        }
        AppEvent::IntentQueued { booking_id, action } => {
            println!("{stamp} {} {action} on {booking_id} queued", style("intent").yellow());
        }
        AppEvent::IntentReplayed { booking_id, action } => {
            println!("{stamp} {} {action} on {booking_id} replayed", style("intent").green());
        }
        AppEvent::IntentDropped { booking_id, action, reason } => {
            println!(
                "{stamp} {} {action} on {booking_id} dropped: {reason}",
                style("intent").red()
            );
        }
    }
}
