//! Booking commands.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;

use bl_api::CreateBookingRequest;
use bl_core::config::ConfigHandle;
use bl_core::error::{BlError, BlResult};
use bl_models::{BookingRecord, BookingStatus, DeliveryMode, ServiceDescriptor};
use bl_services::TriggerOutcome;

use crate::OutputFormat;

/// Status filter for booking listing.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum StatusArg {
    Requested,
    PendingPayment,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
    Disputed,
}

impl From<StatusArg> for BookingStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Requested => BookingStatus::Requested,
            StatusArg::PendingPayment => BookingStatus::PendingPayment,
            StatusArg::Confirmed => BookingStatus::Confirmed,
            StatusArg::InProgress => BookingStatus::InProgress,
            StatusArg::Completed => BookingStatus::Completed,
            StatusArg::Cancelled => BookingStatus::Cancelled,
            StatusArg::Rejected => BookingStatus::Rejected,
            StatusArg::Disputed => BookingStatus::Disputed,
        }
    }
}

#[derive(Subcommand)]
pub enum BookingsAction {
    /// List bookings visible to the authenticated actor.
    List {
        /// Only show bookings in this status.
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Show one booking in full.
    Show {
        /// Booking id.
        id: String,
    },
    /// Request a new booking from a provider.
    Create {
        /// Provider id.
        provider: String,
        /// Service name (e.g. "Boiler service").
        service: String,
        /// Service category.
        #[arg(long)]
        category: Option<String>,
        /// Scheduled start, RFC 3339 (e.g. 2026-09-03T10:00:00Z).
        #[arg(long)]
        at: String,
        /// Duration in hours.
        #[arg(long, default_value = "1")]
        hours: u32,
        /// In-person service location. Omit for a virtual session.
        #[arg(long)]
        location: Option<String>,
        /// Amount in minor units.
        #[arg(long)]
        amount: i64,
    },
    /// Accept a requested booking (provider side).
    Accept {
        /// Booking id.
        id: String,
        /// Override the amount while accepting.
        #[arg(long)]
        amount: Option<i64>,
    },
    /// Reject a requested booking (provider side).
    Reject {
        /// Booking id.
        id: String,
    },
    /// Cancel a booking with a reason.
    Cancel {
        /// Booking id.
        id: String,
        /// Cancellation reason (required).
        #[arg(short, long)]
        reason: String,
    },
    /// Refer a requested booking to another provider.
    Refer {
        /// Booking id.
        id: String,
        /// Target provider id.
        to: String,
        /// Note for the target provider.
        #[arg(short, long)]
        note: Option<String>,
    },
}

pub async fn run(config: ConfigHandle, action: BookingsAction, format: OutputFormat) -> BlResult<()> {
    let stack = super::create_stack(&config).await?;

    match action {
        BookingsAction::List { status } => {
            let mut records = stack.api.list_bookings().await?;
            if let Some(status) = status {
                let status: BookingStatus = status.into();
                records.retain(|r| r.status == status);
            }

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                OutputFormat::Text => {
                    if records.is_empty() {
                        println!("No bookings found.");
                        return Ok(());
                    }
                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .apply_modifier(UTF8_ROUND_CORNERS)
                        .set_content_arrangement(ContentArrangement::Dynamic);
                    table.set_header(vec!["Id", "Service", "Provider", "Scheduled", "Amount", "Status", "v"]);
                    for r in &records {
                        table.add_row(vec![
                            r.id.clone(),
                            super::truncate(&r.service.name, 30),
                            r.provider_id.clone(),
                            r.scheduled_at.format("%Y-%m-%d %H:%M").to_string(),
                            super::format_amount(r.amount),
                            styled_status(r.status),
                            r.version.to_string(),
                        ]);
                    }
                    println!("{table}");
                }
            }
        }
        BookingsAction::Show { id } => {
            let record = stack.load_booking(&id).await?;
            print_record(&record, format)?;
        }
        BookingsAction::Create { provider, service, category, at, hours, location, amount } => {
            let scheduled_at: DateTime<Utc> = at
                .parse()
                .map_err(|e| BlError::Config(format!("invalid --at timestamp: {e}")))?;
            let delivery = match location {
                Some(location) => DeliveryMode::InPerson { location },
                None => DeliveryMode::Virtual,
            };
            let req = CreateBookingRequest {
                provider_id: provider,
                service: ServiceDescriptor { name: service, category },
                scheduled_at,
                duration_hours: hours,
                delivery,
                amount,
            };
            let record = stack.triggers.create(&req).await?;
            println!("{} booking {}", style("Requested").green(), record.id);
            print_record(&record, format)?;
        }
        BookingsAction::Accept { id, amount } => {
            stack.load_booking(&id).await?;
            match stack.triggers.accept(&id, amount).await? {
                TriggerOutcome::Applied(record) => {
                    let verb = match record.status {
                        BookingStatus::PendingPayment => "Accepted (awaiting payment)",
                        _ => "Accepted",
                    };
                    println!("{} booking {}", style(verb).green(), record.id);
                    print_record(&record, format)?;
                }
                TriggerOutcome::Queued => println!("Offline: accept queued for replay."),
            }
        }
        BookingsAction::Reject { id } => {
            stack.load_booking(&id).await?;
            match stack.triggers.reject(&id).await? {
                TriggerOutcome::Applied(record) => {
                    println!("{} booking {}", style("Rejected").yellow(), record.id);
                }
                TriggerOutcome::Queued => println!("Offline: reject queued for replay."),
            }
        }
        BookingsAction::Cancel { id, reason } => {
            stack.load_booking(&id).await?;
            match stack.triggers.cancel(&id, &reason).await? {
                TriggerOutcome::Applied(record) => {
                    println!("{} booking {}", style("Cancelled").yellow(), record.id);
                }
                TriggerOutcome::Queued => println!("Offline: cancel queued for replay."),
            }
        }
        BookingsAction::Refer { id, to, note } => {
            stack.load_booking(&id).await?;
            let record = stack.referrals.refer(&id, &to, note.as_deref()).await?;
            println!(
                "{} booking {} to {} (chain length {})",
                style("Referred").green(),
                record.id,
                record.provider_id,
                record.referral_history.len()
            );
        }
    }

    Ok(())
}

fn styled_status(status: BookingStatus) -> String {
    let s = status.to_string();
    match status {
        BookingStatus::Confirmed | BookingStatus::Completed => style(s).green().to_string(),
        BookingStatus::InProgress => style(s).cyan().to_string(),
        BookingStatus::PendingPayment | BookingStatus::Disputed => style(s).yellow().to_string(),
        BookingStatus::Cancelled | BookingStatus::Rejected => style(s).red().to_string(),
        BookingStatus::Requested => s,
    }
}

/// Print one record in the requested format.
pub fn print_record(record: &BookingRecord, format: OutputFormat) -> BlResult<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        OutputFormat::Text => {
            println!("{}", style(&record.id).bold());
            println!("  Service:   {}", record.service.name);
            if let Some(ref category) = record.service.category {
                println!("  Category:  {category}");
            }
            println!("  Seeker:    {}", record.seeker_id);
            println!("  Provider:  {}", record.provider_id);
            println!(
                "  Scheduled: {} ({}h)",
                record.scheduled_at.format("%Y-%m-%d %H:%M UTC"),
                record.duration_hours
            );
            match &record.delivery {
                DeliveryMode::InPerson { location } => println!("  Delivery:  in person, {location}"),
                DeliveryMode::Virtual => println!("  Delivery:  virtual"),
            }
            println!("  Amount:    {}", super::format_amount(record.amount));
            println!("  Status:    {} (version {})", styled_status(record.status), record.version);
            if let Some(ref order_ref) = record.payment_order_ref {
                println!("  Order:     {order_ref}");
            }
            for entry in &record.referral_history {
                println!(
                    "  Referral:  {} -> {}{}",
                    entry.from_provider,
                    entry.to_provider,
                    entry.note.as_deref().map(|n| format!(" ({n})")).unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}
