//! Attend command - submit an attendance mark.

use console::style;

use bl_core::config::ConfigHandle;
use bl_core::error::BlResult;
use bl_models::{Actor, BookingStatus};

use crate::OutputFormat;

/// Which side of the booking the mark is submitted for.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ActorArg {
    Seeker,
    Provider,
}

impl From<ActorArg> for Actor {
    fn from(arg: ActorArg) -> Self {
        match arg {
            ActorArg::Seeker => Actor::Seeker,
            ActorArg::Provider => Actor::Provider,
        }
    }
}

pub async fn run(
    config: ConfigHandle,
    id: String,
    actor: ActorArg,
    absent: bool,
    note: Option<String>,
    format: OutputFormat,
) -> BlResult<()> {
    let stack = super::create_stack(&config).await?;
    stack.load_booking(&id).await?;

    let record = stack
        .attendance
        .submit(&id, actor.into(), !absent, note.as_deref())
        .await?;

    match record.status {
        BookingStatus::Completed => {
            println!("{}: both sides agree the session took place.", style("Completed").green());
        }
        BookingStatus::Disputed => {
            println!(
                "{}: the two marks disagree. The booking is now under review.",
                style("Disputed").yellow()
            );
        }
        _ => {
            println!("Mark recorded; waiting for the other side.");
        }
    }
    super::bookings::print_record(&record, format)?;

    Ok(())
}
