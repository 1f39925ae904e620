//! Start command - begin a confirmed booking with the session OTP.

use console::style;
use dialoguer::Input;

use bl_core::config::ConfigHandle;
use bl_core::error::{BlError, BlResult};
use bl_models::OtpChallengeState;

use crate::OutputFormat;

pub async fn run(
    config: ConfigHandle,
    id: String,
    otp: Option<String>,
    format: OutputFormat,
) -> BlResult<()> {
    let stack = super::create_stack(&config).await?;
    let record = stack.load_booking(&id).await?;

    if matches!(record.otp_challenge, OtpChallengeState::Outstanding { .. }) {
        println!("An OTP challenge is outstanding for this booking.");
    }

    let code = match otp {
        Some(code) => code,
        None => Input::new()
            .with_prompt("Session OTP")
            .interact_text()
            .map_err(|e| BlError::Internal(format!("prompt failed: {e}")))?,
    };

    match stack.otp.submit(&id, code.trim()).await {
        Ok(record) => {
            println!("{} booking {}", style("Started").green(), record.id);
            super::bookings::print_record(&record, format)?;
        }
        Err(BlError::OtpMismatch(_)) => {
            let used = stack.otp.attempts_used(&id).await;
            println!(
                "{}: wrong code ({used} attempt(s) used).",
                style("OTP mismatch").yellow()
            );
        }
        Err(BlError::OtpAttemptsExhausted(_)) => {
            println!(
                "{}: the OTP budget for this booking is spent. Ask the seeker for a fresh challenge.",
                style("Attempts exhausted").red()
            );
        }
        Err(e) => return Err(e),
    }

    Ok(())
}
