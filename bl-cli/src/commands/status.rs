//! Status command - show configuration and server reachability.

use console::style;

use bl_core::config::ConfigHandle;
use bl_core::error::BlResult;

use crate::OutputFormat;

/// Run the status command.
pub async fn run(config: ConfigHandle, format: OutputFormat) -> BlResult<()> {
    let cfg = config.read().await.clone();

    let latency_ms = match super::create_api_client(&config).await {
        Ok((api, _)) => api.health_check().await.ok().map(|d| d.as_millis()),
        Err(_) => None,
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "server": cfg.server.base_url,
                "actor_id": cfg.server.actor_id,
                "realtime_endpoint": cfg.effective_realtime_endpoint(),
                "reachable": latency_ms.is_some(),
                "latency_ms": latency_ms,
                "policy": {
                    "referral_chain_cap": cfg.policy.referral_chain_cap,
                    "attendance_timeout_hours": cfg.policy.attendance_timeout_hours,
                    "otp_max_attempts": cfg.policy.otp_max_attempts,
                },
            });
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        OutputFormat::Text => {
            println!("{}", style("Connection").bold().underlined());
            println!("  Server:   {}", cfg.server.base_url);
            println!("  Actor:    {}", cfg.server.actor_id);
            println!("  Realtime: {}", cfg.effective_realtime_endpoint());
            println!(
                "  Status:   {}",
                match latency_ms {
                    Some(ms) => format!("{} ({ms}ms)", style("reachable").green()),
                    None => style("unreachable").red().to_string(),
                }
            );

            println!();
            println!("{}", style("Policy").bold().underlined());
            println!("  Referral chain cap:  {}", cfg.policy.referral_chain_cap);
            println!("  Attendance timeout:  {}h", cfg.policy.attendance_timeout_hours);
            println!("  OTP attempt budget:  {}", cfg.policy.otp_max_attempts);
        }
    }

    Ok(())
}
