//! Payment order commands.

use clap::Subcommand;
use console::style;

use bl_api::PaymentProof;
use bl_core::config::ConfigHandle;
use bl_core::error::{BlError, BlResult};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum PayAction {
    /// Create (or return the existing) payment order for a booking.
    Order {
        /// Booking id.
        id: String,
    },
    /// Submit payment proof for verification. Exactly one attempt.
    Verify {
        /// Booking id.
        id: String,
        /// Gateway transaction id.
        #[arg(short, long)]
        transaction: String,
        /// Gateway signature over the transaction.
        #[arg(short, long)]
        signature: String,
    },
}

pub async fn run(config: ConfigHandle, action: PayAction, format: OutputFormat) -> BlResult<()> {
    let stack = super::create_stack(&config).await?;

    match action {
        PayAction::Order { id } => {
            stack.load_booking(&id).await?;
            let order_ref = stack.payments.ensure_order(&id).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "orderRef": order_ref }));
                }
                OutputFormat::Text => {
                    println!("Payment order for {id}: {}", style(&order_ref).bold());
                }
            }
        }
        PayAction::Verify { id, transaction, signature } => {
            stack.load_booking(&id).await?;
            let proof = PaymentProof { transaction_id: transaction, signature };
            match stack.payments.verify(&id, &proof).await {
                Ok(receipt) => match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&receipt)?);
                    }
                    OutputFormat::Text => {
                        println!("{} booking {}", style("Payment verified").green(), id);
                        println!("  Order:       {}", receipt.order_ref);
                        println!("  Amount:      {}", super::format_amount(receipt.amount));
                        println!("  Transaction: {}", receipt.transaction_id);
                    }
                },
                Err(BlError::PaymentVerificationAmbiguous { booking_id, reason }) => {
                    println!(
                        "{}: verification for {booking_id} did not complete ({reason}).",
                        style("Ambiguous").yellow().bold()
                    );
                    println!("The payment may or may not have gone through.");
                    println!("Confirm the transaction with the gateway before retrying.");
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(())
}
