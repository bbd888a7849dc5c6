//! Generate Command
//!
//! Run one prompt through the pipeline and print the reporter's message.
//!
//! Usage:
//!   pixelrelay generate a cute cat
//!   pixelrelay generate --json "oil portrait of a fox"

use tokio_util::sync::CancellationToken;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::generation::render;
use crate::types::Result;

pub async fn run(prompt: &str, json: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let service = ctx.generation_service()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling request");
            on_interrupt.cancel();
        }
    });

    let outcome = service.handle_with_cancel(prompt, &cancel).await;
    let message = render(&outcome);

    if json {
        let value = serde_json::json!({
            "outcome": outcome.label(),
            "url": outcome.url(),
            "message": message,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        Output::new().outcome(&outcome, &message);
    }

    Ok(())
}
