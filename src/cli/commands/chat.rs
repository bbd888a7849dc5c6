//! Chat Command
//!
//! Line-oriented console adapter for the command router: every stdin line is
//! handled as a chat message from `--user`. Useful for exercising `!recall`,
//! `!generate` and mentions without a chat platform.

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::{BotIdentity, ChatHandler, ChatMessage, Reply};
use crate::cli::util::CommandContext;
use crate::types::Result;

pub async fn run(user: &str, bot_name: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let service = ctx.generation_service()?;
    let bot = BotIdentity::new("0", bot_name);

    let handler = ChatHandler::new(bot, service, ctx.db.clone(), ctx.store.clone())
        .with_recall_limit(ctx.config.storage.recall_limit);

    println!("Type a message (e.g. `@{} a cute cat`), Ctrl-D to quit.", bot_name);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let message = ChatMessage {
            author_id: user.to_string(),
            content: line,
            ..Default::default()
        };

        for reply in handler.handle(&message).await {
            match reply {
                Reply::Text(text) => println!("{}", text),
                Reply::File { path, caption } => println!("{}\n  {}", caption, path.display()),
            }
        }
    }

    Ok(())
}
