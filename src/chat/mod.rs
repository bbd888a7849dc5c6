//! Chat Command Router
//!
//! Platform-neutral handling of chat messages:
//!
//! - `!upload` with attachments: store each file and index it
//! - `!recall <keyword>`: reply with up to five matching files, newest first
//! - `!generate <prompt>`: run the generation pipeline
//! - a message mentioning the bot: its remaining text is a generation prompt,
//!   or the help text when nothing is left
//!
//! The platform adapter turns gateway events into [`ChatMessage`] and sends
//! back whatever [`Reply`] values come out.

use std::ops::Range;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::constants::chat as chat_constants;
use crate::generation::{GenerationService, render};
use crate::storage::{FileIndex, FileStore, SharedDatabase};

/// How the bot is addressed in message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: String,
    pub username: String,
}

impl BotIdentity {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }

    /// Byte ranges of every mention of the bot, in order. `@username` only
    /// counts when it stands as a whole word.
    fn mention_spans(&self, content: &str) -> Vec<Range<usize>> {
        let mut spans: Vec<Range<usize>> = Vec::new();

        for token in [format!("<@{}>", self.id), format!("<@!{}>", self.id)] {
            spans.extend(
                content
                    .match_indices(token.as_str())
                    .map(|(start, m)| start..start + m.len()),
            );
        }

        if !self.username.is_empty() {
            let token = format!("@{}", self.username);
            spans.extend(
                content
                    .match_indices(token.as_str())
                    .map(|(start, m)| start..start + m.len())
                    .filter(|span| {
                        let before = content[..span.start].chars().next_back();
                        let after = content[span.end..].chars().next();
                        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
                    }),
            );
        }

        spans.sort_by_key(|span| span.start);
        spans
    }

    /// Whether `content` addresses the bot
    pub fn is_mentioned_in(&self, content: &str) -> bool {
        !self.mention_spans(content).is_empty()
    }

    /// `content` with every mention of the bot removed
    pub fn strip_mentions(&self, content: &str) -> String {
        let mut out = String::with_capacity(content.len());
        let mut last = 0;
        for span in self.mention_spans(content) {
            if span.start < last {
                continue;
            }
            out.push_str(&content[last..span.start]);
            out.push(' ');
            last = span.end;
        }
        out.push_str(&content[last..]);

        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// File attached to a message, already downloaded by the adapter
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatMessage {
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
    pub attachments: Vec<Attachment>,
    /// Permalink to the message, recorded with uploads
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload,
    Recall(String),
    Generate(String),
    Help,
}

impl Command {
    /// Parse message text. `None` when the message is not meant for the bot.
    pub fn parse(content: &str, bot: &BotIdentity) -> Option<Self> {
        if let Some(rest) = content.strip_prefix(chat_constants::PREFIX) {
            let mut words = rest.split_whitespace();
            let name = words.next()?.to_lowercase();
            let args = words.collect::<Vec<_>>().join(" ");

            return match name.as_str() {
                "upload" => Some(Self::Upload),
                "recall" => Some(Self::Recall(args)),
                "generate" => Some(Self::Generate(args)),
                _ => None,
            };
        }

        if bot.is_mentioned_in(content) {
            let prompt = bot.strip_mentions(content);
            return Some(if prompt.is_empty() {
                Self::Help
            } else {
                Self::Generate(prompt)
            });
        }

        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    File { path: PathBuf, caption: String },
}

impl Reply {
    fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

pub fn help_text(bot: &BotIdentity) -> String {
    format!(
        "👋 Hello! To generate an image, mention me followed by your prompt. Example: <@{id}> a cute cat\n\n\
         **Commands:**\n\
         - `!upload` - Upload a file (attach the file to your message)\n\
         - `!recall <keyword>` - Search and retrieve uploaded files by keyword\n\
         - `!generate <prompt>` - Generate an image based on your prompt",
        id = bot.id
    )
}

/// Executes parsed commands against the pipeline and file storage
pub struct ChatHandler {
    bot: BotIdentity,
    service: GenerationService,
    db: SharedDatabase,
    store: FileStore,
    recall_limit: usize,
}

impl ChatHandler {
    pub fn new(
        bot: BotIdentity,
        service: GenerationService,
        db: SharedDatabase,
        store: FileStore,
    ) -> Self {
        Self {
            bot,
            service,
            db,
            store,
            recall_limit: chat_constants::RECALL_LIMIT,
        }
    }

    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit;
        self
    }

    pub async fn handle(&self, message: &ChatMessage) -> Vec<Reply> {
        self.handle_with_cancel(message, &CancellationToken::new())
            .await
    }

    /// `cancel` aborts an in-flight generation, e.g. when the message is deleted
    #[instrument(skip_all, fields(author = %message.author_id))]
    pub async fn handle_with_cancel(
        &self,
        message: &ChatMessage,
        cancel: &CancellationToken,
    ) -> Vec<Reply> {
        if message.author_is_bot {
            return Vec::new();
        }

        let Some(command) = Command::parse(&message.content, &self.bot) else {
            return Vec::new();
        };

        info!(?command, "Handling chat command");

        match command {
            Command::Upload => self.upload(message),
            Command::Recall(keyword) => self.recall(&keyword),
            Command::Generate(prompt) => {
                let outcome = self.service.handle_with_cancel(&prompt, cancel).await;
                vec![Reply::Text(render(&outcome))]
            }
            Command::Help => vec![Reply::Text(help_text(&self.bot))],
        }
    }

    fn upload(&self, message: &ChatMessage) -> Vec<Reply> {
        if message.attachments.is_empty() {
            return vec![Reply::text("❌ No file attached!")];
        }

        let index = FileIndex::new(&self.db);

        message
            .attachments
            .iter()
            .map(|attachment| {
                let saved = self.store.save(&attachment.name, &attachment.data).and_then(|path| {
                    index.save_file(
                        &message.author_id,
                        &attachment.name,
                        &path.to_string_lossy(),
                        message.link.as_deref(),
                    )
                });

                match saved {
                    Ok(_) => Reply::Text(format!("✅ Saved: `{}`", attachment.name)),
                    Err(e) => {
                        error!(file = %attachment.name, error = %e, "Failed to save upload");
                        Reply::text("❌ Failed to save file.")
                    }
                }
            })
            .collect()
    }

    fn recall(&self, keyword: &str) -> Vec<Reply> {
        if keyword.trim().is_empty() {
            return vec![Reply::text("📝 Provide a search term!")];
        }

        let records = match FileIndex::new(&self.db).search_files(keyword, self.recall_limit) {
            Ok(records) => records,
            Err(e) => {
                error!(keyword, error = %e, "File search failed");
                return vec![Reply::text("❌ Error searching files.")];
            }
        };

        if records.is_empty() {
            return vec![Reply::text("🔍 No files found.")];
        }

        records
            .into_iter()
            .map(|record| {
                let path = PathBuf::from(&record.file_path);
                if self.store.exists(&path) {
                    Reply::File {
                        path,
                        caption: format!(
                            "📄 Found: `{}` (Uploaded by <@{}>)",
                            record.filename, record.user_id
                        ),
                    }
                } else {
                    Reply::Text(format!("❌ File `{}` not found on disk.", record.filename))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::generation::RateBudget;
    use crate::generation::client::testing::{MockClient, MockReply};
    use crate::storage::Database;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn bot() -> BotIdentity {
        BotIdentity::new("123", "pixelbot")
    }

    #[test]
    fn test_parse_prefix_commands() {
        let bot = bot();
        assert_eq!(Command::parse("!upload", &bot), Some(Command::Upload));
        assert_eq!(Command::parse("!UPLOAD now", &bot), Some(Command::Upload));
        assert_eq!(
            Command::parse("!recall  quarterly   report", &bot),
            Some(Command::Recall("quarterly report".into()))
        );
        assert_eq!(Command::parse("!recall", &bot), Some(Command::Recall(String::new())));
        assert_eq!(
            Command::parse("! generate a red fox", &bot),
            Some(Command::Generate("a red fox".into()))
        );
        assert_eq!(Command::parse("!dance", &bot), None);
        assert_eq!(Command::parse("!", &bot), None);
    }

    #[test]
    fn test_parse_mentions() {
        let bot = bot();
        assert_eq!(
            Command::parse("<@123> a cute cat", &bot),
            Some(Command::Generate("a cute cat".into()))
        );
        assert_eq!(
            Command::parse("hey @pixelbot draw a boat", &bot),
            Some(Command::Generate("hey draw a boat".into()))
        );
        assert_eq!(Command::parse("<@!123>", &bot), Some(Command::Help));
        assert_eq!(Command::parse("  <@123>  ", &bot), Some(Command::Help));
        assert_eq!(Command::parse("just chatting", &bot), None);
        assert_eq!(Command::parse("<@999> hello", &bot), None);
    }

    #[test]
    fn test_username_mention_needs_word_boundary() {
        let bot = bot();
        assert!(!bot.is_mentioned_in("hey @pixelbotty"));
        assert_eq!(bot.strip_mentions("hey @pixelbotty"), "hey @pixelbotty");
        assert_eq!(Command::parse("hey @pixelbotty", &bot), None);
        assert!(!bot.is_mentioned_in("mail me@pixelbot.example"));

        assert!(bot.is_mentioned_in("@pixelbot, draw a boat"));
        assert_eq!(
            Command::parse("@pixelbot, draw a boat", &bot),
            Some(Command::Generate(", draw a boat".into()))
        );
        assert_eq!(
            bot.strip_mentions("@pixelbot @pixelbotty <@123>"),
            "@pixelbotty"
        );
    }

    #[test]
    fn test_prefix_wins_over_mention() {
        assert_eq!(
            Command::parse("!recall <@123>", &bot()),
            Some(Command::Recall("<@123>".into()))
        );
    }

    struct Harness {
        _dir: TempDir,
        client: Arc<MockClient>,
        db: SharedDatabase,
        handler: ChatHandler,
    }

    fn harness(client: MockClient) -> Harness {
        let dir = TempDir::new().unwrap();
        let client = Arc::new(client);

        let mut config = Config::default();
        config.generation.providers = vec!["model-a".into()];
        config.generation.backoff_base_ms = 1;
        let budget = Arc::new(RateBudget::new(5, Duration::from_secs(60)));
        let service = GenerationService::with_client(&config, client.clone(), budget);

        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let db: SharedDatabase = Arc::new(db);

        let handler = ChatHandler::new(
            bot(),
            service,
            db.clone(),
            FileStore::new(dir.path().join("file_storage")),
        );

        Harness {
            _dir: dir,
            client,
            db,
            handler,
        }
    }

    fn message(content: &str) -> ChatMessage {
        ChatMessage {
            author_id: "42".into(),
            content: content.into(),
            link: Some("https://chat.example/m/1".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bot_authors_ignored() {
        let h = harness(MockClient::new());
        let mut msg = message("!generate cat");
        msg.author_is_bot = true;

        assert!(h.handler.handle(&msg).await.is_empty());
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mention_without_prompt_replies_help() {
        let h = harness(MockClient::new());
        let replies = h.handler.handle(&message("<@123>")).await;

        assert_eq!(replies.len(), 1);
        assert!(matches!(&replies[0], Reply::Text(t) if t.contains("!recall <keyword>")));
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_generate_replies_with_url() {
        let h = harness(
            MockClient::new().script("model-a", vec![MockReply::image("https://cdn.x/cat.png")]),
        );
        let replies = h.handler.handle(&message("!generate a cute cat")).await;

        assert_eq!(
            replies,
            vec![Reply::Text("🖼️ Generated Image: https://cdn.x/cat.png".into())]
        );
    }

    #[tokio::test]
    async fn test_generate_without_prompt() {
        let h = harness(MockClient::new());
        let replies = h.handler.handle(&message("!generate   ")).await;

        assert_eq!(replies, vec![Reply::Text("🖼️ Provide a prompt!".into())]);
        assert!(h.client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_upload_without_attachment() {
        let h = harness(MockClient::new());
        let replies = h.handler.handle(&message("!upload")).await;
        assert_eq!(replies, vec![Reply::Text("❌ No file attached!".into())]);
    }

    #[tokio::test]
    async fn test_upload_then_recall() {
        let h = harness(MockClient::new());

        let mut upload = message("!upload");
        upload.attachments = vec![
            Attachment {
                name: "budget-2025.xlsx".into(),
                data: b"cells".to_vec(),
            },
            Attachment {
                name: "notes.txt".into(),
                data: b"text".to_vec(),
            },
        ];
        let replies = h.handler.handle(&upload).await;
        assert_eq!(
            replies,
            vec![
                Reply::Text("✅ Saved: `budget-2025.xlsx`".into()),
                Reply::Text("✅ Saved: `notes.txt`".into()),
            ]
        );
        assert_eq!(FileIndex::new(&h.db).count().unwrap(), 2);

        let replies = h.handler.handle(&message("!recall budget")).await;
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            Reply::File { path, caption } => {
                assert!(path.ends_with("budget-2025.xlsx"));
                assert_eq!(std::fs::read(path).unwrap(), b"cells");
                assert_eq!(caption, "📄 Found: `budget-2025.xlsx` (Uploaded by <@42>)");
            }
            other => panic!("expected file reply, got {:?}", other),
        }

        let record = &FileIndex::new(&h.db).search_files("notes", 5).unwrap()[0];
        assert_eq!(record.message_link.as_deref(), Some("https://chat.example/m/1"));
    }

    #[tokio::test]
    async fn test_recall_reports_missing_file() {
        let h = harness(MockClient::new());
        FileIndex::new(&h.db)
            .save_file("7", "ghost.png", "/nonexistent/ghost.png", None)
            .unwrap();

        let replies = h.handler.handle(&message("!recall ghost")).await;
        assert_eq!(
            replies,
            vec![Reply::Text("❌ File `ghost.png` not found on disk.".into())]
        );
    }

    #[tokio::test]
    async fn test_recall_edge_cases() {
        let h = harness(MockClient::new());

        let replies = h.handler.handle(&message("!recall")).await;
        assert_eq!(replies, vec![Reply::Text("📝 Provide a search term!".into())]);

        let replies = h.handler.handle(&message("!recall nothing")).await;
        assert_eq!(replies, vec![Reply::Text("🔍 No files found.".into())]);
    }

    #[tokio::test]
    async fn test_recall_respects_limit() {
        let h = harness(MockClient::new());
        let index = FileIndex::new(&h.db);
        for i in 0..8 {
            index
                .save_file("7", &format!("pic-{}.png", i), "/nonexistent", None)
                .unwrap();
        }

        let replies = h.handler.handle(&message("!recall pic")).await;
        assert_eq!(replies.len(), 5);
    }
}
