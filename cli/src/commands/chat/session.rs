//! # Chat Session Loop
//!
//! File: cli/src/commands/chat/session.rs
//!
//! ## Overview
//!
//! The read-route-print loop behind `furhi chat`. It is generic over its
//! input and output so tests can drive it with scripted lines.
//!
//! Each ordinary line is routed through `ChatRouter::take_turn` with the
//! current `ConversationContext`; the returned context replaces the old one
//! and the turn is appended to the `HistoryStore`.
//!
use crate::bot::context::ConversationContext;
use crate::bot::reply::Reply;
use crate::bot::router::ChatRouter;
use crate::core::error::Result;
use crate::services::history::HistoryStore;
use crate::services::image::{decode_data_uri, extension_for_mime};
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Input that wipes the history file and the in-memory context.
pub const CLEAR_COMMAND: &str = "/clear_chat_history";
/// Inputs that end the session (compared case-insensitively).
pub const EXIT_WORDS: [&str; 3] = ["bye", "exit", "quit"];
/// Reply printed and saved when the user leaves.
pub const SESSION_FAREWELL: &str = "Have a nice day! 👋";

/// Runs the session until an exit word or end of input and returns the final
/// context.
pub async fn run_session<R, W>(
    router: &ChatRouter,
    store: &HistoryStore,
    mut context: ConversationContext,
    image_dir: &Path,
    reader: R,
    writer: &mut W,
) -> Result<ConversationContext>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = reader.lines();
    let mut saved_images = 0;

    loop {
        write!(writer, "You: ")?;
        writer.flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            debug!("Input closed, ending session");
            writeln!(writer)?;
            break;
        };
        let input = line.trim();

        if input.eq_ignore_ascii_case(CLEAR_COMMAND) {
            store.clear().await?;
            context.reset();
            writeln!(writer, "🧹 Chat history cleared!\n")?;
            continue;
        }

        if EXIT_WORDS.iter().any(|word| input.eq_ignore_ascii_case(word)) {
            writeln!(writer, "Bot: {}", SESSION_FAREWELL)?;
            store.append(input, SESSION_FAREWELL).await?;
            context.push_user(input);
            context.push_assistant(SESSION_FAREWELL);
            break;
        }

        let (next, reply) = router.take_turn(context, input).await;
        context = next;

        writeln!(writer, "Bot: {}", reply.display_text())?;
        save_images(&reply, image_dir, &mut saved_images, writer).await?;
        writeln!(writer)?;

        store.append(input, reply.display_text()).await?;
    }

    Ok(context)
}

/// Writes every image of a multimodal reply to `image_dir`. Undecodable
/// images are reported and skipped. `saved` numbers images across the whole
/// session; existing files are never overwritten.
async fn save_images<W: Write>(
    reply: &Reply,
    image_dir: &Path,
    saved: &mut usize,
    writer: &mut W,
) -> Result<()> {
    if reply.images().is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(image_dir)
        .await
        .with_context(|| format!("Failed to create image directory: {}", image_dir.display()))?;

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    for (index, uri) in reply.images().iter().enumerate() {
        let (mime, bytes) = match decode_data_uri(uri) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Skipping image {}: {:#}", index + 1, e);
                writeln!(writer, "⚠️  Could not decode image {}", index + 1)?;
                continue;
            }
        };
        let (path, mut file) =
            create_unique(image_dir, stamp, saved, extension_for_mime(&mime)).await?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("Failed to write image: {}", path.display()))?;
        file.flush().await?;
        writeln!(writer, "🖼️  Saved image to {}", path.display())?;
    }
    Ok(())
}

/// Creates the next `furhi_<stamp>_<n>.<ext>` file that does not exist yet.
async fn create_unique(
    dir: &Path,
    stamp: u64,
    saved: &mut usize,
    extension: &str,
) -> Result<(PathBuf, tokio::fs::File)> {
    loop {
        *saved += 1;
        let path = dir.join(format!("furhi_{}_{}.{}", stamp, saved, extension));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("{} exists, trying the next name", path.display());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create image: {}", path.display()));
            }
        }
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::context::ChatMessage;
    use crate::bot::rules::{RuleSet, GREETING_RESPONSE};
    use crate::services::completion::TextCompletion;
    use crate::services::image::{encode_data_uri, ImageGenerator, ImageResult};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Echoes the number of messages it was given.
    struct CountingCompletion {
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl TextCompletion for CountingCompletion {
        fn name(&self) -> &'static str {
            "Groq"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.lock().unwrap().push(messages.len());
            Ok(format!("seen {}", messages.len()))
        }
    }

    struct OnePixel;

    #[async_trait]
    impl ImageGenerator for OnePixel {
        async fn generate(&self, prompt: &str) -> ImageResult {
            ImageResult {
                prompt: prompt.to_string(),
                images: vec![encode_data_uri("image/png", b"\x89PNG")],
            }
        }
    }

    struct Fixture {
        _dir: TempDir,
        router: ChatRouter,
        completion: Arc<CountingCompletion>,
        store: HistoryStore,
        image_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let completion = Arc::new(CountingCompletion {
            calls: Mutex::default(),
        });
        let router = ChatRouter::new(
            RuleSet::standard().unwrap(),
            completion.clone(),
            Arc::new(OnePixel),
        );
        let store = HistoryStore::new(dir.path().join("chat_history.txt"));
        let image_dir = dir.path().join("images");
        Fixture {
            _dir: dir,
            router,
            completion,
            store,
            image_dir,
        }
    }

    async fn run(f: &Fixture, context: ConversationContext, script: &str) -> (ConversationContext, String) {
        let mut output = Vec::new();
        let context = run_session(
            &f.router,
            &f.store,
            context,
            &f.image_dir,
            script.as_bytes(),
            &mut output,
        )
        .await
        .unwrap();
        (context, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn turns_are_printed_and_persisted() {
        let f = fixture();
        let (context, output) = run(&f, ConversationContext::new("sys"), "hello\nwhat is rust?\n").await;

        assert!(output.contains(&format!("Bot: {}", GREETING_RESPONSE)));
        assert!(output.contains("Bot: seen 4"));
        assert_eq!(context.turn_count(), 4);
        assert_eq!(*f.completion.calls.lock().unwrap(), vec![4]);

        let saved = f.store.load().await.unwrap();
        assert_eq!(
            saved,
            vec![
                ChatMessage::user("hello"),
                ChatMessage::assistant(GREETING_RESPONSE),
                ChatMessage::user("what is rust?"),
                ChatMessage::assistant("seen 4"),
            ]
        );
    }

    #[tokio::test]
    async fn exit_word_stops_before_remaining_input() {
        let f = fixture();
        let (_, output) = run(&f, ConversationContext::new("sys"), "QUIT\nwhat is rust?\n").await;

        assert!(output.contains(SESSION_FAREWELL));
        assert!(f.completion.calls.lock().unwrap().is_empty());
        let saved = f.store.load().await.unwrap();
        assert_eq!(
            saved,
            vec![ChatMessage::user("QUIT"), ChatMessage::assistant(SESSION_FAREWELL)]
        );
    }

    #[tokio::test]
    async fn exit_word_must_be_exact() {
        let f = fixture();
        let (_, output) = run(&f, ConversationContext::new("sys"), "quit it\n").await;
        assert!(!output.contains(SESSION_FAREWELL));
        assert_eq!(f.completion.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_command_resets_file_and_context() {
        let f = fixture();
        f.store.append("old", "turn").await.unwrap();
        let context = ConversationContext::with_history("sys", f.store.load().await.unwrap());
        assert_eq!(context.turn_count(), 2);

        let (context, output) = run(&f, context, "/clear_chat_history\nwhat now?\n").await;

        assert!(output.contains("Chat history cleared"));
        // Only the system message and the new question reached the model.
        assert_eq!(*f.completion.calls.lock().unwrap(), vec![2]);
        assert_eq!(context.turn_count(), 2);
        let saved = f.store.load().await.unwrap();
        assert_eq!(saved[0], ChatMessage::user("what now?"));
        assert_eq!(saved.len(), 2);
    }

    #[tokio::test]
    async fn image_replies_are_saved_to_disk() {
        let f = fixture();
        let (_, output) = run(&f, ConversationContext::new("sys"), "generate image of a cat\n").await;

        assert!(output.contains("Bot: Here's the image for: of a cat"));
        assert!(output.contains("Saved image to"));
        let mut entries = std::fs::read_dir(&f.image_dir).unwrap();
        let entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().extension().unwrap(), "png");
        assert_eq!(std::fs::read(entry.path()).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn image_turns_never_overwrite_each_other() {
        let f = fixture();
        std::fs::create_dir_all(&f.image_dir).unwrap();
        // A file left by an earlier session with a matching name.
        let stamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        for s in [stamp, stamp + 1] {
            std::fs::write(f.image_dir.join(format!("furhi_{}_1.png", s)), b"old").unwrap();
        }

        let (_, output) = run(
            &f,
            ConversationContext::new("sys"),
            "generate image of a cat\ngenerate image of a dog\n",
        )
        .await;

        assert_eq!(output.matches("Saved image to").count(), 2);
        let files: Vec<_> = std::fs::read_dir(&f.image_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 4);
        let fresh = files
            .iter()
            .filter(|path| std::fs::read(path).unwrap() == b"\x89PNG")
            .count();
        assert_eq!(fresh, 2);
    }

    #[tokio::test]
    async fn end_of_input_ends_session() {
        let f = fixture();
        let (context, _) = run(&f, ConversationContext::new("sys"), "").await;
        assert_eq!(context.turn_count(), 0);
        assert!(f.store.load().await.unwrap().is_empty());
    }
}
