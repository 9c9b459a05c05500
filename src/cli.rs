//! Terminal UI: the survey, then a chat REPL, over any line reader and writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::backend::{Backend, HttpBackend};
use crate::chat::{ChatFlow, SendOutcome, render_message};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::store::{
    FileMedium, MemoryMedium, SessionMedium, SessionStorageManager, SessionStore, SurveyRecord,
};
use crate::survey::{AdvanceOutcome, SURVEY_STEP_COUNT, SurveyFlow, SurveyView};

/// How the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The user typed `/quit`.
    Quit,
    /// Input ran out.
    EndOfInput,
}

/// Build the session store the configuration asks for.
pub fn session_store(config: &ClientConfig) -> Arc<dyn SessionStore> {
    let medium: Arc<dyn SessionMedium> = match &config.session_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Using file-backed session");
            Arc::new(FileMedium::new(dir))
        }
        None => {
            info!("Using in-memory session");
            Arc::new(MemoryMedium::new())
        }
    };
    Arc::new(SessionStorageManager::new(medium))
}

/// Build the HTTP backend client.
pub fn backend(config: &ClientConfig) -> Result<Arc<dyn Backend>> {
    Ok(Arc::new(HttpBackend::new(config)?))
}

/// Run the survey, then the chat, until the user quits or input ends.
pub async fn run<R, W>(
    input: R,
    output: &mut W,
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn Backend>,
) -> Result<Exit>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    let survey_done = Arc::new(AtomicBool::new(false));
    let on_complete = {
        let survey_done = Arc::clone(&survey_done);
        Box::new(move || survey_done.store(true, Ordering::SeqCst))
    };
    let survey = SurveyFlow::hydrate(Arc::clone(&store), Arc::clone(&backend), on_complete).await;

    while let SurveyView::Step(step) = survey.view().await {
        write_line(
            output,
            &format!(
                "== {} ({}/{}) ==\nPress Enter for \"{}\" (/quit to exit)",
                step.heading(),
                step.index() + 1,
                SURVEY_STEP_COUNT,
                step.action_label()
            ),
        )
        .await?;

        match lines.next_line().await? {
            None => return Ok(Exit::EndOfInput),
            Some(line) if line.trim() == "/quit" => return Ok(Exit::Quit),
            Some(_) => {}
        }

        match survey.advance().await {
            AdvanceOutcome::Completed if survey_done.load(Ordering::SeqCst) => {
                // Later runs on the same session skip the survey.
                store.save_survey(&SurveyRecord::completed_marker()).await;
                write_line(output, "Survey complete. Thank you!").await?;
            }
            AdvanceOutcome::CompletionFailed => {
                write_line(output, "Your survey could not be submitted.").await?;
            }
            _ => {}
        }
    }

    let chat = ChatFlow::hydrate(store, backend).await;
    write_line(output, &chat.view().await.to_string()).await?;
    write_line(output, "Type a message. /retry /clear /history /quit").await?;

    while let Some(line) = lines.next_line().await? {
        let outcome = match line.trim() {
            "" => continue,
            "/quit" => return Ok(Exit::Quit),
            "/clear" => {
                chat.clear_chat().await;
                write_line(output, "Chat cleared.").await?;
                continue;
            }
            "/history" => {
                write_line(output, &chat.view().await.to_string()).await?;
                continue;
            }
            "/retry" => chat.submit_draft().await,
            _ => {
                chat.set_draft(line.as_str()).await;
                chat.submit_draft().await
            }
        };

        match outcome {
            SendOutcome::Delivered => {
                if let Some(reply) = chat.messages().await.last() {
                    write_line(output, &render_message(reply)).await?;
                }
            }
            SendOutcome::Failed { notice } => {
                write_line(output, &format!("[assistant] {notice}")).await?;
                write_line(output, "(your message was kept; /retry to send it again)").await?;
            }
            SendOutcome::Ignored => write_line(output, "Nothing to send.").await?,
            SendOutcome::Busy => write_line(output, "Still waiting for the last reply.").await?,
        }
    }

    info!("Input closed, leaving chat");
    Ok(Exit::EndOfInput)
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::StubBackend;
    use crate::store::ChatMessage;

    fn new_store() -> Arc<dyn SessionStore> {
        Arc::new(SessionStorageManager::new(Arc::new(MemoryMedium::new())))
    }

    async fn run_script(
        script: &str,
        store: Arc<dyn SessionStore>,
        backend: Arc<StubBackend>,
    ) -> (Exit, String) {
        let mut out = Vec::new();
        let exit = run(script.as_bytes(), &mut out, store, backend).await.unwrap();
        (exit, String::from_utf8(out).unwrap())
    }

    #[test]
    fn backend_rejects_bad_base_url() {
        let config = ClientConfig {
            api_base_url: "localhost:3000".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            backend(&config),
            Err(crate::error::Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn file_session_survives_a_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            session_dir: Some(dir.path().join("session")),
            ..ClientConfig::default()
        };

        session_store(&config)
            .save_chat_message(&ChatMessage::user("persisted"))
            .await;
        let history = session_store(&config).get_chat_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "persisted");
    }

    #[tokio::test]
    async fn survey_then_chat() {
        let store = new_store();
        let backend = Arc::new(StubBackend::new().complete_ok().reply("hi there"));

        let (exit, out) = run_script("\n\n\nhello\n/quit\n", Arc::clone(&store), backend.clone()).await;

        assert_eq!(exit, Exit::Quit);
        assert!(out.contains("== Health Profile (1/3) =="));
        assert!(out.contains("== Lifestyle Habits (2/3) =="));
        assert!(out.contains("\"Complete Survey\""));
        assert!(out.contains("Survey complete. Thank you!"));
        assert!(out.contains("No messages yet"));
        assert!(out.contains("[assistant] hi there"));
        assert_eq!(backend.completion_calls(), 1);
        assert_eq!(backend.chat_calls(), vec!["hello".to_string()]);
        assert_eq!(store.get_chat_history().await.len(), 2);
    }

    #[tokio::test]
    async fn completed_survey_is_skipped_on_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            session_dir: Some(dir.path().join("session")),
            ..ClientConfig::default()
        };

        let backend = Arc::new(StubBackend::new().complete_ok().reply("hi there"));
        let (_, first) = run_script("\n\n\nhello\n", session_store(&config), backend).await;
        assert!(first.contains("Survey complete. Thank you!"));

        let backend = Arc::new(StubBackend::new());
        let (exit, second) = run_script("/quit\n", session_store(&config), backend.clone()).await;

        assert_eq!(exit, Exit::Quit);
        assert!(!second.contains("Health Profile"));
        assert!(second.contains("[assistant] hi there"));
        assert_eq!(backend.completion_calls(), 0);
        assert!(session_store(&config).get_survey().await.unwrap().is_completed());
    }

    #[tokio::test]
    async fn resumes_survey_at_persisted_step() {
        let store = new_store();
        store
            .save_survey(&SurveyRecord {
                last_step: Some(2),
                data: None,
                completed: None,
            })
            .await;
        let backend = Arc::new(StubBackend::new());

        let (exit, out) = run_script("/quit\n", store, backend).await;

        assert_eq!(exit, Exit::Quit);
        assert!(out.contains("== Environmental Sensitivities (3/3) =="));
        assert!(!out.contains("Health Profile"));
    }

    #[tokio::test]
    async fn failed_completion_moves_on_to_chat() {
        let store = new_store();
        store
            .save_survey(&SurveyRecord {
                last_step: Some(2),
                data: None,
                completed: None,
            })
            .await;
        let backend = Arc::new(StubBackend::new().fail_completion(503));

        let (exit, out) = run_script("\n", Arc::clone(&store), backend).await;

        assert_eq!(exit, Exit::EndOfInput);
        assert!(out.contains("Your survey could not be submitted."));
        assert!(!out.contains("Survey complete"));
        assert!(store.get_survey().await.is_some());
    }

    #[tokio::test]
    async fn chat_commands() {
        let store = new_store();
        store.save_chat_message(&ChatMessage::user("earlier")).await;
        store
            .save_survey(&SurveyRecord {
                last_step: Some(3),
                data: None,
                completed: None,
            })
            .await;
        let backend = Arc::new(
            StubBackend::new()
                .fail_chat(500, Some("overloaded"))
                .reply("second try worked"),
        );

        let script = "hello\n/retry\n/history\n/clear\n/history\n";
        let (exit, out) = run_script(script, Arc::clone(&store), backend.clone()).await;

        assert_eq!(exit, Exit::EndOfInput);
        assert!(out.contains("[you] earlier"));
        assert!(out.contains("[assistant] overloaded"));
        assert!(out.contains("/retry to send it again"));
        assert!(out.contains("[assistant] second try worked"));
        assert!(out.contains("Chat cleared."));
        assert!(out.trim_end().ends_with("No messages yet"));
        assert_eq!(
            backend.chat_calls(),
            vec!["hello".to_string(), "hello".to_string()]
        );
        assert!(store.get_chat_history().await.is_empty());
    }
}
