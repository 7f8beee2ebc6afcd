//! Synchronizer behavior against an in-memory store and canned providers.

mod common;

use async_trait::async_trait;
use common::{eventually, gemini_config, install_config, sync_for, Canned, Gated};
use glance_common::{notices, Message, Session};
use glance_session::{ArchiveError, ListTarget, PageSource, SessionError, UserInput};
use glance_store::{keys, MemoryStore, Store, StoreExt, WriteOptions};
use std::sync::Arc;
use std::time::Duration;

async fn stored(store: &MemoryStore, key: &str) -> Vec<Session> {
    store.load_or_default::<Vec<Session>>(key).await.unwrap().0
}

fn texts(messages: &[Message]) -> Vec<String> {
    messages.iter().map(Message::text).collect()
}

#[tokio::test]
async fn test_send_appends_question_and_reply() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let transport = Canned::answering("pong");
    let sync = sync_for("sidebar", store.clone(), transport.clone()).await;

    sync.send(UserInput::text("ping")).await.unwrap();

    let active = sync.active().await;
    assert_eq!(texts(&active.projection()), vec!["ping", "pong"]);
    assert!(active.messages.iter().all(|m| m.text() != notices::THINKING));
    assert_eq!(transport.sent(), 1);

    let history = stored(&store, keys::SESSION_HISTORY).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, active.id);
    assert_eq!(texts(&history[0].messages), vec!["ping", "pong"]);
}

#[tokio::test]
async fn test_failed_call_keeps_user_message() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sync = sync_for("sidebar", store.clone(), Canned::failing("connection refused")).await;

    sync.send(UserInput::text("ping")).await.unwrap();

    let active = sync.active().await;
    assert_eq!(
        texts(&active.projection()),
        vec![
            "ping".to_string(),
            "Error communicating with API (gemini): connection refused".to_string()
        ]
    );
    assert!(active.messages.iter().all(|m| m.text() != notices::THINKING));
    assert!(sync.snapshot().await.input_enabled);
}

#[tokio::test]
async fn test_missing_config_disables_input() {
    let store = Arc::new(MemoryStore::new());
    let transport = Canned::answering("unused");
    let sync = sync_for("sidebar", store.clone(), transport.clone()).await;

    let snapshot = sync.snapshot().await;
    assert!(!snapshot.input_enabled);
    assert_eq!(snapshot.provider_name, None);
    assert_eq!(texts(&sync.active().await.projection()), vec![notices::CONFIG_MISSING]);

    sync.send(UserInput::text("hello?")).await.unwrap();
    assert_eq!(transport.sent(), 0);
    assert_eq!(texts(&sync.active().await.projection()), vec![notices::CONFIG_MISSING]);
}

#[tokio::test]
async fn test_incomplete_config_reports_missing_key() {
    let store = Arc::new(MemoryStore::new());
    let mut config = gemini_config();
    config.credential.clear();
    install_config(&store, &config).await;
    let sync = sync_for("sidebar", store, Canned::answering("unused")).await;

    assert!(!sync.snapshot().await.input_enabled);
    assert_eq!(texts(&sync.active().await.projection()), vec![notices::CONFIG_INCOMPLETE]);

    sync.send(UserInput::text("hello?")).await.unwrap();
    assert_eq!(
        texts(&sync.active().await.projection()),
        vec![notices::CONFIG_INCOMPLETE, notices::API_KEY_MISSING]
    );
}

#[tokio::test]
async fn test_empty_input_shows_notice_only() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let transport = Canned::answering("unused");
    let sync = sync_for("sidebar", store.clone(), transport.clone()).await;

    sync.send(UserInput::text("   ")).await.unwrap();

    let active = sync.active().await;
    assert!(active.projection().is_empty());
    assert!(active
        .messages
        .iter()
        .any(|m| m.transient && m.text() == notices::EMPTY_INPUT));
    assert_eq!(transport.sent(), 0);
    assert!(stored(&store, keys::SESSION_HISTORY).await.is_empty());
}

#[tokio::test]
async fn test_selection_is_quoted_into_prompt() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let transport = Canned::answering("because");
    let sync = sync_for("sidebar", store, transport.clone()).await;

    sync.send(UserInput::text("why?").with_selection("the sky is blue"))
        .await
        .unwrap();

    let projection = sync.active().await.projection();
    assert_eq!(projection[0].text(), "(Quoted content: the sky is blue...) why?");
    assert!(transport.last_body().contains("Regarding the following quote"));
}

#[tokio::test(start_paused = true)]
async fn test_notices_expire_after_ttl() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sync = sync_for("sidebar", store, Canned::answering("unused")).await;

    let loaded = notices::config_loaded("Main", "gemini");
    assert!(sync.active().await.messages.iter().any(|m| m.text() == loaded));

    tokio::time::sleep(Duration::from_millis(2_900)).await;
    assert_eq!(sync.active().await.len(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert!(sync.active().await.is_empty());
}

#[tokio::test]
async fn test_archive_pair_marks_only_target() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sync = sync_for("sidebar", store.clone(), Canned::answering("pong")).await;
    sync.send(UserInput::text("ping")).await.unwrap();

    let messages = sync.active().await.messages;
    let answer = messages.iter().position(|m| m.text() == "pong").unwrap();
    sync.archive_pair(answer).await.unwrap();

    let archive = stored(&store, keys::ARCHIVE_STORE).await;
    assert_eq!(archive.len(), 1);
    assert_eq!(texts(&archive[0].messages), vec!["ping", "pong"]);
    assert!(archive[0].messages.iter().all(|m| !m.archived && !m.transient));

    let active = sync.active().await;
    let flagged: Vec<_> = active.messages.iter().filter(|m| m.archived).collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].text(), "pong");
    assert!(active
        .messages
        .iter()
        .any(|m| m.transient && m.text() == notices::QA_ARCHIVED));

    let history = stored(&store, keys::SESSION_HISTORY).await;
    assert!(history[0].messages[1].archived);

    let again = sync.archive_pair(answer).await;
    assert!(matches!(again, Err(ArchiveError::AlreadyArchived { .. })));
    assert_eq!(stored(&store, keys::ARCHIVE_STORE).await.len(), 1);
}

#[tokio::test]
async fn test_archive_without_question_mutates_nothing() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sync = sync_for("sidebar", store.clone(), Canned::answering("unused")).await;
    sync.push_message(sync.model_message("unprompted")).await.unwrap();

    let history_version = store.version(keys::SESSION_HISTORY).await.unwrap();
    let archive_version = store.version(keys::ARCHIVE_STORE).await.unwrap();

    let index = sync
        .active()
        .await
        .messages
        .iter()
        .position(|m| m.text() == "unprompted")
        .unwrap();
    let result = sync.archive_pair(index).await;

    assert!(matches!(result, Err(ArchiveError::NoMatchingQuestion { .. })));
    assert_eq!(store.version(keys::SESSION_HISTORY).await.unwrap(), history_version);
    assert_eq!(store.version(keys::ARCHIVE_STORE).await.unwrap(), archive_version);
    let active = sync.active().await;
    assert!(active.messages.iter().all(|m| !m.archived));
    assert!(active
        .messages
        .iter()
        .any(|m| m.transient && m.text() == notices::ARCHIVE_FAILED_NO_QUESTION));
}

#[tokio::test]
async fn test_split_archives_and_starts_fresh() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sync = sync_for("sidebar", store.clone(), Canned::answering("unused")).await;

    sync.push_message(sync.user_message("Hi")).await.unwrap();
    sync.push_message(sync.model_message("Hello")).await.unwrap();
    let before = sync.active().await.id;

    assert!(sync.split_session().await.unwrap());

    let active = sync.active().await;
    assert_ne!(active.id, before);
    assert!(active.projection().is_empty());
    assert!(active
        .messages
        .iter()
        .any(|m| m.transient && m.text() == notices::CHAT_SPLIT_ARCHIVED));

    let archive = stored(&store, keys::ARCHIVE_STORE).await;
    assert_eq!(texts(&archive[0].messages), vec!["Hi", "Hello"]);

    let history = stored(&store, keys::SESSION_HISTORY).await;
    assert_eq!(history.len(), 1);
    assert_eq!(texts(&history[0].messages), vec!["Hi", "Hello"]);

    assert!(!sync.split_session().await.unwrap());
}

#[tokio::test]
async fn test_stale_write_is_reapplied() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sidebar = sync_for("sidebar", store.clone(), Canned::answering("unused")).await;
    let archive_page = sync_for("archive-page", store.clone(), Canned::answering("unused")).await;

    sidebar.push_message(sidebar.user_message("from sidebar")).await.unwrap();
    archive_page
        .push_message(archive_page.user_message("from archive page"))
        .await
        .unwrap();

    let history = stored(&store, keys::SESSION_HISTORY).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].messages[0].text(), "from archive page");
    assert_eq!(history[1].messages[0].text(), "from sidebar");
    assert_eq!(archive_page.snapshot().await.history, history);
}

#[tokio::test]
async fn test_foreign_changes_replace_mirrors() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sidebar = sync_for("sidebar", store.clone(), Canned::answering("unused")).await;
    let watcher = sync_for("archive-page", store.clone(), Canned::answering("unused")).await;
    let handle = watcher.watch();

    sidebar.push_message(sidebar.user_message("hello")).await.unwrap();
    assert!(eventually(|| async { watcher.snapshot().await.history.len() == 1 }).await);

    sidebar.split_session().await.unwrap();
    assert!(eventually(|| async { watcher.snapshot().await.archive_count == 1 }).await);

    handle.abort();
}

#[tokio::test]
async fn test_foreign_history_is_sanitized() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let watcher = sync_for("sidebar", store.clone(), Canned::answering("unused")).await;
    let handle = watcher.watch();

    let with_status = Session::with_messages(vec![
        Message::user("kept", 1),
        Message::model("Thinking...", 2).into_transient(),
    ]);
    let only_status =
        Session::with_messages(vec![Message::model("Summarizing...", 3).into_transient()]);
    store
        .save(
            keys::SESSION_HISTORY,
            &vec![with_status.clone(), only_status],
            WriteOptions::new("other"),
        )
        .await
        .unwrap();

    assert!(eventually(|| async { watcher.snapshot().await.history.len() == 1 }).await);
    let history = watcher.snapshot().await.history;
    assert_eq!(history[0].id, with_status.id);
    assert_eq!(texts(&history[0].messages), vec!["kept"]);

    handle.abort();
}

#[tokio::test]
async fn test_queued_sends_answer_in_order() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let transport = Gated::new();
    let sync = sync_for("sidebar", store, transport.clone()).await;

    let send = |text: &'static str| {
        let sync = sync.clone();
        tokio::spawn(async move { sync.send(UserInput::text(text)).await })
    };

    let first = send("question C");
    assert!(eventually(|| async { transport.sent() == 1 }).await);
    let second = send("question A");
    tokio::time::sleep(Duration::from_millis(20)).await;
    let third = send("question B");
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Later questions wait for the turn in flight.
    assert_eq!(
        texts(&sync.active().await.projection()),
        vec!["question C"]
    );

    transport.release(3);
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    third.await.unwrap().unwrap();

    assert_eq!(
        texts(&sync.active().await.projection()),
        vec!["question C", "ok", "question A", "ok", "question B", "ok"]
    );
    let bodies = transport.bodies();
    assert_eq!(bodies.len(), 3);
    assert!(!bodies[0].contains("question A"));
    assert!(bodies[1].contains("question C"));
    assert!(bodies[1].contains("question A"));
    assert!(!bodies[1].contains("question B"));
    assert!(bodies[2].contains("question B"));
}

#[tokio::test]
async fn test_provider_change_flips_input_gate() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sync = sync_for("sidebar", store.clone(), Canned::answering("unused")).await;
    let handle = sync.watch();
    assert!(sync.snapshot().await.input_enabled);

    let mut broken = gemini_config();
    broken.model_name.clear();
    install_config(&store, &broken).await;

    assert!(eventually(|| async { !sync.snapshot().await.input_enabled }).await);
    assert!(eventually(|| async {
        sync.active()
            .await
            .projection()
            .iter()
            .any(|m| m.text() == notices::NEW_CONFIG_INCOMPLETE)
    })
    .await);
    let lines = texts(&sync.active().await.projection());
    let error_at = lines
        .iter()
        .position(|t| t == notices::NEW_CONFIG_INCOMPLETE)
        .unwrap();
    assert_eq!(
        lines[error_at + 1],
        notices::config_switched("Main", "gemini")
    );

    let fixed = gemini_config();
    install_config(&store, &fixed).await;
    assert!(eventually(|| async { sync.snapshot().await.input_enabled }).await);

    handle.abort();
}

#[tokio::test]
async fn test_clear_delete_and_resume() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sync = sync_for("sidebar", store.clone(), Canned::answering("unused")).await;

    sync.push_message(sync.user_message("first")).await.unwrap();
    let first = sync.active().await.id;
    sync.split_session().await.unwrap();
    sync.push_message(sync.user_message("second")).await.unwrap();
    let second = sync.active().await.id;

    sync.resume(first).await.unwrap();
    assert_eq!(texts(&sync.active().await.messages), vec!["first"]);

    sync.delete_history_entry(second).await.unwrap();
    let history = stored(&store, keys::SESSION_HISTORY).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, first);

    let missing = glance_common::SessionId::new();
    assert!(matches!(
        sync.delete_history_entry(missing).await,
        Err(SessionError::NotFound(id)) if id == missing
    ));

    let archived = sync.archive().await[0].id;
    sync.delete_archive_entry(archived).await.unwrap();
    assert!(stored(&store, keys::ARCHIVE_STORE).await.is_empty());

    sync.clear_history().await.unwrap();
    assert!(stored(&store, keys::SESSION_HISTORY).await.is_empty());
    let active = sync.active().await;
    assert!(active.projection().is_empty());
    assert!(active
        .messages
        .iter()
        .any(|m| m.text() == notices::ALL_HISTORY_CLEARED));
}

#[tokio::test]
async fn test_clear_all_archive() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let sync = sync_for("sidebar", store.clone(), Canned::answering("unused")).await;
    sync.push_message(sync.user_message("keep me")).await.unwrap();
    sync.split_session().await.unwrap();

    sync.clear_all(ListTarget::Archive).await.unwrap();

    assert!(stored(&store, keys::ARCHIVE_STORE).await.is_empty());
    assert_eq!(stored(&store, keys::SESSION_HISTORY).await.len(), 1);
    assert_eq!(sync.snapshot().await.archive_count, 0);
}

#[tokio::test]
async fn test_init_seeds_templates_and_active_session() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let previous = Session::with_messages(vec![Message::user("earlier", 1)]);
    store
        .save(
            keys::SESSION_HISTORY,
            &vec![previous.clone()],
            WriteOptions::new("other"),
        )
        .await
        .unwrap();

    let sync = sync_for("sidebar", store.clone(), Canned::answering("unused")).await;

    assert_eq!(sync.active().await.id, previous.id);
    let templates: Vec<glance_common::PromptTemplate> = store
        .load_or_default(keys::PROMPT_TEMPLATES)
        .await
        .unwrap()
        .0;
    assert_eq!(templates.len(), 2);
    assert_eq!(sync.snapshot().await.templates, templates);
}

struct Page(Result<String, String>);

#[async_trait]
impl PageSource for Page {
    async fn content_for_summary(&self) -> Result<String, String> {
        self.0.clone()
    }
}

#[tokio::test]
async fn test_summarize_page() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let transport = Canned::answering("a short summary");
    let sync = sync_for("sidebar", store, transport.clone()).await;

    sync.summarize_page(&Page(Ok("Some page text".into())))
        .await
        .unwrap();

    assert_eq!(
        texts(&sync.active().await.projection()),
        vec![
            "Summary request: Current page (Content length: 14)",
            "a short summary"
        ]
    );
    let body = transport.last_body();
    assert!(body.contains("Please summarize the main content of the following text"));
    assert!(body.contains("Some page text"));
    assert!(sync
        .active()
        .await
        .messages
        .iter()
        .all(|m| m.text() != "(Thinking...)"));
}

#[tokio::test]
async fn test_summarize_page_failures() {
    let store = Arc::new(MemoryStore::new());
    install_config(&store, &gemini_config()).await;
    let transport = Canned::answering("unused");
    let sync = sync_for("sidebar", store, transport.clone()).await;

    sync.summarize_page(&Page(Ok("   ".into()))).await.unwrap();
    sync.summarize_page(&Page(Err("tab is gone".into())))
        .await
        .unwrap();

    assert_eq!(
        texts(&sync.active().await.projection()),
        vec![
            notices::SUMMARY_REQUEST_CURRENT_PAGE,
            notices::PAGE_CONTENT_EMPTY,
            notices::SUMMARY_REQUEST_CURRENT_PAGE,
            "Summary error: tab is gone"
        ]
    );
    assert_eq!(transport.sent(), 0);
}
