//! Chat history behavior against a file-backed database.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use ggchat_core::domain::chat::{NewChat, NewMessage, Sender, placeholder_title};
use ggchat_core::{ChatHistoryError, ChatHistoryRepository};
use ggchat_db::{SqliteChatHistoryRepository, setup_database};
use sqlx::Row;
use tempfile::TempDir;

async fn open(dir: &TempDir) -> (sqlx::SqlitePool, Arc<SqliteChatHistoryRepository>) {
    let pool = setup_database(&dir.path().join("ggchat.db")).await.unwrap();
    let repo = Arc::new(SqliteChatHistoryRepository::new(pool.clone()));
    (pool, repo)
}

async fn placeholder_chat(repo: &SqliteChatHistoryRepository, id: &str) {
    repo.create_chat(NewChat {
        id: id.to_string(),
        title: placeholder_title(Utc::now()),
        model_used: None,
    })
    .await
    .unwrap();
}

fn message(chat_id: &str, sender: Sender, content: &str) -> NewMessage {
    NewMessage {
        chat_id: chat_id.to_string(),
        sender,
        content: content.to_string(),
    }
}

#[tokio::test]
async fn messages_are_ordered_and_scoped_to_their_chat() {
    let dir = TempDir::new().unwrap();
    let (_pool, repo) = open(&dir).await;
    placeholder_chat(&repo, "a").await;
    placeholder_chat(&repo, "b").await;

    for i in 0..10 {
        let chat = if i % 2 == 0 { "a" } else { "b" };
        let sender = if i % 4 < 2 { Sender::User } else { Sender::Assistant };
        repo.append_message(message(chat, sender, &format!("m{i}")))
            .await
            .unwrap();
    }

    for chat in ["a", "b"] {
        let messages = repo.list_messages(chat).await.unwrap();
        assert_eq!(messages.len(), 5);
        assert!(messages.iter().all(|m| m.chat_id == chat));
        assert!(
            messages
                .windows(2)
                .all(|w| (w[0].created_at.as_str(), w[0].id) <= (w[1].created_at.as_str(), w[1].id))
        );
    }
}

#[tokio::test]
async fn delete_cascades_to_messages() {
    let dir = TempDir::new().unwrap();
    let (pool, repo) = open(&dir).await;
    placeholder_chat(&repo, "doomed").await;
    placeholder_chat(&repo, "kept").await;
    repo.append_message(message("doomed", Sender::User, "one"))
        .await
        .unwrap();
    repo.append_message(message("doomed", Sender::Assistant, "two"))
        .await
        .unwrap();
    repo.append_message(message("kept", Sender::User, "three"))
        .await
        .unwrap();

    assert!(repo.delete_chat("doomed").await.unwrap());

    let err = repo.list_messages("doomed").await.unwrap_err();
    assert!(matches!(err, ChatHistoryError::ChatNotFound(_)));

    let orphans: i64 = sqlx::query("SELECT COUNT(*) AS n FROM messages WHERE chat_id = 'doomed'")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    assert_eq!(orphans, 0);
    assert_eq!(repo.list_messages("kept").await.unwrap().len(), 1);
}

#[tokio::test]
async fn first_user_message_names_the_chat() {
    let dir = TempDir::new().unwrap();
    let (_pool, repo) = open(&dir).await;
    placeholder_chat(&repo, "c").await;

    let long = "word ".repeat(40);
    repo.append_message(message("c", Sender::User, &long))
        .await
        .unwrap();

    let chat = repo.get_chat("c").await.unwrap().unwrap();
    assert!(chat.title.chars().count() <= 50);
    assert!(chat.title.starts_with("word word"));
    assert!(!chat.title.ends_with(' '));
}

#[tokio::test]
async fn list_chats_puts_recent_activity_first() {
    let dir = TempDir::new().unwrap();
    let (_pool, repo) = open(&dir).await;
    placeholder_chat(&repo, "first").await;
    placeholder_chat(&repo, "second").await;

    repo.append_message(message("first", Sender::User, "bump"))
        .await
        .unwrap();

    let ids: Vec<String> = repo
        .list_chats()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, ["first", "second"]);
}

#[tokio::test]
async fn concurrent_first_messages_rename_exactly_once() {
    let dir = TempDir::new().unwrap();
    let (_pool, repo) = open(&dir).await;
    placeholder_chat(&repo, "race").await;

    let appends = (0..8).map(|i| {
        let repo = Arc::clone(&repo);
        async move {
            repo.append_message(message("race", Sender::User, &format!("question {i}")))
                .await
        }
    });
    for result in join_all(appends).await {
        result.unwrap();
    }

    let messages = repo.list_messages("race").await.unwrap();
    assert_eq!(messages.len(), 8);

    // The title comes from whichever append landed first
    let chat = repo.get_chat("race").await.unwrap().unwrap();
    assert_eq!(chat.title, messages[0].content);
    assert_eq!(chat.last_modified_at, messages[7].created_at);
}

#[tokio::test]
async fn data_survives_reopening() {
    let dir = TempDir::new().unwrap();
    {
        let (pool, repo) = open(&dir).await;
        placeholder_chat(&repo, "persisted").await;
        repo.append_message(message("persisted", Sender::User, "still here?"))
            .await
            .unwrap();
        pool.close().await;
    }

    let (_pool, repo) = open(&dir).await;
    let messages = repo.list_messages("persisted").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "still here?");
}
