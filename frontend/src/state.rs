use ai_chat_protocol::ChatMessage;
use chrono::Local;
use gloo_timers::callback::Timeout;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api;

pub const WELCOME_TEXT: &str =
    "Welcome to the campus AI assistant. I can help you find campus information quickly, ask me anything.";

const NOTICE_TIMEOUT_MS: u32 = 5_000;

/// A transient notification shown above the chat.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

/// One entry of the sidebar question history.
#[derive(Clone, Debug, PartialEq)]
pub struct QuestionEntry {
    pub id: String,
    pub title: String,
    pub time: String,
}

/// Shared application state, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct AppState {
    // --- Read signals (for components to subscribe to) ---
    pub messages: ReadSignal<Vec<ChatMessage>>,
    pub is_loading: ReadSignal<bool>,
    pub notice: ReadSignal<Option<Notice>>,

    // --- Write signals (for mutating state) ---
    pub set_messages: WriteSignal<Vec<ChatMessage>>,
    pub set_is_loading: WriteSignal<bool>,
    pub set_notice: WriteSignal<Option<Notice>>,
}

impl AppState {
    /// Create a new `AppState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let (messages, set_messages) = signal(vec![ChatMessage::system(WELCOME_TEXT)]);
        let (is_loading, set_is_loading) = signal(false);
        let (notice, set_notice) = signal(None::<Notice>);

        let state = Self {
            messages,
            is_loading,
            notice,
            set_messages,
            set_is_loading,
            set_notice,
        };

        provide_context(state);
        state
    }

    /// Show a notification that disappears on its own.
    pub fn notify(&self, title: impl Into<String>, description: impl Into<String>) {
        let set_notice = self.set_notice;
        set_notice.set(Some(Notice {
            title: title.into(),
            description: description.into(),
        }));
        Timeout::new(NOTICE_TIMEOUT_MS, move || set_notice.set(None)).forget();
    }

    /// Start over from the welcome message.
    pub fn new_conversation(&self) {
        self.set_messages.update(|msgs| msgs.truncate(1));
    }

    /// Ask a question and stream the reply into a new assistant message.
    pub fn send_message(&self, text: String) {
        let question = text.trim().to_string();
        if question.is_empty() {
            self.notify("Please enter a question", "The question cannot be empty.");
            return;
        }
        if self.is_loading.get_untracked() {
            return;
        }

        let reply = ChatMessage::assistant_placeholder();
        let reply_id = reply.id.clone();
        self.set_messages.update(|msgs| {
            msgs.push(ChatMessage::user(question.clone()));
            msgs.push(reply);
        });
        self.set_is_loading.set(true);

        let state = *self;
        spawn_local(async move {
            let result = api::ask(&question, |delta| {
                update_message(state.set_messages, &reply_id, |msg| {
                    msg.apply_delta(delta);
                });
            })
            .await;

            match result {
                Ok(()) => update_message(state.set_messages, &reply_id, ChatMessage::finish_reply),
                Err(e) => {
                    log::error!("AI chat request failed: {e}");
                    update_message(state.set_messages, &reply_id, ChatMessage::fail_reply);
                    state.notify("Request failed", e);
                }
            }
            state.set_is_loading.set(false);
        });
    }
}

/// Apply `f` to the message with the given id, if it is still shown.
fn update_message(set_messages: WriteSignal<Vec<ChatMessage>>, id: &str, f: impl FnOnce(&mut ChatMessage)) {
    set_messages.update(|msgs| {
        if let Some(msg) = msgs.iter_mut().find(|m| m.id == id) {
            f(msg);
        }
    });
}

/// The questions asked in this session, newest first.
pub fn question_history(messages: &[ChatMessage]) -> Vec<QuestionEntry> {
    let mut entries: Vec<QuestionEntry> = messages
        .iter()
        .filter(|m| m.is_user())
        .enumerate()
        .map(|(index, m)| {
            let title = m.content.trim();
            QuestionEntry {
                id: m.id.clone(),
                title: if title.is_empty() {
                    format!("Question {}", index + 1)
                } else {
                    title.to_string()
                },
                time: m.created_at.with_timezone(&Local).format("%H:%M").to_string(),
            }
        })
        .collect();
    entries.reverse();
    entries
}
