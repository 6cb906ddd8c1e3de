use ai_chat_protocol::{ChatMessage, MessageRole};
use leptos::ev;
use leptos::prelude::*;

use crate::state::AppState;

/// Main chat area with the notification banner, message list, and input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <main class="chat-area">
            {move || {
                state.notice.get().map(|notice| {
                    view! {
                        <div class="error-banner">
                            <strong>{notice.title}</strong>
                            <div>{notice.description}</div>
                        </div>
                    }
                })
            }}

            <div class="chat-header">
                <span>"Campus AI Assistant"</span>
                <span class="chat-status">"Live conversation"</span>
            </div>

            <div class="messages-container">
                {move || {
                    let loading = state.is_loading.get();
                    state
                        .messages
                        .get()
                        .into_iter()
                        .map(|msg| view! { <MessageBubble message=msg loading=loading /> })
                        .collect_view()
                }}
            </div>

            <ChatInput />
        </main>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(message: ChatMessage, loading: bool) -> impl IntoView {
    let css_class = match message.role {
        MessageRole::User => "message user",
        MessageRole::Assistant => "message assistant",
        MessageRole::System => "message system",
    };
    let pending = loading && message.role == MessageRole::Assistant && message.content.is_empty();

    view! {
        <div class=css_class>
            <div class="role-label">{message.role.as_str()}</div>
            {if pending {
                view! { <div class="streaming-cursor">"Generating…"</div> }.into_any()
            } else {
                view! { <div>{message.content}</div> }.into_any()
            }}
        </div>
    }
}

/// Chat input form with textarea and send button.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());

    let is_sending = move || state.is_loading.get();

    let send = move || {
        if is_sending() {
            return;
        }
        let text = input.get_untracked();
        if !text.trim().is_empty() {
            set_input.set(String::new());
        }
        state.send_message(text);
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="4"
                    placeholder="Ask about campus information, course schedules, student services… (Enter to send, Shift+Enter for newline)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                    disabled=is_sending
                />
                <button class="send-btn" on:click=move |_| send() disabled=is_sending>
                    {move || if is_sending() { "Generating…" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}
