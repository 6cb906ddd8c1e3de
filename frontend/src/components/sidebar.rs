use leptos::prelude::*;

use crate::state::{question_history, AppState};

/// Sidebar with the "New conversation" button and this session's questions.
#[component]
pub fn Sidebar() -> impl IntoView {
    let state = expect_context::<AppState>();

    let history = Memo::new(move |_| question_history(&state.messages.get()));

    view! {
        <aside class="sidebar">
            <div class="sidebar-header">
                <h2>"Campus Q&A"</h2>
                <button class="new-chat-btn" on:click=move |_| state.new_conversation()>
                    "+ New conversation"
                </button>
            </div>
            <div class="conversation-list">
                {move || {
                    if history.get().is_empty() {
                        view! {
                            <div style="padding:1rem;color:var(--text-secondary);font-size:0.85rem">
                                "No questions yet, try asking the campus assistant something"
                            </div>
                        }.into_any()
                    } else {
                        view! {
                            <For
                                each=move || history.get()
                                key=|entry| entry.id.clone()
                                let:entry
                            >
                                <div class="conversation-item" title=entry.title.clone()>
                                    <div>{entry.title.clone()}</div>
                                    <div class="conversation-time">{entry.time.clone()}</div>
                                </div>
                            </For>
                        }.into_any()
                    }
                }}
            </div>
        </aside>
    }
}
