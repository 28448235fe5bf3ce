//! Server-rendered HTML for the widget.
//!
//! The browser holds no state of its own: every event is posted to the
//! server with HTMX and the returned fragment replaces `#app-root`.

use std::fmt::Write as _;

use crate::session::{Conversation, Session};
use crate::ui::chrome::{ChromeController, ThemeControl, ViewMode};
use crate::ui::transcript::{MessageLog, Transcript, Turn, TurnRole};

/// Escape text for use in element content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Full HTML document.
#[must_use]
pub fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>

    <!-- HTMX and Extensions -->
    <script src="https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js"></script>
    <script src="https://unpkg.com/htmx-ext-json-enc@2.0.1/json-enc.js"></script>

    <link rel="stylesheet" href="/static/widget.css">
</head>
<body hx-ext="json-enc">
    {content}
    <script>
        document.body.addEventListener('htmx:afterSettle', function () {{
            const anchor = document.querySelector('#chatBody [data-scroll-anchor]');
            if (anchor) anchor.scrollIntoView({{ block: 'end' }});
        }});
    </script>
</body>
</html>"#,
        title = escape_html(title),
    )
}

/// Whole page for a freshly opened session.
#[must_use]
pub fn render_page(session: &Session, send_blocked: bool) -> String {
    html_shell("Coffee Recipe Assistant", &render_widget(session, send_blocked))
}

/// The `#app-root` fragment: header, both panes, and the input row.
#[must_use]
pub fn render_widget(session: &Session, send_blocked: bool) -> String {
    let chrome = session.with_chrome(|c| c.clone());
    let (log, draft) = session.with_conversation(|c| {
        (
            render_chat_body(session.id(), c),
            c.composer.value().to_string(),
        )
    });
    let sid = session.id();
    let events = events_url(sid);

    let controls = chrome.controls();
    let header_switch = controls.first().map(|c| render_theme_switch(&events, c)).unwrap_or_default();
    let settings_switches: String = controls
        .iter()
        .skip(1)
        .map(|c| render_theme_switch(&events, c))
        .collect();

    format!(
        r##"<div id="app-root" class="chat-widget {theme}" hx-target="#app-root" hx-swap="outerHTML">
    <header class="widget-header">
        <h1>☕ Coffee Recipe Assistant</h1>
        <nav class="view-toggle">
            <button id="chatBtn" class="{chat_btn}" hx-post="{events}" hx-include="#userInput" hx-vals='{{"event":"chat_selected"}}'>Chat</button>
            <button id="settingsBtn" class="{settings_btn}" hx-post="{events}" hx-include="#userInput" hx-vals='{{"event":"settings_selected"}}'>Settings</button>
        </nav>
        {header_switch}
    </header>
    <section id="chatPane" class="pane {chat_pane}">
        <div id="chatBody" class="chat-body">{log}</div>
        <div class="input-row">
            <input id="userInput" name="message" type="text" autocomplete="off"
                placeholder="Ask for a drink recipe..." value="{draft}"
                hx-post="{events}" hx-trigger="keydown[key=='Enter']"
                hx-vals='{{"event":"key_press","key":"Enter"}}'>
            {send}
        </div>
    </section>
    <section id="settingsPane" class="pane {settings_pane}">
        <h2>Settings</h2>
        {settings_switches}
        <button id="clearChat" hx-post="{events}" hx-include="#userInput" hx-vals='{{"event":"clear_clicked"}}'>Clear chat</button>
    </section>
</div>"##,
        theme = chrome.theme().class(),
        chat_btn = active_class(&chrome, ViewMode::Chat),
        settings_btn = active_class(&chrome, ViewMode::Settings),
        chat_pane = active_class(&chrome, ViewMode::Chat),
        settings_pane = active_class(&chrome, ViewMode::Settings),
        draft = escape_html(&draft),
        send = render_send_button(sid, send_blocked, false),
    )
}

/// Send button. `oob` marks it for an out-of-band swap.
#[must_use]
pub fn render_send_button(session_id: &str, disabled: bool, oob: bool) -> String {
    format!(
        r##"<button id="sendBtn"{oob}{disabled} hx-post="{events}" hx-include="#userInput" hx-vals='{{"event":"send_clicked"}}' hx-target="#app-root" hx-swap="outerHTML">Send</button>"##,
        oob = if oob { r#" hx-swap-oob="true""# } else { "" },
        disabled = if disabled { " disabled" } else { "" },
        events = events_url(session_id),
    )
}

/// Contents of `#chatBody`: the log, plus an idle poller when a reply is
/// outstanding but no placeholder is left to wait on it.
#[must_use]
pub fn render_chat_body(session_id: &str, conversation: &Conversation) -> String {
    let mut out = render_log(session_id, conversation.transcript());
    if conversation.awaiting_unseen_reply() {
        let _ = write!(
            out,
            r##"<div id="turnPoller" hidden hx-get="/api/sessions/{session_id}/idle" hx-trigger="load" hx-target="#chatBody" hx-swap="innerHTML"></div>"##,
        );
    }
    out
}

/// Every turn of the log, in order.
#[must_use]
pub fn render_log(session_id: &str, transcript: &Transcript) -> String {
    let anchor = transcript.scroll_anchor();
    let mut out = String::new();
    for turn in transcript.turns() {
        out.push_str(&render_turn(session_id, turn, anchor == Some(turn.id)));
    }
    out
}

/// One turn. User text is escaped; assistant markup is inserted as-is.
#[must_use]
pub fn render_turn(session_id: &str, turn: &Turn, anchor: bool) -> String {
    let mut attrs = String::new();
    if anchor {
        attrs.push_str(" data-scroll-anchor");
    }
    if turn.loading {
        // Long-poll until the placeholder settles, then swap the whole log.
        let _ = write!(
            attrs,
            r##" hx-get="/api/sessions/{session_id}/turns/{id}" hx-trigger="load" hx-target="#chatBody" hx-swap="innerHTML""##,
            id = turn.id,
        );
    }

    let (class, body) = match turn.role {
        TurnRole::User => ("message user", escape_html(&turn.content)),
        TurnRole::Assistant if turn.loading => ("message bot loading", turn.content.clone()),
        TurnRole::Assistant => ("message bot", turn.content.clone()),
    };

    format!(
        r#"<div class="{class}" id="msg-{id}"{attrs}>{body}</div>"#,
        id = turn.id,
    )
}

fn render_theme_switch(events: &str, control: &ThemeControl) -> String {
    format!(
        r##"<label class="theme-switch"><input type="checkbox" id="{id}"{checked} hx-post="{events}" hx-trigger="change" hx-include="#userInput" hx-vals='js:{{"event":"theme_toggled","control":"{id}","enabled":document.getElementById("{id}").checked}}'> Dark mode</label>"##,
        id = control.id,
        checked = if control.checked { " checked" } else { "" },
    )
}

fn active_class(chrome: &ChromeController, mode: ViewMode) -> &'static str {
    if chrome.is_active(mode) { "active" } else { "" }
}

fn events_url(session_id: &str) -> String {
    format!("/api/sessions/{session_id}/events")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn user_text_is_never_markup() {
        let turn = Turn::user("<img src=x onerror=alert(1)>");
        let html = render_turn("s", &turn, false);
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn assistant_markup_is_verbatim() {
        let turn = Turn::assistant("👽 <strong>Latte</strong><ul><li>milk</li></ul>");
        let html = render_turn("s", &turn, true);
        assert!(html.contains("<strong>Latte</strong><ul><li>milk</li></ul>"));
        assert!(html.contains("data-scroll-anchor"));
        assert!(html.starts_with(r#"<div class="message bot""#));
    }

    #[test]
    fn placeholder_polls_for_settlement() {
        let turn = Turn::placeholder("👽 Preparing your recipe...");
        let html = render_turn("abc", &turn, false);
        assert!(html.contains("message bot loading"));
        assert!(html.contains(&format!("/api/sessions/abc/turns/{}", turn.id)));
        assert!(html.contains(r#"hx-trigger="load""#));
    }

    #[test]
    fn cleared_pending_reply_gets_an_idle_poller() {
        use crate::config::PersonaConfig;
        use crate::session::ConversationState;

        let state = ConversationState::new("http://proxy.test", "m", "i", "k");
        let mut conversation = Conversation::new(state, PersonaConfig::default());
        assert!(!render_chat_body("abc", &conversation).contains("turnPoller"));

        let _handle = conversation.renderer.render_loading_placeholder();
        conversation.request_started();
        assert!(!render_chat_body("abc", &conversation).contains("turnPoller"));

        conversation.renderer.clear();
        let html = render_chat_body("abc", &conversation);
        assert!(html.contains(r#"hx-get="/api/sessions/abc/idle""#));
    }

    #[test]
    fn chrome_controls_carry_the_draft() {
        let control = ThemeControl {
            id: "themeSwitch2",
            checked: false,
        };
        let html = render_theme_switch("/e", &control);
        assert!(html.contains(r##"hx-include="#userInput""##));
    }

    #[test]
    fn send_button_reflects_blocked_state() {
        assert!(render_send_button("s", true, false).contains(" disabled"));
        let oob = render_send_button("s", false, true);
        assert!(oob.contains(r#"hx-swap-oob="true""#));
        assert!(!oob.contains(" disabled"));
    }
}
