//! Telegram MarkdownV2 rendering of applications.

use crate::domain::{Application, QuestionKey, UserId};

/// Characters Telegram MarkdownV2 requires to be escaped outside entities.
pub const MARKDOWN_V2_SPECIALS: &str = "_*[]()~`>#+-=|{}.!";

const QUESTION_LABELS: [&str; QuestionKey::COUNT as usize] =
    ["PUBG ID", "Age", "Game modes", "Activity", "About"];

const QUESTION_PROMPTS: [&str; QuestionKey::COUNT as usize] = [
    "Send your PUBG ID",
    "How old are you?",
    "Which game modes do you play?",
    "How often are you online?",
    "Tell us a little about yourself",
];

/// Prefix every MarkdownV2 special character with a backslash.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIALS.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Clickable mention that works without a username.
pub fn user_mention(user_id: UserId) -> String {
    format!("[ID{id}](tg://user?id={id})", id = user_id.0)
}

pub fn question_label(key: QuestionKey) -> &'static str {
    QUESTION_LABELS[usize::from(key.index() - 1)]
}

/// Plain-text prompt asking for the answer to `key`.
pub fn question_prompt(key: QuestionKey) -> &'static str {
    QUESTION_PROMPTS[usize::from(key.index() - 1)]
}

/// Review report for admins. Unanswered questions render empty.
pub fn render_application(application: &Application) -> String {
    let mut out = format!(
        "Application №{} from user {}:\n\nCurrent status: {}\n",
        application.id,
        user_mention(application.user_id),
        escape_markdown(application.status.as_str()),
    );
    for key in QuestionKey::all() {
        let answer = application
            .answers
            .get(&key)
            .map(|a| escape_markdown(&a.text))
            .unwrap_or_default();
        out.push_str(&format!("{key}\\) {}: {answer}\n", question_label(key)));
    }
    out
}
