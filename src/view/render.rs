use nu_ansi_term::{Color, Style};

use super::{ChatView, markdown::render_markdown};
use crate::message::{ChatMessage, Role};

pub const TYPING_INDICATOR: &str = "Typing...";
const USER_PREFIX: &str = "> ";
const ASSISTANT_PREFIX: &str = "  ";

/// Turns the transcript into terminal lines, top to bottom.
#[derive(Clone, Copy, Debug)]
pub struct Renderer {
    markdown: bool,
    color: bool,
}

impl Renderer {
    pub fn new(markdown: bool, color: bool) -> Self {
        Self { markdown, color }
    }

    pub fn render(&self, view: &ChatView) -> Vec<String> {
        self.render_messages(view.transcript().iter(), view.is_composing())
    }

    pub fn render_messages<'a>(
        &self,
        messages: impl IntoIterator<Item = &'a ChatMessage>,
        composing: bool,
    ) -> Vec<String> {
        let mut lines = Vec::new();
        for (i, message) in messages.into_iter().enumerate() {
            if i > 0 {
                lines.push(String::new());
            }
            lines.extend(self.render_message(message));
        }
        if composing {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(self.paint(Color::DarkGray.italic(), TYPING_INDICATOR));
        }
        lines
    }

    fn render_message(&self, message: &ChatMessage) -> Vec<String> {
        let (prefix, style, body) = match message.role {
            Role::User => (
                USER_PREFIX,
                Color::Blue.bold(),
                message.content.lines().map(str::to_string).collect::<Vec<_>>(),
            ),
            Role::Assistant if self.markdown => {
                (ASSISTANT_PREFIX, Style::new(), render_markdown(&message.content))
            }
            Role::Assistant => (
                ASSISTANT_PREFIX,
                Style::new(),
                message.content.lines().map(str::to_string).collect(),
            ),
        };

        if body.is_empty() {
            return vec![self.paint(style, prefix.trim_end())];
        }
        body.iter()
            .map(|line| self.paint(style, &format!("{prefix}{line}")))
            .collect()
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.color {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }
}

/// The window of lines that fits on screen, pinned to the newest content.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    height: usize,
}

impl Viewport {
    pub fn new(height: usize) -> Self {
        Self { height }
    }

    pub fn visible<'a>(&self, lines: &'a [String]) -> &'a [String] {
        let start = lines.len().saturating_sub(self.height);
        &lines[start..]
    }
}
