use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

const CODE_INDENT: &str = "    ";
const QUOTE_BAR: &str = "│ ";
const RULE: &str = "────────────────";

/// Lay out markdown as plain terminal lines.
pub fn render_markdown(source: &str) -> Vec<String> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut writer = LineWriter::default();
    for event in Parser::new_ext(source, options) {
        writer.handle(event);
    }
    writer.finish()
}

#[derive(Default)]
struct LineWriter {
    lines: Vec<String>,
    current: String,
    quote_depth: usize,
    // One counter per open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    in_code_block: bool,
    link_dest: Option<String>,
}

impl LineWriter {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.in_code_block => {
                for line in text.lines() {
                    self.push_line(format!("{CODE_INDENT}{line}"));
                }
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.current.push_str(&text)
            }
            Event::Code(code) => {
                self.current.push('`');
                self.current.push_str(&code);
                self.current.push('`');
            }
            Event::SoftBreak => self.current.push(' '),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.push_line(RULE.to_string());
                self.blank();
            }
            Event::TaskListMarker(done) => {
                self.current.push_str(if done { "[x] " } else { "[ ] " })
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::BlockQuote { .. } => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.in_code_block = true;
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.current = format!("{}{marker}", "  ".repeat(depth));
            }
            Tag::Link { dest_url, .. } => self.link_dest = Some(dest_url.to_string()),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::BlockQuote { .. } => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.blank();
            }
            TagEnd::Item => self.flush(),
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Link => {
                if let Some(dest) = self.link_dest.take() {
                    self.current.push_str(&format!(" ({dest})"));
                }
            }
            _ => {}
        }
    }

    fn flush(&mut self) {
        let line = std::mem::take(&mut self.current);
        if !line.trim().is_empty() {
            self.push_line(line);
        }
    }

    fn push_line(&mut self, line: String) {
        let prefix = QUOTE_BAR.repeat(self.quote_depth);
        self.lines.push(format!("{prefix}{line}"));
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
