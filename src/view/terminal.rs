use std::{
    io::{self, Write},
    sync::Arc,
};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::Print,
    terminal::{self, Clear, ClearType},
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{
    ChatView,
    render::{Renderer, Viewport},
};
use crate::{
    config::ClientConfig,
    services::{
        backend::HttpBackend,
        session_store::{FileSessionStore, MemorySessionStore, SessionContext, SessionStore},
    },
};

const PROMPT: &str = "Type a message... ";
// Rows kept free below the transcript for the prompt.
const RESERVED_ROWS: u16 = 2;

pub const HELP: &str = "\
/reset  clear the conversation
/stop   stop the current reply
/help   show this help
/quit   exit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Reset,
    Stop,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/reset" => Command::Reset,
            "/stop" => Command::Stop,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Send(line.to_string()),
        }
    }
}

struct Screen<W: Write> {
    out: W,
}

impl<W: Write> Screen<W> {
    fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        let (_, rows) = terminal::size().unwrap_or((80, 24));
        let viewport = Viewport::new(rows.saturating_sub(RESERVED_ROWS) as usize);

        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        for line in viewport.visible(lines) {
            queue!(self.out, Print(line), Print("\n"))?;
        }
        queue!(self.out, Print("\n"), Print(PROMPT))?;
        self.out.flush()
    }

    fn notice(&mut self, text: &str) -> io::Result<()> {
        queue!(self.out, Print("\n"), Print(text), Print("\n"), Print(PROMPT))?;
        self.out.flush()
    }
}

/// Run the interactive chat until `/quit` or end of input.
pub async fn run(config: ClientConfig) -> anyhow::Result<()> {
    let store: Box<dyn SessionStore> = match &config.session_file {
        Some(path) => Box::new(FileSessionStore::new(path)),
        None => Box::new(MemorySessionStore::new()),
    };
    let session = SessionContext::bootstrap(store.as_ref()).await?;
    let backend = Arc::new(HttpBackend::new(&config)?);
    tracing::info!(user_id = session.user_id(), api_url = %backend.base_url(), "chat session ready");

    let (mut view, mut events) = ChatView::mount(session, backend, config.reset_mode).await;
    let renderer = Renderer::new(config.markdown, config.color);
    let mut screen = Screen { out: io::stdout() };
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut drawn = None;

    loop {
        if drawn != Some(view.revision()) {
            screen.draw(&renderer.render(&view))?;
            drawn = Some(view.revision());
        }

        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Command::Quit => break,
                    Command::Stop => {
                        view.stop();
                    }
                    Command::Reset => view.reset().await,
                    Command::Help => {
                        screen.notice(HELP)?;
                        continue;
                    }
                    Command::Send(text) => {
                        view.set_input(text);
                        view.submit();
                    }
                }
                // The typed line is still on screen, so redraw either way.
                drawn = None;
            }
            Some(event) = events.recv() => {
                view.apply(event);
            }
        }
    }

    view.stop();
    Ok(())
}
