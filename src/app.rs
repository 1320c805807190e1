use std::io;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
};
use tracing::error;

use crate::call::RedCall;
use crate::editor::Editor;
use crate::keymap::install_default_keymap;
use crate::keys::key_event_string;
use crate::pane::Frame;
use crate::render::{Render, TerminalRenderer};
use crate::script::scheduler::PassOutcome;
use crate::script::thread::{Outcome, Routine, call_then};

/// Event-loop glue: polls terminal input, dispatches the `key_event` hook,
/// drains the scheduler, draws. The editor itself never blocks on script
/// work; all behavior past this loop is script tasks.
pub struct App {
    editor: Editor,
    renderer: TerminalRenderer,
}

impl App {
    pub fn new() -> io::Result<Self> {
        let mut editor = Editor::new();
        let callbacks = editor.callbacks();
        install_default_keymap(&mut editor.hooks, &callbacks);
        let renderer = TerminalRenderer::new(io::stdout())?;
        Ok(Self { editor, renderer })
    }

    pub fn run(mut self, file_paths: Vec<String>) -> io::Result<()> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, SetTitle("badred"))?;
        let result = self.event_loop(file_paths);
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;
        result
    }

    fn event_loop(&mut self, file_paths: Vec<String>) -> io::Result<()> {
        let (cols, rows) = crossterm::terminal::size()?;
        self.editor.state.root_frame = Frame {
            x: 0,
            y: 0,
            rows,
            cols,
        };

        for (index, path) in file_paths.into_iter().enumerate() {
            self.spawn_file_open(path, index == 0);
        }

        loop {
            match self.editor.run_until_idle() {
                Ok(PassOutcome::Quit) => break,
                Ok(PassOutcome::Idle) => {}
                Err(err) => error!("scheduler pass failed: {}", err),
            }

            self.renderer.draw(&self.editor.state)?;

            if !event::poll(self.editor.state.input_poll_rate)? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if let Some(key) = key_event_string(&key) {
                        self.editor.dispatch_key(key);
                    }
                }
                Event::Resize(cols, rows) => {
                    self.editor.state.root_frame = Frame {
                        x: 0,
                        y: 0,
                        rows,
                        cols,
                    };
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Opens a startup file as a script task; the first one is linked over
    /// the initial buffer so its content appears immediately.
    fn spawn_file_open(&mut self, path: String, link_to_initial: bool) {
        self.editor.scheduler.spawn_thread(Routine::boxed(move |_| {
            call_then(RedCall::FileOpen { path }, move |response| {
                let file_id = match response.into_file_id() {
                    Ok(id) => id,
                    Err(err) => return Outcome::Fail(err.to_string()),
                };
                if !link_to_initial {
                    return Outcome::Finish(None);
                }
                call_then(RedCall::CurrentBufferId, move |response| {
                    let buffer_id = match response.into_buffer_id() {
                        Ok(id) => id,
                        Err(err) => return Outcome::Fail(err.to_string()),
                    };
                    call_then(
                        RedCall::BufferLinkFile {
                            buffer_id,
                            file_id,
                            overwrite: true,
                        },
                        |_| Outcome::Finish(None),
                    )
                })
            })
        }));
    }
}
