//! Single-choice terminal picker.
//!
//! Used for model and safety-level selection. When the terminal cannot be
//! put in raw mode (piped stdin, CI), the first option is returned instead
//! of failing.

use anyhow::Result;
use crossterm::cursor::MoveUp;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::queue;
use crossterm::terminal::{self, Clear, ClearType};
use owo_colors::OwoColorize;
use std::io::{self, IsTerminal, Write};
use tracing::warn;

/// Capability for picking one entry out of a list.
pub trait Menu: Send + Sync {
    /// Returns the chosen option, or `None` if `options` is empty.
    fn choose(&self, options: &[String], title: &str) -> Option<String>;
}

/// Arrow-key picker drawn on stdout.
#[derive(Debug, Default)]
pub struct TerminalMenu;

impl TerminalMenu {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, options: &[String], title: &str) -> Result<usize> {
        let _raw = RawModeGuard::enable()?;
        let mut out = io::stdout();

        write!(out, "\r\n{} (use ↑↓ arrows, Enter to select):\r\n", title)?;
        let mut state = MenuState::new(options.len());
        draw(&mut out, options, state.selected())?;

        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match MenuKey::from(key) {
                MenuKey::Up => state.up(),
                MenuKey::Down => state.down(),
                MenuKey::Select => {
                    clear(&mut out, options.len() + 1)?;
                    return Ok(state.selected());
                }
                MenuKey::Abort => {
                    clear(&mut out, options.len() + 1)?;
                    return Ok(0);
                }
                MenuKey::Other => continue,
            }

            clear(&mut out, options.len())?;
            draw(&mut out, options, state.selected())?;
        }
    }
}

impl Menu for TerminalMenu {
    fn choose(&self, options: &[String], title: &str) -> Option<String> {
        let first = options.first()?.clone();
        if !io::stdin().is_terminal() {
            return Some(first);
        }

        match self.run(options, title) {
            Ok(index) => options.get(index).cloned().or(Some(first)),
            Err(e) => {
                warn!("Interactive menu unavailable: {}", e);
                Some(first)
            }
        }
    }
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Cursor position within the option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MenuState {
    selected: usize,
    len: usize,
}

impl MenuState {
    fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    fn selected(&self) -> usize {
        self.selected
    }

    fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn down(&mut self) {
        if self.selected + 1 < self.len {
            self.selected += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuKey {
    Up,
    Down,
    Select,
    Abort,
    Other,
}

impl From<KeyEvent> for MenuKey {
    fn from(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => MenuKey::Up,
            KeyCode::Down | KeyCode::Char('j') => MenuKey::Down,
            KeyCode::Enter => MenuKey::Select,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => MenuKey::Abort,
            KeyCode::Char('q') | KeyCode::Esc => MenuKey::Abort,
            _ => MenuKey::Other,
        }
    }
}

fn draw<W: Write>(out: &mut W, options: &[String], selected: usize) -> Result<()> {
    for (i, option) in options.iter().enumerate() {
        if i == selected {
            write!(out, "\r  {}\r\n", format!("▸ {}", option).cyan())?;
        } else {
            write!(out, "\r    {}\r\n", option)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn clear<W: Write>(out: &mut W, lines: usize) -> Result<()> {
    for _ in 0..lines {
        queue!(out, MoveUp(1), Clear(ClearType::CurrentLine))?;
    }
    out.flush()?;
    Ok(())
}
