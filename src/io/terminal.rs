//! Terminal backend: blocking line reads and crossterm-styled output.

use std::io::{IsTerminal, Write};
use std::sync::RwLock;

use anyhow::{Result, bail};
use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};

use crate::config::ColorsConfig;
use crate::io::OutputStyle;

struct Cursor {
    text: String,
    color: Option<u8>,
}

/// Real-terminal sink and line source.
pub struct TerminalBackend {
    color_enabled: bool,
    colors: ColorsConfig,
    cursor: RwLock<Cursor>,
}

impl TerminalBackend {
    /// Opens the process terminal.
    ///
    /// Line input needs a real tty on stdin; without one this fails and the
    /// host should fall back to a queued context.
    pub fn open(colors: ColorsConfig) -> Result<Self> {
        if !std::io::stdin().is_terminal() {
            bail!("stdin is not a terminal");
        }
        let dumb = std::env::var("TERM").is_ok_and(|t| t == "dumb");
        Ok(Self {
            color_enabled: std::io::stdout().is_terminal() && !dumb,
            colors,
            cursor: RwLock::new(Cursor {
                text: "> ".to_string(),
                color: None,
            }),
        })
    }

    pub fn set_cursor(&self, text: String, color: Option<u8>) {
        let mut cursor = self
            .cursor
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        cursor.text = text;
        cursor.color = color;
    }

    /// Resolves a style's color: config override first, then the default.
    pub fn style_color(&self, style: OutputStyle) -> Option<u8> {
        self.colors
            .get(style.name())
            .or_else(|| style.default_color())
    }

    /// Reads one line, printing `prompt` (or the configured cursor) first.
    /// Returns `None` on EOF. Trailing newline is stripped.
    pub fn read_line(&self, prompt: Option<&str>) -> Option<String> {
        match prompt {
            Some(text) => {
                let color = self.style_color(OutputStyle::Prompt);
                self.write(text, color, OutputStyle::Prompt.bold());
            }
            None => {
                let cursor = self
                    .cursor
                    .read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                let color = cursor
                    .color
                    .or_else(|| self.style_color(OutputStyle::Prompt));
                self.write(&cursor.text, color, OutputStyle::Prompt.bold());
            }
        }

        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Some(line)
            }
        }
    }

    /// Writes text to stdout, styled when color is enabled.
    pub fn write(&self, text: &str, color: Option<u8>, bold: bool) {
        let mut stdout = std::io::stdout();
        if self.color_enabled && (color.is_some() || bold) {
            let mut styled = text.stylize();
            if let Some(code) = color {
                styled = styled.with(Color::AnsiValue(code));
            }
            if bold {
                styled = styled.bold();
            }
            let _ = write!(stdout, "{styled}");
        } else {
            let _ = write!(stdout, "{text}");
        }
        let _ = stdout.flush();
    }

    /// Clears the screen and homes the cursor.
    pub fn clear_screen(&self) {
        let _ = crossterm::execute!(std::io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
    }
}
