//! Full-screen text output: every frame clears the terminal and rewrites
//! it from the top-left corner.

use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};

/// Terminal surface the player draws frames on.
///
/// The cursor is hidden while frames are being drawn and shown again when
/// the screen is dropped.
pub struct Screen<W: Write> {
    out: W,
    cursor_hidden: bool,
}

impl Screen<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Screen<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cursor_hidden: false,
        }
    }

    /// Print a status line without clearing.
    pub fn notice(&mut self, msg: &str) -> io::Result<()> {
        write!(self.out, "{msg}\r\n")?;
        self.out.flush()
    }

    /// Replace whatever is on screen with `text`.
    pub fn draw(&mut self, text: &str) -> io::Result<()> {
        if !self.cursor_hidden {
            queue!(self.out, Hide)?;
            self.cursor_hidden = true;
        }
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                // \r keeps rows aligned when the tty is not translating newlines
                self.out.write_all(b"\r\n")?;
            }
            self.out.write_all(line.as_bytes())?;
        }
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> Drop for Screen<W> {
    fn drop(&mut self) {
        if self.cursor_hidden {
            // Best-effort: the terminal may already be gone
            let _ = execute!(self.out, Show);
            let _ = self.out.write_all(b"\r\n");
            let _ = self.out.flush();
        }
    }
}
