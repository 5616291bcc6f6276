//! Terminal presentation: crossterm render sink and key-aware frame pacing.

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use culture_core::{Color, OrganismId, Result};
use culture_world::{Mask, Pacer, RenderSink};
use std::io::{self, BufWriter, Stdout, Write};
use std::time::{Duration, Instant};
use tracing::warn;

/// Raw mode plus alternate screen for as long as the guard lives.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(err) = execute!(io::stdout(), LeaveAlternateScreen, Show) {
            warn!("failed to leave alternate screen: {}", err);
        }
        if let Err(err) = terminal::disable_raw_mode() {
            warn!("failed to disable raw mode: {}", err);
        }
    }
}

/// Grid size that fits the terminal, one character per cell.
pub fn terminal_grid_size() -> io::Result<(usize, usize)> {
    let (cols, rows) = terminal::size()?;
    Ok((cols.saturating_sub(1) as usize, rows.saturating_sub(1) as usize))
}

/// Paints each boundary cell as a coloured blank.
pub struct TerminalSink {
    out: BufWriter<Stdout>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self {
            out: BufWriter::new(io::stdout()),
        }
    }
}

impl RenderSink for TerminalSink {
    fn begin_frame(&mut self, _generation: u64) -> Result<()> {
        queue!(self.out, ResetColor, Clear(ClearType::All))?;
        Ok(())
    }

    fn draw_boundary(&mut self, _id: OrganismId, color: Color, boundary: &Mask) -> Result<()> {
        queue!(
            self.out,
            SetBackgroundColor(TermColor::Rgb {
                r: color.r,
                g: color.g,
                b: color.b,
            })
        )?;
        for pos in boundary.positions() {
            queue!(self.out, MoveTo(pos.x as u16, pos.y as u16), Print(' '))?;
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        queue!(self.out, ResetColor)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Waits out the frame interval while watching for `q`, `Esc` or Ctrl-C.
pub struct KeyPacer {
    interval: Duration,
}

impl KeyPacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Pacer for KeyPacer {
    fn wait(&mut self, _generation: u64) -> bool {
        match quit_requested(self.interval) {
            Ok(quit) => !quit,
            Err(err) => {
                warn!("failed to read terminal events: {}", err);
                false
            }
        }
    }
}

fn quit_requested(timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !event::poll(remaining)? {
            return Ok(false);
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let ctrl_c =
                key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
            if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                return Ok(true);
            }
        }
    }
}
