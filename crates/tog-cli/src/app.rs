//! The interactive event loop: reads `crossterm` events, translates them
//! to [`tog_tui::Key`], and drives a [`tog_tui::ViewManager`] until it
//! empties out or `Q` is pressed.
//!
//! Grounded on spec §4.5's dispatch loop and §6's exit-code policy
//! (0 on normal termination including cancellation, 1 otherwise); the
//! `/`/`?` prompt-then-Enter pattern for starting a search is this
//! binary's own minimal line editor, since spec §4.6/§4.7 describe the
//! search *state machine* the views already implement but leave the
//! literal keystroke-by-keystroke prompt UI to the terminal driver.

use std::time::Instant;

use crossterm::event::{self, Event, KeyCode, KeyModifiers};

use tog_tui::{Key, Outcome, SearchDirection, ViewKind, ViewManager};

use crate::screen::TermScreen;

pub fn run(mut screen: TermScreen, initial: ViewKind) -> anyhow::Result<i32> {
    let mut mgr = ViewManager::new(screen.size());
    mgr.open_parent(initial);

    let mut search_prompt: Option<(SearchDirection, String)> = None;

    loop {
        mgr.show(&mut screen);
        if mgr.is_empty() {
            return Ok(0);
        }

        match event::read()? {
            Event::Resize(w, h) => {
                screen.resize_to(w, h);
                mgr.resize((w, h));
            }
            Event::Key(ev) => {
                if let Some((dir, buf)) = &mut search_prompt {
                    match ev.code {
                        KeyCode::Enter => {
                            let pattern = buf.clone();
                            let dir = *dir;
                            search_prompt = None;
                            mgr.start_search(&pattern, dir)?;
                        }
                        KeyCode::Esc => search_prompt = None,
                        KeyCode::Backspace => {
                            buf.pop();
                        }
                        KeyCode::Char(c) => buf.push(c),
                        _ => {}
                    }
                    continue;
                }

                match ev.code {
                    KeyCode::Char('/') => {
                        search_prompt = Some((SearchDirection::Forward, String::new()));
                        continue;
                    }
                    KeyCode::Char('?') => {
                        search_prompt = Some((SearchDirection::Backward, String::new()));
                        continue;
                    }
                    KeyCode::Char('n') => {
                        mgr.search_next();
                        continue;
                    }
                    _ => {}
                }

                let Some(key) = translate_key(ev) else { continue };
                match mgr.dispatch(key, Instant::now())? {
                    Outcome::Continue => {}
                    Outcome::CloseFocused => mgr.close_focused(),
                    Outcome::QuitAll => return Ok(0),
                }
            }
            _ => {}
        }
    }
}

fn translate_key(ev: crossterm::event::KeyEvent) -> Option<Key> {
    if ev.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char(c) = ev.code {
            return match c.to_ascii_lowercase() {
                'u' => Some(Key::CtrlU),
                'd' => Some(Key::CtrlD),
                'l' => Some(Key::CtrlL),
                _ => None,
            };
        }
    }
    match ev.code {
        KeyCode::Char(c @ '1'..='9') => Some(Key::Digit(c as u8 - b'0')),
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Tab => Some(Key::Tab),
        KeyCode::F(_) => Some(Key::FKey),
        KeyCode::PageUp => Some(Key::PageUp),
        KeyCode::PageDown => Some(Key::PageDown),
        KeyCode::Home => Some(Key::Home),
        KeyCode::End => Some(Key::End),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        _ => None,
    }
}
