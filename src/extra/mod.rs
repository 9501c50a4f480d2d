//! Extra structures for driving the renderer interactively.

pub mod first_person;

use crate::Vector2;

/// Input impulses gathered for one frame.
///
/// The flags are cleared by [`Ctx::new_frame`]; terminal key repeat keeps
/// held keys flowing while the renderer loops.
#[derive(Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Input {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub rise: bool,
    pub sink: bool,
    pub yaw_left: bool,
    pub yaw_right: bool,
    pub pitch_up: bool,
    pub pitch_down: bool,
    pub speed_up: bool,
    pub speed_down: bool,
    pub mouse_delta: Vector2,
}

/// Defines a context state.
///
/// The user decides how to fill the data; with the `crossterm` feature
/// enabled, [`Ctx::event`] maps raw terminal events onto it.
pub struct Ctx {
    pub focused: bool,
    pub input: Input,
    pub should_stop: bool,
    last_mouse: Option<Vector2>,
}

impl Default for Ctx {
    fn default() -> Self {
        Self {
            focused: true,
            input: Input::default(),
            should_stop: false,
            last_mouse: None,
        }
    }
}

impl Ctx {
    /// Prepares a new frame, dropping the previous frame's impulses.
    pub fn new_frame(&mut self) {
        self.input = Input::default();
    }
}

#[cfg(feature = "crossterm")]
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent};

#[cfg(feature = "crossterm")]
impl Ctx {
    /// Processes a crossterm event.
    pub fn event(&mut self, e: Event) {
        match e {
            Event::FocusGained => self.focused = true,
            Event::FocusLost => self.focused = false,
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) => {
                if kind == KeyEventKind::Release {
                    return;
                }
                if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
                    self.should_stop = true;
                    return;
                }
                match code {
                    KeyCode::Esc => self.should_stop = true,
                    KeyCode::Char('w') => self.input.forward = true,
                    KeyCode::Char('s') => self.input.back = true,
                    KeyCode::Char('a') => self.input.left = true,
                    KeyCode::Char('d') => self.input.right = true,
                    KeyCode::Char(' ') => self.input.rise = true,
                    KeyCode::Char('c') => self.input.sink = true,
                    KeyCode::Char('i') => self.input.speed_up = true,
                    KeyCode::Char('o') => self.input.speed_down = true,
                    KeyCode::Left => self.input.yaw_left = true,
                    KeyCode::Right => self.input.yaw_right = true,
                    KeyCode::Up => self.input.pitch_up = true,
                    KeyCode::Down => self.input.pitch_down = true,
                    _ => (),
                }
            }
            Event::Mouse(MouseEvent { column, row, .. }) => {
                let pos = Vector2::new(column as f32, row as f32);
                if let Some(last) = self.last_mouse {
                    self.input.mouse_delta += pos - last;
                }
                self.last_mouse = Some(pos);
            }
            _ => (),
        }
    }
}
