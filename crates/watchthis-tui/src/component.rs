//! Component trait: the interface every UI panel implements.
//!
//! - Components own their presentation state (cursor, scroll, input).
//! - Synchronized data is read from the session's `View`, never copied in.
//! - Components produce `Vec<Action>`; the App dispatches them.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

use watchthis_sync::View;

use crate::action::{Action, ComponentId};

pub trait Component {
    fn id(&self) -> ComponentId;

    /// Handle a key event.  Only called when this component has focus.
    fn handle_key(&mut self, key: KeyEvent, view: &View<'_>) -> Vec<Action>;

    /// Render the component into `area`.
    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, view: &View<'_>);
}
