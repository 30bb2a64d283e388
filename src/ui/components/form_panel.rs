use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::sync::{Field, ProductForm};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Events emitted by the form panel that the parent view needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// A field's text changed
  Changed(Field, String),
  /// Enter pressed
  Submit,
  /// Escape pressed
  Cancel,
}

/// Four-field product form with keyboard focus
#[derive(Debug, Clone, Default)]
pub struct FormPanel {
  inputs: [TextInput; 4],
  focused: usize,
  active: bool,
  revision: u64,
}

impl FormPanel {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn focused(&self) -> Field {
    Field::ALL[self.focused]
  }

  /// Take keyboard focus, starting at the first field
  pub fn activate(&mut self) {
    self.active = true;
    self.focused = 0;
  }

  pub fn deactivate(&mut self) {
    self.active = false;
  }

  /// Reload the inputs if the form was rewritten since the last call
  pub fn sync_from(&mut self, form: &ProductForm, revision: u64) {
    if revision == self.revision {
      return;
    }
    self.revision = revision;
    for field in Field::ALL {
      self.inputs[field.index()].set_value(form.get(field));
    }
  }

  fn focus_next(&mut self) {
    self.focused = (self.focused + 1) % Field::ALL.len();
  }

  fn focus_prev(&mut self) {
    self.focused = (self.focused + Field::ALL.len() - 1) % Field::ALL.len();
  }

  /// Handle a key event while the form has focus
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus_next();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus_prev();
        return KeyResult::Handled;
      }
      _ => {}
    }

    let field = self.focused();
    match self.inputs[self.focused].handle_key(key) {
      InputResult::Submitted(_) => KeyResult::Event(FormEvent::Submit),
      InputResult::Cancelled => KeyResult::Event(FormEvent::Cancel),
      InputResult::Consumed => {
        let value = self.inputs[self.focused].value().to_string();
        KeyResult::Event(FormEvent::Changed(field, value))
      }
      // The form swallows everything while focused
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the form; `editing` switches the title between add and update
  pub fn render(&self, frame: &mut Frame, area: Rect, editing: bool, pending_writes: usize) {
    let mut title = if editing {
      " Update Product ".to_string()
    } else {
      " Add Product ".to_string()
    };
    if pending_writes > 0 {
      title = format!("{}(saving {}...) ", title, pending_writes);
    }

    let border = if self.active {
      Color::Yellow
    } else {
      Color::Blue
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    let label_width = Field::ALL
      .iter()
      .map(|f| f.label().len())
      .max()
      .unwrap_or(0);

    let mut lines: Vec<Line> = Field::ALL
      .iter()
      .map(|field| {
        let input = &self.inputs[field.index()];
        let focused = self.active && *field == self.focused();
        let label_style = if focused {
          Style::default().fg(Color::Yellow).bold()
        } else {
          Style::default().fg(Color::DarkGray)
        };

        let mut spans = vec![Span::styled(
          format!("{:>width$}: ", field.label(), width = label_width),
          label_style,
        )];
        if focused {
          let (before, after) = input.split_at_cursor();
          spans.push(Span::raw(before.to_string()));
          spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
          spans.push(Span::raw(after.to_string()));
        } else {
          spans.push(Span::raw(input.value().to_string()));
        }
        Line::from(spans)
      })
      .collect();

    lines.push(Line::raw(""));
    let hint = match (self.active, editing) {
      (true, true) => "Enter: update  Tab: next field  Esc: cancel edit",
      (true, false) => "Enter: add  Tab: next field  Esc: back to list",
      (false, _) => "a: focus form",
    };
    lines.push(Line::styled(hint, Style::default().fg(Color::DarkGray)));

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_inactive_ignores_keys() {
    let mut panel = FormPanel::new();
    assert_eq!(
      panel.handle_key(key(KeyCode::Char('x'))),
      KeyResult::NotHandled
    );
  }

  #[test]
  fn test_typing_reports_focused_field() {
    let mut panel = FormPanel::new();
    panel.activate();
    panel.handle_key(key(KeyCode::Tab));

    assert_eq!(panel.focused(), Field::Price);
    assert_eq!(
      panel.handle_key(key(KeyCode::Char('3'))),
      KeyResult::Event(FormEvent::Changed(Field::Price, "3".to_string()))
    );
  }

  #[test]
  fn test_focus_wraps() {
    let mut panel = FormPanel::new();
    panel.activate();
    panel.handle_key(key(KeyCode::BackTab));
    assert_eq!(panel.focused(), Field::Description);
    panel.handle_key(key(KeyCode::Down));
    assert_eq!(panel.focused(), Field::Name);
  }

  #[test]
  fn test_enter_and_esc() {
    let mut panel = FormPanel::new();
    panel.activate();
    assert_eq!(
      panel.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submit)
    );
    assert_eq!(
      panel.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancel)
    );
  }

  #[test]
  fn test_sync_from_reloads_on_new_revision() {
    let mut panel = FormPanel::new();
    let form = ProductForm {
      name: "Pen".into(),
      price: "2".into(),
      category: "Office".into(),
      description: "x".into(),
    };

    panel.sync_from(&form, 1);
    panel.activate();
    panel.handle_key(key(KeyCode::Char('s')));
    assert_eq!(panel.inputs[0].value(), "Pens");

    // Same revision leaves local edits alone
    panel.sync_from(&form, 1);
    assert_eq!(panel.inputs[0].value(), "Pens");

    panel.sync_from(&ProductForm::default(), 2);
    assert_eq!(panel.inputs[0].value(), "");
  }
}
