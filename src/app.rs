use crate::api::ProductClient;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::sync::Synchronizer;
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::ProductListView;
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Header title
  title: String,

  /// Collection endpoint, shown in the header
  api_url: String,

  tick_rate: Duration,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client =
      ProductClient::new(&config.api).map_err(|e| eyre!("Failed to create API client: {}", e))?;
    let sync = Synchronizer::new(client, config.stale_time());

    Ok(Self {
      view_stack: vec![Box::new(ProductListView::new(sync))],
      title: config
        .title
        .clone()
        .unwrap_or_else(|| "stockroom".to_string()),
      api_url: config.api.url.clone(),
      tick_rate: config.tick_rate(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableFocusChange)?;

    let result = self.event_loop().await;

    restore_terminal()?;
    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(self.tick_rate);
    info!(api_url = %self.api_url, "started");

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        // Every view keeps polling, so the list stays in sync under a detail view
        for view in &mut self.view_stack {
          view.tick();
        }
      }
      Event::FocusGained => {
        for view in &mut self.view_stack {
          view.on_focus();
        }
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let Some(view) = self.view_stack.last_mut() else {
      self.should_quit = true;
      return;
    };

    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Breadcrumb
      ])
      .split(frame.area());

    let breadcrumb: Vec<String> = self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect();

    if let Some(view) = self.view_stack.last_mut() {
      let shortcuts = view.shortcuts();
      draw_header(frame, chunks[0], &self.title, &self.api_url, &shortcuts);
      view.render(frame, chunks[1]);
    }

    draw_footer(frame, chunks[2], &breadcrumb);
  }
}

/// Leave raw mode and the alternate screen. Also used by the panic hook.
pub fn restore_terminal() -> Result<()> {
  stdout().execute(DisableFocusChange)?;
  disable_raw_mode()?;
  stdout().execute(LeaveAlternateScreen)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ApiConfig;

  fn app() -> App {
    let config = Config {
      api: ApiConfig {
        url: "http://127.0.0.1:1/api/products".to_string(),
        timeout_secs: 1,
      },
      title: Some("Warehouse".to_string()),
      ..Config::default()
    };
    App::new(config).unwrap()
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[tokio::test]
  async fn test_quit_from_root() {
    let mut app = app();
    assert_eq!(app.title, "Warehouse");

    app.handle_event(Event::Key(key(KeyCode::Char('q'))));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_ctrl_c_quits() {
    let mut app = app();
    app.handle_event(Event::Key(KeyEvent::new(
      KeyCode::Char('c'),
      KeyModifiers::CONTROL,
    )));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_invalid_api_url_fails() {
    let config = Config::default().with_api_url(Some("::nope".to_string()));
    let err = App::new(config).err().unwrap();
    assert!(err.to_string().contains("Failed to create API client"));
  }
}
