use crate::api::Product;
use crate::sync::{EditSession, NoticeKind, SubmitOutcome, Synchronizer};
use crate::ui::components::{FormEvent, FormPanel, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_price, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::ProductDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use tracing::debug;

/// Root view: the product list beside the add/update form
pub struct ProductListView {
  sync: Synchronizer,
  list_state: ListState,
  form: FormPanel,
}

impl ProductListView {
  pub fn new(mut sync: Synchronizer) -> Self {
    // Start fetching immediately
    sync.load();

    Self {
      sync,
      list_state: ListState::default(),
      form: FormPanel::new(),
    }
  }

  fn selected_product(&self) -> Option<&Product> {
    self
      .list_state
      .selected()
      .and_then(|idx| self.sync.products().get(idx))
  }

  /// The list and form are only on screen once the initial load has data
  fn list_ready(&self) -> bool {
    !self.sync.is_loading() && self.sync.error().is_none()
  }

  fn handle_form_key(&mut self, key: KeyEvent) {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Changed(field, value)) => {
        self.sync.set_field(field, value);
      }
      KeyResult::Event(FormEvent::Submit) => match self.sync.submit() {
        SubmitOutcome::Ignored => debug!("form incomplete, submit ignored"),
        SubmitOutcome::Creating | SubmitOutcome::Updating(_) => self.form.deactivate(),
      },
      KeyResult::Event(FormEvent::Cancel) => {
        self.sync.cancel();
        self.form.deactivate();
      }
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    self
      .form
      .sync_from(self.sync.form(), self.sync.form_revision());
  }

  fn render_status(&self, frame: &mut Frame, area: Rect, message: &str, color: Color) {
    let block = Block::default()
      .title(" Products ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let paragraph = Paragraph::new(message.to_string())
      .block(block)
      .wrap(Wrap { trim: true })
      .style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.sync.products().len();
    ensure_valid_selection(&mut self.list_state, len);

    let query = self.sync.query();
    let mut title = format!(" Products ({}) ", len);
    if let Some(err) = query.refresh_error() {
      title = format!("{}(refresh failed: {}) ", title, truncate(err, 40));
    } else if query.is_fetching() {
      title.push_str("(refreshing...) ");
    } else if let Some(at) = query.updated_at() {
      title = format!("{}[{}] ", title, at.format("%H:%M:%S"));
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(if self.form.is_active() {
        Color::DarkGray
      } else {
        Color::Blue
      }));

    if len == 0 {
      let paragraph = Paragraph::new("No products yet. Press 'a' to add one.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let editing = self.sync.session().editing_id();
    let items: Vec<ListItem> = self
      .sync
      .products()
      .iter()
      .map(|product| {
        let marker = if editing == Some(product.id.as_str()) {
          Span::styled("* ", Style::default().fg(Color::Yellow))
        } else {
          Span::raw("  ")
        };
        let image = if product.image_url.is_some() {
          Span::styled(" [img]", Style::default().fg(Color::Magenta))
        } else {
          Span::raw("")
        };

        let line = Line::from(vec![
          marker,
          Span::styled(
            format!("{:<24}", truncate(&product.name, 24)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<14}", truncate(&product.category, 14)),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:>10}", format_price(product.price)),
            Style::default().bold(),
          ),
          Span::raw("  "),
          Span::raw(truncate(&product.description, 40)),
          image,
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_notice(&self, frame: &mut Frame, area: Rect) {
    let Some(notice) = self.sync.notice() else {
      return;
    };
    let color = match notice.kind {
      NoticeKind::Info => Color::Green,
      NoticeKind::Error => Color::Red,
    };
    let paragraph = Paragraph::new(notice.text.as_str())
      .wrap(Wrap { trim: true })
      .style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
  }
}

impl View for ProductListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.form.is_active() && self.list_ready() {
      self.handle_form_key(key);
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('r') => {
        self.sync.refresh();
      }
      KeyCode::Char('a') | KeyCode::Tab if self.list_ready() => {
        self.form.activate();
      }
      KeyCode::Char('e') => {
        if let Some(product) = self.selected_product().cloned() {
          self.sync.begin_edit(&product);
          self
            .form
            .sync_from(self.sync.form(), self.sync.form_revision());
          self.form.activate();
        }
      }
      KeyCode::Char('c') => {
        self.sync.cancel();
        self
          .form
          .sync_from(self.sync.form(), self.sync.form_revision());
      }
      KeyCode::Char('d') => {
        if let Some(id) = self.selected_product().map(|p| p.id.clone()) {
          self.sync.delete(&id);
        }
      }
      KeyCode::Enter => {
        if let Some(product) = self.selected_product() {
          return ViewAction::Push(Box::new(ProductDetailView::new(product.clone())));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    // The initial load owns the whole screen until it resolves
    if self.sync.is_loading() {
      self.render_status(frame, area, "Loading products...", Color::DarkGray);
      return;
    }
    if let Some(error) = self.sync.error() {
      let message = format!("Error: {}\n\nPress 'r' to retry.", error);
      self.render_status(frame, area, &message, Color::Red);
      return;
    }

    let columns = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
      .split(area);

    let side = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(8), // Form: 4 fields, blank, hint, borders
        Constraint::Min(1),    // Write outcome
      ])
      .split(columns[1]);

    self.render_list(frame, columns[0]);
    self.form.render(
      frame,
      side[0],
      self.sync.session().editing_id().is_some(),
      self.sync.pending_writes(),
    );
    self.render_notice(frame, side[1]);
  }

  fn breadcrumb_label(&self) -> String {
    match self.sync.session().editing_id() {
      Some(id) => format!("Products [editing {}]", id),
      None => "Products".to_string(),
    }
  }

  fn tick(&mut self) {
    if self.sync.poll() {
      self
        .form
        .sync_from(self.sync.form(), self.sync.form_revision());
    }
  }

  fn on_focus(&mut self) {
    self.sync.refresh_if_stale();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    if self.form.is_active() {
      return vec![
        Shortcut::new("enter", "save").with_priority(10),
        Shortcut::new("tab", "next field").with_priority(20),
        Shortcut::new("esc", "leave form").with_priority(30),
      ];
    }

    let add_label = match self.sync.session() {
      EditSession::Editing(_) => "resume edit",
      EditSession::Creating if self.sync.form().is_empty() => "add",
      EditSession::Creating => "resume draft",
    };
    let mut shortcuts = vec![
      Shortcut::new("a", add_label).with_priority(10),
      Shortcut::new("e", "edit").with_priority(20),
      Shortcut::new("d", "delete").with_priority(30),
      Shortcut::new("enter", "details").with_priority(40),
      Shortcut::new("r", "refresh").with_priority(50),
      Shortcut::new("q", "quit").with_priority(90),
    ];
    if self.sync.session().editing_id().is_some() {
      shortcuts.push(Shortcut::new("c", "cancel edit").with_priority(25));
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ProductClient;
  use crate::sync::Field;
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use serde_json::json;
  use std::time::Duration;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  async fn view_with(body: ResponseTemplate) -> (MockServer, ProductListView) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/products"))
      .respond_with(body)
      .mount(&server)
      .await;

    let base = format!("{}/api/products", server.uri());
    let client = ProductClient::with_client(reqwest::Client::new(), &base).unwrap();
    let view = ProductListView::new(Synchronizer::new(client, Duration::ZERO));
    (server, view)
  }

  async fn wait_loaded(view: &mut ProductListView) {
    for _ in 0..400 {
      view.tick();
      if !view.sync.is_loading() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("list never loaded");
  }

  fn screen(view: &mut ProductListView) -> String {
    let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
    terminal
      .draw(|frame| view.render(frame, frame.area()))
      .unwrap();
    terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|c| c.symbol())
      .collect()
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn pen() -> serde_json::Value {
    json!([{
      "_id": "a1",
      "name": "Pen",
      "price": 2,
      "category": "Office",
      "description": "x"
    }])
  }

  #[tokio::test]
  async fn test_loading_screen_before_first_response() {
    let (_server, mut view) = view_with(
      ResponseTemplate::new(200)
        .set_body_json(json!([]))
        .set_delay(Duration::from_millis(500)),
    )
    .await;

    assert!(screen(&mut view).contains("Loading products..."));
  }

  #[tokio::test]
  async fn test_failed_load_shows_error_instead_of_rows() {
    let (_server, mut view) =
      view_with(ResponseTemplate::new(503).set_body_string("upstream down")).await;
    wait_loaded(&mut view).await;

    let text = screen(&mut view);
    assert!(text.contains("Error:"));
    assert!(text.contains("upstream down"));
    assert!(!text.contains("Add Product"));
  }

  #[tokio::test]
  async fn test_rows_and_form_rendered() {
    let (_server, mut view) = view_with(ResponseTemplate::new(200).set_body_json(pen())).await;
    wait_loaded(&mut view).await;

    let text = screen(&mut view);
    assert!(text.contains("Products (1)"));
    assert!(text.contains("Pen"));
    assert!(text.contains("$2.00"));
    assert!(text.contains("Add Product"));
  }

  #[tokio::test]
  async fn test_edit_key_loads_selected_row() {
    let (_server, mut view) = view_with(ResponseTemplate::new(200).set_body_json(pen())).await;
    wait_loaded(&mut view).await;
    screen(&mut view); // selects the first row

    view.handle_key(key(KeyCode::Char('e')));

    assert!(view.form.is_active());
    assert_eq!(view.sync.session(), &EditSession::Editing("a1".to_string()));
    assert_eq!(view.sync.form().price, "2");
    assert!(screen(&mut view).contains("Update Product"));

    // Esc while editing cancels the edit
    view.handle_key(key(KeyCode::Esc));
    assert!(!view.form.is_active());
    assert_eq!(view.sync.session(), &EditSession::Creating);
    assert!(view.sync.form().is_empty());
  }

  #[tokio::test]
  async fn test_incomplete_submit_keeps_form_focused() {
    let (_server, mut view) =
      view_with(ResponseTemplate::new(200).set_body_json(json!([]))).await;
    wait_loaded(&mut view).await;

    view.handle_key(key(KeyCode::Char('a')));
    view.handle_key(key(KeyCode::Char('P')));
    view.handle_key(key(KeyCode::Enter));

    assert!(view.form.is_active());
    assert_eq!(view.sync.form().get(Field::Name), "P");
    assert_eq!(view.sync.pending_writes(), 0);
  }

  #[tokio::test]
  async fn test_form_stays_hidden_while_loading() {
    let (_server, mut view) = view_with(
      ResponseTemplate::new(200)
        .set_body_json(json!([]))
        .set_delay(Duration::from_millis(500)),
    )
    .await;

    view.handle_key(key(KeyCode::Char('a')));
    assert!(!view.form.is_active());
    assert!(matches!(view.handle_key(key(KeyCode::Char('q'))), ViewAction::Pop));
  }

  #[tokio::test]
  async fn test_form_stays_hidden_after_failed_load() {
    let (_server, mut view) =
      view_with(ResponseTemplate::new(503).set_body_string("upstream down")).await;
    wait_loaded(&mut view).await;

    view.handle_key(key(KeyCode::Tab));
    assert!(!view.form.is_active());
    assert!(view.sync.form().is_empty());
    assert!(matches!(view.handle_key(key(KeyCode::Char('q'))), ViewAction::Pop));
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_rows_and_shows_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/products"))
      .respond_with(ResponseTemplate::new(200).set_body_json(pen()))
      .up_to_n_times(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/products"))
      .respond_with(ResponseTemplate::new(500).set_body_string("db gone"))
      .mount(&server)
      .await;

    let base = format!("{}/api/products", server.uri());
    let client = ProductClient::with_client(reqwest::Client::new(), &base).unwrap();
    let mut view = ProductListView::new(Synchronizer::new(client, Duration::ZERO));
    wait_loaded(&mut view).await;

    view.handle_key(key(KeyCode::Char('r')));
    for _ in 0..400 {
      view.tick();
      if view.sync.query().refresh_error().is_some() {
        break;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let text = screen(&mut view);
    assert!(text.contains("refresh failed"));
    assert!(text.contains("Pen"));
    assert!(text.contains("$2.00"));
    assert!(!text.contains("Error:"));
  }
}
