use crate::api::Product;
use crate::ui::renderfns::format_price;
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Read-only view of a single product as it was when opened
pub struct ProductDetailView {
  product: Product,
}

impl ProductDetailView {
  pub fn new(product: Product) -> Self {
    Self { product }
  }

  fn field<'a>(label: &'a str, value: Span<'a>) -> Line<'a> {
    Line::from(vec![
      Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
      value,
    ])
  }
}

impl View for ProductDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let product = &self.product;

    let block = Block::default()
      .title(format!(" {} ", product.name))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(5), // Id, price, category, image
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Description
      ])
      .split(inner);

    let image = match &product.image_url {
      Some(url) => Span::styled(url.as_str(), Style::default().fg(Color::Magenta)),
      None => Span::styled("none", Style::default().fg(Color::DarkGray)),
    };
    let header = vec![
      Self::field("Id", Span::raw(product.id.as_str())),
      Self::field(
        "Price",
        Span::styled(format_price(product.price), Style::default().bold()),
      ),
      Self::field(
        "Category",
        Span::styled(product.category.as_str(), Style::default().fg(Color::Yellow)),
      ),
      Self::field("Image", image),
    ];
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let sep =
      Paragraph::new("─".repeat(chunks[1].width as usize)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let desc = Paragraph::new(product.description.as_str()).wrap(Wrap { trim: true });
    frame.render_widget(desc, chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    self.product.name.clone()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new("q/esc", "back").with_priority(90)]
  }
}
