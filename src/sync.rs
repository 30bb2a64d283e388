//! Keeps the edit form, the product list cache and the server in step.
//!
//! The list is a `Query` that is refetched in full after every successful
//! write. Writes never patch the cached list locally, so rows stay as they
//! were until the refetch lands.

use crate::api::{ApiError, Product, ProductClient, ProductDraft};
use crate::query::{Mutation, Query, Settled};
use std::time::Duration;
use tracing::{info, warn};

/// Which product, if any, the form is editing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditSession {
  /// Submitting creates a new product
  #[default]
  Creating,
  /// Submitting replaces the product with this id
  Editing(String),
}

impl EditSession {
  pub fn editing_id(&self) -> Option<&str> {
    match self {
      EditSession::Editing(id) => Some(id),
      EditSession::Creating => None,
    }
  }
}

/// Form fields in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  Name,
  Price,
  Category,
  Description,
}

impl Field {
  pub const ALL: [Field; 4] = [Field::Name, Field::Price, Field::Category, Field::Description];

  pub fn label(self) -> &'static str {
    match self {
      Field::Name => "Name",
      Field::Price => "Price",
      Field::Category => "Category",
      Field::Description => "Description",
    }
  }

  pub fn index(self) -> usize {
    match self {
      Field::Name => 0,
      Field::Price => 1,
      Field::Category => 2,
      Field::Description => 3,
    }
  }
}

/// Raw text of the edit form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
  pub name: String,
  pub price: String,
  pub category: String,
  pub description: String,
}

impl ProductForm {
  pub fn from_product(product: &Product) -> Self {
    Self {
      name: product.name.clone(),
      price: product.price.to_string(),
      category: product.category.clone(),
      description: product.description.clone(),
    }
  }

  pub fn get(&self, field: Field) -> &str {
    match field {
      Field::Name => &self.name,
      Field::Price => &self.price,
      Field::Category => &self.category,
      Field::Description => &self.description,
    }
  }

  pub fn set(&mut self, field: Field, value: String) {
    match field {
      Field::Name => self.name = value,
      Field::Price => self.price = value,
      Field::Category => self.category = value,
      Field::Description => self.description = value,
    }
  }

  pub fn is_empty(&self) -> bool {
    Field::ALL.iter().all(|f| self.get(*f).is_empty())
  }

  /// All required fields hold some text
  pub fn is_complete(&self) -> bool {
    Field::ALL.iter().all(|f| !self.get(*f).is_empty())
  }

  /// Build the write payload, or `None` if a required field is empty
  pub fn to_draft(&self) -> Option<ProductDraft> {
    if !self.is_complete() {
      return None;
    }

    Some(ProductDraft {
      name: self.name.clone(),
      price: coerce_price(&self.price),
      category: self.category.clone(),
      description: self.description.clone(),
    })
  }

  pub fn clear(&mut self) {
    *self = Self::default();
  }

  /// The form would still send exactly this draft
  fn holds(&self, draft: &ProductDraft) -> bool {
    let price = coerce_price(&self.price);
    self.name == draft.name
      && self.category == draft.category
      && self.description == draft.description
      && (price == draft.price || (price.is_nan() && draft.price.is_nan()))
  }
}

/// Numeric coercion for the price field.
///
/// Blank text is zero and anything unparseable is NaN; nothing is rejected.
/// Unsigned `0x`, `0o` and `0b` integers are read in their radix, and the only
/// accepted spelling of infinity is `Infinity`.
pub fn coerce_price(raw: &str) -> f64 {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return 0.0;
  }

  let radix = match trimmed.get(..2) {
    Some("0x" | "0X") => Some(16),
    Some("0o" | "0O") => Some(8),
    Some("0b" | "0B") => Some(2),
    _ => None,
  };
  if let Some(radix) = radix {
    let digits = &trimmed[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
      return f64::NAN;
    }
    return digits
      .chars()
      .filter_map(|c| c.to_digit(radix))
      .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
  }

  let unsigned = trimmed.trim_start_matches(['+', '-']);
  if unsigned.len() + 1 < trimmed.len() {
    return f64::NAN;
  }
  match unsigned {
    "Infinity" => {
      if trimmed.starts_with('-') {
        f64::NEG_INFINITY
      } else {
        f64::INFINITY
      }
    }
    // Rust also parses "inf", "infinity" and "nan" in any case
    _ if unsigned.starts_with(|c: char| c.is_ascii_alphabetic()) => f64::NAN,
    _ => trimmed.parse().unwrap_or(f64::NAN),
  }
}

/// A write request as queued on the mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
  Create(ProductDraft),
  Update { id: String, draft: ProductDraft },
  Delete(String),
}

impl Write {
  fn describe(&self) -> String {
    match self {
      Write::Create(draft) => format!("add \"{}\"", draft.name),
      Write::Update { draft, .. } => format!("update \"{}\"", draft.name),
      Write::Delete(id) => format!("delete {}", id),
    }
  }
}

/// What `submit()` did with the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// A required field was empty; nothing was sent
  Ignored,
  /// A create request is in flight
  Creating,
  /// An update request for this id is in flight
  Updating(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
  Info,
  Error,
}

/// One-line outcome of the latest write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub kind: NoticeKind,
  pub text: String,
}

/// Form/list synchronizer for the product screen
pub struct Synchronizer {
  products: Query<Vec<Product>>,
  writes: Mutation<Write, (), ApiError>,
  form: ProductForm,
  session: EditSession,
  form_revision: u64,
  notice: Option<Notice>,
}

impl Synchronizer {
  pub fn new(client: ProductClient, stale_time: Duration) -> Self {
    let list_client = client.clone();
    let products = Query::new(move || {
      let client = list_client.clone();
      async move { client.list().await.map_err(|e| e.to_string()) }
    })
    .with_stale_time(stale_time);

    let writes = Mutation::new(move |write: Write| {
      let client = client.clone();
      async move {
        match write {
          Write::Create(draft) => client.create(&draft).await.map(|_| ()),
          Write::Update { id, draft } => client.update(&id, &draft).await.map(|_| ()),
          Write::Delete(id) => client.delete(&id).await,
        }
      }
    });

    Self {
      products,
      writes,
      form: ProductForm::default(),
      session: EditSession::Creating,
      form_revision: 0,
      notice: None,
    }
  }

  /// Start the initial list fetch.
  pub fn load(&mut self) {
    self.products.fetch();
  }

  /// Refetch the list on demand.
  pub fn refresh(&mut self) {
    self.products.refetch();
  }

  /// Refetch the list if it has gone stale (e.g. after the terminal regains focus).
  pub fn refresh_if_stale(&mut self) {
    if self.products.is_stale() && !self.products.is_fetching() {
      self.products.refetch();
    }
  }

  pub fn products(&self) -> &[Product] {
    self.products.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  pub fn query(&self) -> &Query<Vec<Product>> {
    &self.products
  }

  /// True only during the initial list fetch
  pub fn is_loading(&self) -> bool {
    self.products.is_loading()
  }

  /// Error of a list fetch that never produced data
  pub fn error(&self) -> Option<&str> {
    self.products.error()
  }

  pub fn form(&self) -> &ProductForm {
    &self.form
  }

  pub fn session(&self) -> &EditSession {
    &self.session
  }

  /// Bumped whenever the synchronizer itself rewrites the form
  pub fn form_revision(&self) -> u64 {
    self.form_revision
  }

  pub fn notice(&self) -> Option<&Notice> {
    self.notice.as_ref()
  }

  pub fn pending_writes(&self) -> usize {
    self.writes.in_flight()
  }

  pub fn set_field(&mut self, field: Field, value: String) {
    self.form.set(field, value);
  }

  /// Load a row into the form and hold its id.
  pub fn begin_edit(&mut self, product: &Product) {
    self.session = EditSession::Editing(product.id.clone());
    self.form = ProductForm::from_product(product);
    self.form_revision += 1;
  }

  /// Leave the edit session and clear the form. No-op while creating.
  pub fn cancel(&mut self) -> bool {
    if self.session == EditSession::Creating {
      return false;
    }
    self.session = EditSession::Creating;
    self.form.clear();
    self.form_revision += 1;
    true
  }

  /// Send the form as a create or update, depending on the session.
  pub fn submit(&mut self) -> SubmitOutcome {
    let Some(draft) = self.form.to_draft() else {
      return SubmitOutcome::Ignored;
    };

    match &self.session {
      EditSession::Creating => {
        info!(name = %draft.name, "creating product");
        self.writes.mutate(Write::Create(draft));
        SubmitOutcome::Creating
      }
      EditSession::Editing(id) => {
        info!(%id, name = %draft.name, "updating product");
        let id = id.clone();
        self.writes.mutate(Write::Update {
          id: id.clone(),
          draft,
        });
        SubmitOutcome::Updating(id)
      }
    }
  }

  /// Delete a product. The form is left alone.
  pub fn delete(&mut self, id: &str) {
    info!(%id, "deleting product");
    self.writes.mutate(Write::Delete(id.to_string()));
  }

  /// Apply settled requests. Returns `true` if anything changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.products.poll();

    for settled in self.writes.poll() {
      self.apply(settled);
      changed = true;
    }

    changed
  }

  fn apply(&mut self, settled: Settled<Write, (), ApiError>) {
    let Settled { input, result } = settled;

    if let Err(err) = result {
      warn!(status = ?err.status(), "failed to {}: {}", input.describe(), err);
      self.notice = Some(Notice {
        kind: NoticeKind::Error,
        text: format!("Failed to {}: {}", input.describe(), err),
      });
      return;
    }

    // The form is only reset if it still holds what this write sent
    let text = match &input {
      Write::Create(draft) => {
        if self.session == EditSession::Creating && self.form.holds(draft) {
          self.form.clear();
          self.form_revision += 1;
        }
        format!("Added \"{}\"", draft.name)
      }
      Write::Update { id, draft } => {
        if self.session.editing_id() == Some(id.as_str()) && self.form.holds(draft) {
          self.session = EditSession::Creating;
          self.form.clear();
          self.form_revision += 1;
        }
        format!("Updated \"{}\"", draft.name)
      }
      Write::Delete(id) => format!("Deleted {}", id),
    };

    self.notice = Some(Notice {
      kind: NoticeKind::Info,
      text,
    });
    self.products.invalidate();
  }
}
