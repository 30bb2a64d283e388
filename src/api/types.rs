use serde::{Deserialize, Deserializer, Serialize};

/// A product record as returned by the catalog API
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  #[serde(rename = "_id")]
  pub id: String,
  pub name: String,
  #[serde(deserialize_with = "deserialize_price")]
  pub price: f64,
  pub category: String,
  pub description: String,
  #[serde(default)]
  pub image_url: Option<String>,
}

/// Write payload for create and update requests (no id)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDraft {
  pub name: String,
  /// Non-finite values serialize as `null`
  pub price: f64,
  pub category: String,
  pub description: String,
}

/// Accepts `null` as NaN, which is how a non-numeric price round-trips.
fn deserialize_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  let v: Option<f64> = Option::deserialize(deserializer)?;
  Ok(v.unwrap_or(f64::NAN))
}
