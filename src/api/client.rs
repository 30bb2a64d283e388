use crate::api::error::ApiError;
use crate::api::types::{Product, ProductDraft};
use crate::config::ApiConfig;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Catalog API client
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct ProductClient {
  http: reqwest::Client,
  base_url: Url,
}

impl ProductClient {
  pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;

    Self::with_client(http, &config.url)
  }

  /// Wrap an existing `reqwest::Client`
  pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
    let base_url =
      Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
    if base_url.cannot_be_a_base() {
      return Err(ApiError::InvalidUrl(base_url.to_string()));
    }

    Ok(Self { http, base_url })
  }

  /// URL of a single product; the id is encoded as one path segment
  fn item_url(&self, id: &str) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push(id);
    }
    url
  }

  /// Fetch every product in the collection
  pub async fn list(&self) -> Result<Vec<Product>, ApiError> {
    let url = self.base_url.clone();
    debug!("GET {url}");

    let resp = self.http.get(url).send().await?;
    handle_response(resp).await
  }

  /// Create a product; the server assigns its id
  pub async fn create(&self, draft: &ProductDraft) -> Result<Product, ApiError> {
    let url = self.base_url.clone();
    debug!("POST {url}");

    let resp = self.http.post(url).json(draft).send().await?;
    handle_response(resp).await
  }

  /// Replace every field of an existing product
  pub async fn update(&self, id: &str, draft: &ProductDraft) -> Result<Product, ApiError> {
    let url = self.item_url(id);
    debug!("PUT {url}");

    let resp = self.http.put(url).json(draft).send().await?;
    handle_response(resp).await
  }

  pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
    let url = self.item_url(id);
    debug!("DELETE {url}");

    let resp = self.http.delete(url).send().await?;
    handle_empty(resp).await
  }
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
  let status = resp.status();
  if !status.is_success() {
    return Err(parse_error(status, resp).await);
  }

  let body = resp.text().await?;
  serde_json::from_str(&body).map_err(|e| {
    let preview: String = body.chars().take(200).collect();
    ApiError::Decode {
      message: format!("{e} (body preview: {preview:?})"),
    }
  })
}

async fn handle_empty(resp: reqwest::Response) -> Result<(), ApiError> {
  let status = resp.status();
  if status.is_success() {
    Ok(())
  } else {
    Err(parse_error(status, resp).await)
  }
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> ApiError {
  let raw = resp.text().await.unwrap_or_default();
  let message = if raw.trim().is_empty() {
    status
      .canonical_reason()
      .unwrap_or("unknown status")
      .to_string()
  } else {
    raw
  };

  ApiError::Server {
    status: status.as_u16(),
    message,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  async fn setup() -> (MockServer, ProductClient) {
    let server = MockServer::start().await;
    let base = format!("{}/api/products", server.uri());
    let client = ProductClient::with_client(reqwest::Client::new(), &base).unwrap();
    (server, client)
  }

  fn pen() -> serde_json::Value {
    json!({
      "_id": "a1",
      "name": "Pen",
      "price": 2,
      "category": "Office",
      "description": "x"
    })
  }

  fn draft() -> ProductDraft {
    ProductDraft {
      name: "Pen".to_string(),
      price: 1.5,
      category: "Office".to_string(),
      description: "Blue pen".to_string(),
    }
  }

  #[test]
  fn test_item_url_appends_id_segment() {
    let client =
      ProductClient::with_client(reqwest::Client::new(), "http://localhost:8001/api/products/")
        .unwrap();
    assert_eq!(
      client.item_url("a1").as_str(),
      "http://localhost:8001/api/products/a1"
    );
    assert_eq!(
      client.item_url("a/b c").as_str(),
      "http://localhost:8001/api/products/a%2Fb%20c"
    );
  }

  #[test]
  fn test_rejects_invalid_base_url() {
    let result = ProductClient::with_client(reqwest::Client::new(), "not a url");
    assert!(matches!(result, Err(ApiError::InvalidUrl(_))));

    let result = ProductClient::with_client(reqwest::Client::new(), "mailto:x@example.com");
    assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
  }

  #[tokio::test]
  async fn test_list_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
      .and(path("/api/products"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .expect(1)
      .mount(&server)
      .await;

    let products = client.list().await.unwrap();
    assert!(products.is_empty());
  }

  #[tokio::test]
  async fn test_list_products() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
      .and(path("/api/products"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([pen()])))
      .mount(&server)
      .await;

    let products = client.list().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, "a1");
    assert_eq!(products[0].name, "Pen");
  }

  #[tokio::test]
  async fn test_create_posts_draft() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
      .and(path("/api/products"))
      .and(body_json(json!({
        "name": "Pen",
        "price": 1.5,
        "category": "Office",
        "description": "Blue pen"
      })))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({
        "_id": "new1",
        "name": "Pen",
        "price": 1.5,
        "category": "Office",
        "description": "Blue pen"
      })))
      .expect(1)
      .mount(&server)
      .await;

    let created = client.create(&draft()).await.unwrap();
    assert_eq!(created.id, "new1");
    assert_eq!(created.price, 1.5);
  }

  #[tokio::test]
  async fn test_update_puts_to_item() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
      .and(path("/api/products/a1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(pen()))
      .expect(1)
      .mount(&server)
      .await;

    let updated = client.update("a1", &draft()).await.unwrap();
    assert_eq!(updated.id, "a1");
  }

  #[tokio::test]
  async fn test_update_missing_id_is_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
      .and(path("/api/products/nope"))
      .respond_with(ResponseTemplate::new(404).set_body_string("Product not found"))
      .mount(&server)
      .await;

    let err = client.update("nope", &draft()).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("Product not found"));
  }

  #[tokio::test]
  async fn test_delete_accepts_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
      .and(path("/api/products/a1"))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;

    client.delete("a1").await.unwrap();
  }

  #[tokio::test]
  async fn test_server_error_without_body_uses_reason() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
      .and(path("/api/products"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let err = client.list().await.unwrap_err();
    assert!(
      matches!(&err, ApiError::Server { status: 500, message } if message == "Internal Server Error"),
      "unexpected error: {err:?}"
    );
  }

  #[tokio::test]
  async fn test_malformed_body_is_decode_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
      .and(path("/api/products"))
      .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
      .mount(&server)
      .await;

    let err = client.list().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }), "unexpected error: {err:?}");
  }

  #[tokio::test]
  async fn test_unreachable_server_is_network_error() {
    // Grab a free port and release it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let base = format!("http://127.0.0.1:{}/api/products", port);

    let client = ProductClient::with_client(reqwest::Client::new(), &base).unwrap();
    let err = client.list().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "unexpected error: {err:?}");
  }
}
