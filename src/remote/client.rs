use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::ResourceConfig;
use crate::error::RemoteError;
use crate::model::{Entity, EntityId, Operation, Patch};

/// REST client for one collection (`GET/POST <url>`, `PUT/DELETE <url>/<id>`).
#[derive(Clone)]
pub struct RemoteClient {
  http: reqwest::Client,
  base: Url,
  id_field: String,
}

impl RemoteClient {
  pub fn new(config: &ResourceConfig) -> Result<Self, RemoteError> {
    let base = Url::parse(&config.url).map_err(|e| RemoteError::InvalidUrl {
      url: config.url.clone(),
      reason: e.to_string(),
    })?;
    if base.cannot_be_a_base() {
      return Err(RemoteError::InvalidUrl {
        url: config.url.clone(),
        reason: "url cannot carry item paths".to_string(),
      });
    }

    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder.build().map_err(|source| RemoteError::Transport {
      op: Operation::Fetch,
      source,
    })?;

    Ok(Self {
      http,
      base,
      id_field: config.id_field.clone(),
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  /// URL of a single item: the collection URL plus one path segment.
  fn item_url(&self, id: &EntityId) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push(id.as_str());
    }
    url
  }

  /// Fetch the whole collection.
  pub async fn list(&self) -> Result<Vec<Entity>, RemoteError> {
    let op = Operation::Fetch;
    let response = self
      .http
      .get(self.base.clone())
      .send()
      .await
      .map_err(|source| RemoteError::Transport { op, source })?;
    let response = check_status(op, response)?;

    let items: Vec<Value> = response.json().await.map_err(|e| RemoteError::Decode {
      op,
      reason: e.to_string(),
    })?;

    let total = items.len();
    let entities: Vec<Entity> = items
      .into_iter()
      .filter_map(|item| match item {
        Value::Object(object) => {
          let entity = Entity::from_remote(object, &self.id_field);
          if entity.is_none() {
            warn!(id_field = %self.id_field, "Skipping remote record without id");
          }
          entity
        }
        other => {
          warn!(record = %other, "Skipping non-object remote record");
          None
        }
      })
      .collect();

    debug!(total, kept = entities.len(), "Fetched remote collection");
    Ok(entities)
  }

  /// Create a record. Returns the id assigned by the remote, if it sent one.
  pub async fn create(&self, attributes: &Patch) -> Result<Option<EntityId>, RemoteError> {
    let op = Operation::Create;
    let response = self
      .http
      .post(self.base.clone())
      .json(attributes)
      .send()
      .await
      .map_err(|source| RemoteError::Transport { op, source })?;
    let response = check_status(op, response)?;

    let body = response
      .text()
      .await
      .map_err(|source| RemoteError::Transport { op, source })?;
    if body.trim().is_empty() {
      return Ok(None);
    }

    let value: Value = serde_json::from_str(&body).map_err(|e| RemoteError::Decode {
      op,
      reason: e.to_string(),
    })?;

    Ok(
      value
        .get(&self.id_field)
        .and_then(EntityId::from_value),
    )
  }

  pub async fn update(&self, id: &EntityId, attributes: &Patch) -> Result<(), RemoteError> {
    let op = Operation::Update;
    let response = self
      .http
      .put(self.item_url(id))
      .json(attributes)
      .send()
      .await
      .map_err(|source| RemoteError::Transport { op, source })?;
    check_status(op, response)?;
    Ok(())
  }

  pub async fn delete(&self, id: &EntityId) -> Result<(), RemoteError> {
    let op = Operation::Delete;
    let response = self
      .http
      .delete(self.item_url(id))
      .send()
      .await
      .map_err(|source| RemoteError::Transport { op, source })?;
    check_status(op, response)?;
    Ok(())
  }
}

fn check_status(op: Operation, response: Response) -> Result<Response, RemoteError> {
  let status: StatusCode = response.status();
  if status.is_success() {
    Ok(response)
  } else {
    Err(RemoteError::Status {
      op,
      status: status.as_u16(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn config(url: String) -> ResourceConfig {
    ResourceConfig {
      url,
      ..ResourceConfig::default()
    }
  }

  async fn client(server: &MockServer) -> RemoteClient {
    RemoteClient::new(&config(format!("{}/users", server.uri()))).unwrap()
  }

  fn patch(value: Value) -> Patch {
    match value {
      Value::Object(map) => map,
      _ => panic!("expected object"),
    }
  }

  #[tokio::test]
  async fn test_list_normalizes_ids_and_skips_bad_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/users"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"id": 1, "name": "Ann"},
        {"name": "no id"},
        "garbage",
        {"id": "x2", "name": "Bo"}
      ])))
      .mount(&server)
      .await;

    let users = client(&server).await.list().await.unwrap();
    let ids: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "x2"]);
    assert_eq!(users[0].text("name"), "Ann");
  }

  #[tokio::test]
  async fn test_list_with_custom_id_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/students"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!([{"_id": "64f0", "name": "Binh"}])),
      )
      .mount(&server)
      .await;

    let remote = RemoteClient::new(&ResourceConfig {
      url: format!("{}/api/students", server.uri()),
      id_field: "_id".to_string(),
      ..ResourceConfig::default()
    })
    .unwrap();

    let students = remote.list().await.unwrap();
    assert_eq!(students[0].id.as_str(), "64f0");
  }

  #[tokio::test]
  async fn test_list_failure_names_operation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let err = client(&server).await.list().await.unwrap_err();
    assert_eq!(err.to_string(), "Fetch failed: 500");
  }

  #[tokio::test]
  async fn test_list_rejects_non_array_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"users": []})))
      .mount(&server)
      .await;

    let err = client(&server).await.list().await.unwrap_err();
    assert!(matches!(err, RemoteError::Decode { op: Operation::Fetch, .. }));
  }

  #[tokio::test]
  async fn test_create_posts_body_and_reads_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/users"))
      .and(body_json(json!({"name": "New"})))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 11, "name": "New"})))
      .expect(1)
      .mount(&server)
      .await;

    let id = client(&server)
      .await
      .create(&patch(json!({"name": "New"})))
      .await
      .unwrap();
    assert_eq!(id, Some(EntityId::from("11")));
  }

  #[tokio::test]
  async fn test_create_with_empty_acknowledgement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let id = client(&server)
      .await
      .create(&patch(json!({"name": "New"})))
      .await
      .unwrap();
    assert_eq!(id, None);
  }

  #[tokio::test]
  async fn test_update_targets_item_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/users/3"))
      .and(body_json(json!({"name": "Cy"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
      .expect(1)
      .mount(&server)
      .await;

    client(&server)
      .await
      .update(&EntityId::from("3"), &patch(json!({"name": "Cy"})))
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn test_delete_failure_names_operation() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/users/3"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&server)
      .await;

    let err = client(&server)
      .await
      .delete(&EntityId::from("3"))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Delete failed: 404");
  }

  #[tokio::test]
  async fn test_transport_error() {
    // Bind and release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let url = format!("http://127.0.0.1:{}/users", port);

    let remote = RemoteClient::new(&config(url)).unwrap();
    let err = remote.list().await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport { op: Operation::Fetch, .. }));
    assert!(err.to_string().starts_with("Fetch failed: "));
  }

  #[test]
  fn test_item_url_appends_segment() {
    let remote = RemoteClient::new(&config("https://example.com/api/users/".to_string())).unwrap();
    assert_eq!(
      remote.item_url(&EntityId::from("7")).as_str(),
      "https://example.com/api/users/7"
    );
    assert_eq!(remote.base_url().as_str(), "https://example.com/api/users/");
  }

  #[test]
  fn test_invalid_url_rejected() {
    let err = RemoteClient::new(&config("mailto:someone".to_string())).err();
    assert!(matches!(err, Some(RemoteError::InvalidUrl { .. })));
  }
}
