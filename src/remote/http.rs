//! JSON/HTTP client for the shopping-list backend.
//!
//! Endpoints:
//! - `POST   /api/lists`                  create a list
//! - `PATCH  /api/lists/{id}`             update a list
//! - `DELETE /api/lists/{id}`             delete a list and its items
//! - `POST   /api/lists/{id}/items`       create an item
//! - `PATCH  /api/items/{id}`             update an item
//! - `PUT    /api/items/{id}/checked`     set the checked flag
//! - `DELETE /api/items/{id}`             delete an item
//! - `GET    /api/shared/{code}`          list + items by share code

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{RemoteStore, SharedList};
use crate::error::ShopError;
use crate::model::{EntityId, Item, ItemPatch, ListPatch, NewItem, NewList, ShoppingList};

/// List as the backend serializes it (numeric ids).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDto {
    id: i64,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    share_code: Option<String>,
}

impl From<ListDto> for ShoppingList {
    fn from(dto: ListDto) -> Self {
        Self {
            id: EntityId::Remote(dto.id),
            name: dto.name,
            description: dto.description,
            share_code: dto.share_code,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDto {
    id: i64,
    list_id: i64,
    name: String,
    #[serde(default = "default_quantity")]
    quantity: u32,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    checked: bool,
}

const fn default_quantity() -> u32 {
    1
}

impl From<ItemDto> for Item {
    fn from(dto: ItemDto) -> Self {
        Self {
            id: EntityId::Remote(dto.id),
            list_id: EntityId::Remote(dto.list_id),
            name: dto.name,
            quantity: dto.quantity,
            category: dto.category,
            notes: dto.notes,
            checked: dto.checked,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SharedDto {
    list: ListDto,
    #[serde(default)]
    items: Vec<ItemDto>,
}

/// Remote store reached over HTTP.
#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    /// Create a client for the backend at `base_url`.
    ///
    /// `connect_timeout` bounds establishing the connection only; a slow
    /// response is allowed up to `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ShopError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout.max(connect_timeout))
            .build()
            .map_err(|e| ShopError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Turn a non-success response into a descriptive error.
async fn check(response: Response) -> Result<Response, ShopError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    if status == StatusCode::NOT_FOUND {
        return Err(ShopError::NotFound(body));
    }
    Err(ShopError::Remote(format!("HTTP {status}: {body}")))
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn create_list(&self, list: &NewList) -> Result<ShoppingList, ShopError> {
        debug!(name = %list.name, "POST list");
        let response = self.client.post(self.url("lists")).json(list).send().await?;
        let dto: ListDto = check(response).await?.json().await?;
        Ok(dto.into())
    }

    async fn update_list(&self, list_id: i64, patch: &ListPatch) -> Result<(), ShopError> {
        debug!(list_id, "PATCH list");
        let response = self
            .client
            .patch(self.url(&format!("lists/{list_id}")))
            .json(patch)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_list(&self, list_id: i64) -> Result<(), ShopError> {
        debug!(list_id, "DELETE list");
        let response = self
            .client
            .delete(self.url(&format!("lists/{list_id}")))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn create_item(&self, list_id: i64, item: &NewItem) -> Result<Item, ShopError> {
        debug!(list_id, name = %item.name, "POST item");
        let response = self
            .client
            .post(self.url(&format!("lists/{list_id}/items")))
            .json(item)
            .send()
            .await?;
        let dto: ItemDto = check(response).await?.json().await?;
        Ok(dto.into())
    }

    async fn update_item(&self, item_id: i64, patch: &ItemPatch) -> Result<(), ShopError> {
        debug!(item_id, "PATCH item");
        let response = self
            .client
            .patch(self.url(&format!("items/{item_id}")))
            .json(patch)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn toggle_item(&self, item_id: i64, checked: bool) -> Result<(), ShopError> {
        debug!(item_id, checked, "PUT item checked");
        let response = self
            .client
            .put(self.url(&format!("items/{item_id}/checked")))
            .json(&json!({ "checked": checked }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_item(&self, item_id: i64) -> Result<(), ShopError> {
        debug!(item_id, "DELETE item");
        let response = self
            .client
            .delete(self.url(&format!("items/{item_id}")))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn list_by_share_code(&self, code: &str) -> Result<Option<SharedList>, ShopError> {
        debug!(code, "GET shared list");
        let response = self
            .client
            .get(self.url(&format!("shared/{code}")))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let dto: SharedDto = check(response).await?.json().await?;
        Ok(Some(SharedList {
            list: dto.list.into(),
            items: dto.items.into_iter().map(Item::from).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let store = HttpStore::new(
            "http://localhost:8080/",
            Duration::from_secs(1),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(store.url("lists"), "http://localhost:8080/api/lists");
        assert_eq!(store.url("/items/5"), "http://localhost:8080/api/items/5");
    }

    #[test]
    fn test_item_dto_conversion() {
        let json = r#"{"id": 5, "listId": 1, "name": "Milk", "checked": true}"#;
        let dto: ItemDto = serde_json::from_str(json).unwrap();
        let item = Item::from(dto);
        assert_eq!(item.id, EntityId::Remote(5));
        assert_eq!(item.list_id, EntityId::Remote(1));
        assert_eq!(item.quantity, 1);
        assert!(item.checked);
    }

    #[test]
    fn test_shared_dto_conversion() {
        let json = r#"{
            "list": {"id": 3, "name": "BBQ", "shareCode": "XK42"},
            "items": [{"id": 9, "listId": 3, "name": "Charcoal", "quantity": 2}]
        }"#;
        let dto: SharedDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.list.share_code.as_deref(), Some("XK42"));
        assert_eq!(dto.items.len(), 1);
        assert_eq!(dto.items[0].quantity, 2);
    }
}
