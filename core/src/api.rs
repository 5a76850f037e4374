//! The five domain operations, each one build → execute → parse.
//!
//! Errors from the transport and from status interpretation propagate
//! unchanged. Drafts are sent as given.

use crate::client::ProductClient;
use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::{DeleteConfirmation, Product, ProductDraft, ProductId};

/// One-shot typed access to the product endpoints.
#[derive(Debug, Clone)]
pub struct ProductApi<T> {
    client: ProductClient,
    transport: T,
}

impl<T: Transport> ProductApi<T> {
    pub fn new(client: ProductClient, transport: T) -> Self {
        Self { client, transport }
    }

    /// `GET /products`
    pub fn list(&self) -> Result<Vec<Product>, ApiError> {
        let response = self.transport.execute(&self.client.build_list_products())?;
        self.client.parse_list_products(response)
    }

    /// `GET /product/{id}`
    pub fn get(&self, id: ProductId) -> Result<Product, ApiError> {
        let response = self.transport.execute(&self.client.build_get_product(id))?;
        self.client.parse_get_product(response)
    }

    /// `POST /product`
    pub fn create(&self, draft: &ProductDraft) -> Result<Product, ApiError> {
        let request = self.client.build_create_product(draft)?;
        let response = self.transport.execute(&request)?;
        self.client.parse_create_product(response)
    }

    /// `PUT /product/{id}`
    pub fn update(&self, id: ProductId, draft: &ProductDraft) -> Result<Product, ApiError> {
        let request = self.client.build_update_product(id, draft)?;
        let response = self.transport.execute(&request)?;
        self.client.parse_update_product(response)
    }

    /// `DELETE /product/{id}`
    pub fn delete(&self, id: ProductId) -> Result<DeleteConfirmation, ApiError> {
        let response = self.transport.execute(&self.client.build_delete_product(id))?;
        self.client.parse_delete_product(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::http::HttpMethod;

    fn api(transport: &ScriptedTransport) -> ProductApi<&ScriptedTransport> {
        ProductApi::new(ProductClient::new("http://api.test"), transport)
    }

    #[test]
    fn create_does_not_validate_the_draft() {
        let transport = ScriptedTransport::new();
        transport.push_ok(
            200,
            r#"{"id":5,"product_name":"","product_description":"","price":0}"#,
        );
        let draft = ProductDraft::default();
        let created = api(&transport).create(&draft).unwrap();
        assert_eq!(created.id, ProductId(5));
        assert_eq!(transport.requests()[0].method, HttpMethod::Post);
    }

    #[test]
    fn network_failure_propagates_unchanged() {
        let transport = ScriptedTransport::new();
        transport.push_err(ApiError::NetworkError("connection refused".to_string()));
        let err = api(&transport).list().unwrap_err();
        assert_eq!(err, ApiError::NetworkError("connection refused".to_string()));
    }

    #[test]
    fn delete_missing_product_is_not_found() {
        let transport = ScriptedTransport::new();
        transport.push_ok(404, r#"{"detail":"Product not found"}"#);
        let err = api(&transport).delete(ProductId(99)).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(transport.requests()[0].path, "http://api.test/product/99");
    }
}
