//! Synchronous driver for hosts that own a blocking `Transport`.
//!
//! `ProductApp` runs query tickets to completion (including automatic
//! retries), executes form and delete submissions, and invalidates the
//! product list after every successful mutation. The detail key of the
//! mutated product is overwritten with the saved product, or dropped after a
//! delete.

use tracing::debug;

use crate::config::ClientConfig;
use crate::confirm::DeleteFlow;
use crate::error::ApiError;
use crate::form::{ProductForm, SubmitError};
use crate::query::{Fetch, ObserverId, QueryClient, QueryKey, QueryState, Settle, Ticket};
use crate::transport::Transport;
use crate::types::{DeleteConfirmation, Product, ProductId};

pub struct ProductApp<T> {
    queries: QueryClient,
    transport: T,
}

impl<T: Transport> ProductApp<T> {
    pub fn new(config: &ClientConfig, transport: T) -> Self {
        Self {
            queries: QueryClient::new(config),
            transport,
        }
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    /// Mount a view on `key` and load it.
    pub fn mount(&mut self, key: QueryKey) -> ObserverId {
        let observer = self.queries.subscribe(key);
        self.load(key);
        observer
    }

    pub fn unmount(&mut self, observer: ObserverId) {
        self.queries.unsubscribe(observer);
    }

    /// Read `key`, going to the network only if the cache cannot answer.
    pub fn load(&mut self, key: QueryKey) {
        if let Fetch::Issue(ticket) = self.queries.fetch(key) {
            self.run(ticket);
        }
    }

    /// Manual retry: always issues a new request.
    pub fn refetch(&mut self, key: QueryKey) {
        let ticket = self.queries.refetch(key);
        self.run(ticket);
    }

    pub fn products(&mut self) -> QueryState<Vec<Product>> {
        self.load(QueryKey::Products);
        self.queries.products()
    }

    pub fn product(&mut self, id: ProductId) -> QueryState<Product> {
        self.load(QueryKey::Product(id));
        self.queries.product(id)
    }

    /// Validate, send and settle a create or edit form.
    pub fn submit(&mut self, form: &mut ProductForm) -> Result<Product, SubmitError> {
        let request = form.begin_submit(self.queries.client())?;
        let result = self.transport.execute(&request);
        let product = form.finish_submit(self.queries.client(), result)?;
        self.queries.store_product(product.clone());
        self.invalidate_products();
        Ok(product)
    }

    /// Send the confirmed delete, if the flow has one. `Ok(None)` means
    /// nothing was pending.
    pub fn confirm_delete(
        &mut self,
        flow: &mut DeleteFlow,
    ) -> Result<Option<DeleteConfirmation>, ApiError> {
        let Some(pending) = flow.confirm(self.queries.client()) else {
            return Ok(None);
        };
        let id = pending.product().id;
        let result = self.transport.execute(pending.request());
        let confirmation = flow.finish(self.queries.client(), pending, result)?;
        self.queries.remove(QueryKey::Product(id));
        self.invalidate_products();
        Ok(Some(confirmation))
    }

    fn invalidate_products(&mut self) {
        if let Some(ticket) = self.queries.invalidate(QueryKey::Products) {
            self.run(ticket);
        }
    }

    fn run(&mut self, mut ticket: Ticket) {
        loop {
            let result = self.transport.execute(ticket.request());
            match self.queries.settle(ticket, result) {
                Settle::Retry(next) => ticket = next,
                Settle::Discarded => return,
                Settle::Settled { key, notify } => {
                    debug!(%key, observers = notify.len(), "query settled");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::ProductRef;
    use crate::http::HttpMethod;
    use crate::testing::ScriptedTransport;
    use crate::validation::Field;

    const PEN: &str = r#"{"id":1,"product_name":"pen","product_description":"nice pen","price":5}"#;
    const WIDGET: &str =
        r#"{"id":2,"product_name":"Widget","product_description":"A widget","price":9.99}"#;

    fn app(transport: &ScriptedTransport) -> ProductApp<&ScriptedTransport> {
        ProductApp::new(&ClientConfig::with_base_url("http://api.test"), transport)
    }

    #[test]
    fn create_then_list_shows_the_new_product() {
        let transport = ScriptedTransport::new();
        transport.push_ok(200, &format!("[{PEN}]"));
        transport.push_ok(200, WIDGET);
        transport.push_ok(200, &format!("[{PEN},{WIDGET}]"));
        let mut app = app(&transport);

        assert_eq!(app.products().data.unwrap().len(), 1);

        let mut form = ProductForm::create();
        form.set_field(Field::ProductName, "Widget");
        form.set_field(Field::ProductDescription, "A widget");
        form.set_field(Field::Price, "9.99");
        let created = app.submit(&mut form).unwrap();
        assert_eq!(created.id, ProductId(2));

        let products = app.products().data.unwrap();
        assert!(products.iter().any(|p| p.id == ProductId(2)));
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn invalid_form_sends_nothing() {
        let transport = ScriptedTransport::new();
        let mut app = app(&transport);
        let mut form = ProductForm::create();
        form.set_field(Field::ProductName, "Widget");
        form.set_field(Field::ProductDescription, "A widget");
        form.set_field(Field::Price, "0");

        let err = app.submit(&mut form).unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn mounted_list_is_refetched_after_delete() {
        let transport = ScriptedTransport::new();
        let scale = r#"{"id":3,"product_name":"scale","product_description":"nice scale","price":15}"#;
        transport.push_ok(200, &format!("[{PEN},{scale}]"));
        transport.push_ok(200, r#"{"message":"Product deleted successfully"}"#);
        transport.push_ok(200, &format!("[{PEN}]"));
        let mut app = app(&transport);
        app.mount(QueryKey::Products);

        let mut flow = DeleteFlow::new();
        flow.select(ProductRef {
            id: ProductId(3),
            product_name: "scale".to_string(),
        });
        let confirmation = app.confirm_delete(&mut flow).unwrap().unwrap();
        assert_eq!(confirmation.message, "Product deleted successfully");

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].method, HttpMethod::Delete);
        assert_eq!(requests[1].path, "http://api.test/product/3");
        let products = app.queries().products().data.unwrap();
        assert!(products.iter().all(|p| p.id != ProductId(3)));
    }

    #[test]
    fn failed_delete_keeps_list_cached() {
        let transport = ScriptedTransport::new();
        transport.push_ok(200, &format!("[{PEN}]"));
        transport.push_ok(500, "boom");
        let mut app = app(&transport);
        app.products();

        let mut flow = DeleteFlow::new();
        flow.select(ProductRef {
            id: ProductId(1),
            product_name: "pen".to_string(),
        });
        assert!(app.confirm_delete(&mut flow).is_err());
        assert!(!app.queries().products().is_stale);
    }

    #[test]
    fn list_failure_retries_once_and_manual_retry_recovers() {
        let transport = ScriptedTransport::new();
        transport.push_ok(500, "down");
        transport.push_ok(500, "still down");
        transport.push_ok(200, "[]");
        let mut app = app(&transport);

        let state = app.products();
        assert!(state.is_error());
        assert_eq!(transport.request_count(), 2);

        app.refetch(QueryKey::Products);
        let state = app.products();
        assert_eq!(state.data, Some(Vec::new()));
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn update_replaces_the_cached_detail() {
        let transport = ScriptedTransport::new();
        transport.push_ok(200, PEN);
        transport.push_ok(
            200,
            r#"{"id":1,"product_name":"pen","product_description":"nice pen","price":7}"#,
        );
        let mut app = app(&transport);

        let product = app.product(ProductId(1)).data.unwrap();
        let mut form = ProductForm::edit(&product);
        form.set_field(Field::Price, "7");
        app.submit(&mut form).unwrap();

        let cached = app.product(ProductId(1)).data.unwrap();
        assert_eq!(cached.price, 7.0);
        assert_eq!(transport.request_count(), 2);

        let mut again = ProductForm::edit(&cached);
        again.set_field(Field::ProductName, "pencil");
        assert_eq!(again.draft().price, 7.0);
    }

    #[test]
    fn deleted_product_is_not_served_from_cache() {
        let transport = ScriptedTransport::new();
        let scale = r#"{"id":3,"product_name":"scale","product_description":"nice scale","price":15}"#;
        transport.push_ok(200, scale);
        transport.push_ok(200, r#"{"message":"Product deleted successfully"}"#);
        transport.push_ok(404, r#"{"detail":"Product not found"}"#);
        transport.push_ok(404, r#"{"detail":"Product not found"}"#);
        let mut app = app(&transport);

        let product = app.product(ProductId(3)).data.unwrap();
        let mut flow = DeleteFlow::new();
        flow.select(&product);
        app.confirm_delete(&mut flow).unwrap().unwrap();

        let state = app.product(ProductId(3));
        assert_eq!(state.data, None);
        assert_eq!(state.error, Some(ApiError::NotFound));
        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[2].path, "http://api.test/product/3");
    }
}
