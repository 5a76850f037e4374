//! Two-step delete confirmation.
//!
//! ```text
//! Idle --select--> ConfirmPending --confirm--> Deleting --ok--> Idle
//!                                 --cancel---> Idle
//!                                                       --error--> ConfirmPending
//! ```
//!
//! Selecting a product never touches the network; only `confirm` produces a
//! request.

use tracing::{debug, info, warn};

use crate::client::ProductClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{DeleteConfirmation, Product, ProductId};

/// The product a delete dialog is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub id: ProductId,
    pub product_name: String,
}

impl From<&Product> for ProductRef {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            product_name: product.product_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteState {
    Idle,
    ConfirmPending(ProductRef),
    Deleting(ProductRef),
}

/// A confirmed delete waiting for its response. Only `DeleteFlow::confirm`
/// creates one, and `DeleteFlow::finish` consumes it.
#[derive(Debug)]
pub struct PendingDelete {
    product: ProductRef,
    request: HttpRequest,
}

impl PendingDelete {
    pub fn product(&self) -> &ProductRef {
        &self.product
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }
}

#[derive(Debug, Clone)]
pub struct DeleteFlow {
    state: DeleteState,
    last_error: Option<ApiError>,
}

impl Default for DeleteFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl DeleteFlow {
    pub fn new() -> Self {
        Self {
            state: DeleteState::Idle,
            last_error: None,
        }
    }

    pub fn state(&self) -> &DeleteState {
        &self.state
    }

    /// Error of the last failed delete, shown inside the still-open dialog.
    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// Open the dialog for `product`. Ignored while a delete is in flight.
    pub fn select(&mut self, product: impl Into<ProductRef>) -> bool {
        if matches!(self.state, DeleteState::Deleting(_)) {
            return false;
        }
        let product = product.into();
        debug!(id = %product.id, "delete confirmation requested");
        self.state = DeleteState::ConfirmPending(product);
        self.last_error = None;
        true
    }

    /// Close the dialog without side effects.
    pub fn cancel(&mut self) -> bool {
        if !matches!(self.state, DeleteState::ConfirmPending(_)) {
            return false;
        }
        self.state = DeleteState::Idle;
        self.last_error = None;
        true
    }

    /// Confirm the pending delete and get the request to send.
    pub fn confirm(&mut self, client: &ProductClient) -> Option<PendingDelete> {
        let DeleteState::ConfirmPending(product) = &self.state else {
            return None;
        };
        let product = product.clone();
        let request = client.build_delete_product(product.id);
        self.state = DeleteState::Deleting(product.clone());
        Some(PendingDelete { product, request })
    }

    /// Settle a confirmed delete.
    pub fn finish(
        &mut self,
        client: &ProductClient,
        pending: PendingDelete,
        result: Result<HttpResponse, ApiError>,
    ) -> Result<DeleteConfirmation, ApiError> {
        match result.and_then(|response| client.parse_delete_product(response)) {
            Ok(confirmation) => {
                info!(id = %pending.product.id, "product deleted");
                self.state = DeleteState::Idle;
                self.last_error = None;
                Ok(confirmation)
            }
            Err(e) => {
                warn!(id = %pending.product.id, error = %e, "delete failed");
                self.state = DeleteState::ConfirmPending(pending.product);
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Dialog text for the pending confirmation.
    pub fn prompt(&self) -> Option<String> {
        match &self.state {
            DeleteState::ConfirmPending(product) | DeleteState::Deleting(product) => Some(format!(
                "Are you sure you want to delete \"{}\"? This action cannot be undone.",
                product.product_name
            )),
            DeleteState::Idle => None,
        }
    }
}
