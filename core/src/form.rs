//! Create/edit form state machine.
//!
//! ```text
//! Editing --submit--> (validate) --invalid--> Editing (errors shown)
//!                                 --valid----> Submitting --ok----> Succeeded
//!                                                          --error--> Failed
//! ```
//!
//! `Failed` keeps the draft; the next submit starts over from validation.
//! Nothing is sent while the draft has field errors, and a second submit is
//! refused while one is in flight.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::ProductClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{Product, ProductDraft, ProductId};
use crate::validation::{parse_price, validate_draft, Field, FieldErrors, ValidationError};

/// Whether the form creates a new product or replaces an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(ProductId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPhase {
    Editing,
    Submitting,
    Succeeded(Product),
    Failed(ApiError),
}

/// Why a submit did not produce a product.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("draft has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),

    #[error("a submission is already in flight")]
    InFlight,

    #[error("no submission is in flight")]
    NotSubmitting,

    #[error(transparent)]
    Failed(ApiError),
}

/// Draft, field errors and submission phase of one form instance.
#[derive(Debug, Clone)]
pub struct ProductForm {
    mode: FormMode,
    draft: ProductDraft,
    errors: FieldErrors,
    phase: FormPhase,
}

impl ProductForm {
    /// Empty form for creating a product.
    pub fn create() -> Self {
        Self::with_draft(FormMode::Create, ProductDraft::default())
    }

    /// Form seeded from a fetched product.
    pub fn edit(product: &Product) -> Self {
        Self::with_draft(FormMode::Edit(product.id), product.to_draft())
    }

    pub fn with_draft(mode: FormMode, draft: ProductDraft) -> Self {
        Self {
            mode,
            draft,
            errors: FieldErrors::new(),
            phase: FormPhase::Editing,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &ProductDraft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<ValidationError> {
        self.errors.get(&field).copied()
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.phase, FormPhase::Submitting)
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_submitting()
    }

    /// Apply one edit to a field. Clears that field's error and no other.
    pub fn set_field(&mut self, field: Field, value: &str) {
        match field {
            Field::ProductName => self.draft.product_name = value.to_string(),
            Field::ProductDescription => self.draft.product_description = value.to_string(),
            Field::Price => self.draft.price = parse_price(value),
        }
        if self.errors.remove(&field).is_some() {
            debug!(field = %field, "cleared field error");
        }
    }

    /// Run every field rule, replacing the current errors. Returns whether the draft is valid.
    pub fn validate(&mut self) -> bool {
        self.errors = validate_draft(&self.draft);
        self.errors.is_empty()
    }

    /// Validate and, if valid, move to `Submitting` and return the request to send.
    pub fn begin_submit(&mut self, client: &ProductClient) -> Result<HttpRequest, SubmitError> {
        if self.is_submitting() {
            return Err(SubmitError::InFlight);
        }
        if !self.validate() {
            debug!(errors = self.errors.len(), "submission blocked by validation");
            self.phase = FormPhase::Editing;
            return Err(SubmitError::Invalid(self.errors.clone()));
        }

        let request = match self.mode {
            FormMode::Create => client.build_create_product(&self.draft),
            FormMode::Edit(id) => client.build_update_product(id, &self.draft),
        };
        match request {
            Ok(request) => {
                self.phase = FormPhase::Submitting;
                Ok(request)
            }
            Err(e) => {
                self.phase = FormPhase::Failed(e.clone());
                Err(SubmitError::Failed(e))
            }
        }
    }

    /// Settle the in-flight submission with the transport's result.
    pub fn finish_submit(
        &mut self,
        client: &ProductClient,
        result: Result<HttpResponse, ApiError>,
    ) -> Result<Product, SubmitError> {
        if !self.is_submitting() {
            return Err(SubmitError::NotSubmitting);
        }

        let parsed = result.and_then(|response| match self.mode {
            FormMode::Create => client.parse_create_product(response),
            FormMode::Edit(_) => client.parse_update_product(response),
        });
        match parsed {
            Ok(product) => {
                info!(id = %product.id, mode = ?self.mode, "product saved");
                self.phase = FormPhase::Succeeded(product.clone());
                Ok(product)
            }
            Err(e) => {
                warn!(mode = ?self.mode, error = %e, "product save failed");
                self.phase = FormPhase::Failed(e.clone());
                Err(SubmitError::Failed(e))
            }
        }
    }
}
