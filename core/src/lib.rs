//! Client-side data layer for the product catalogue API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern), and layers a keyed query
//! cache, form validation and a delete confirmation flow on top. A
//! `Transport` executes the actual HTTP round-trip.
//!
//! # Design
//! - `ProductClient` is stateless: it holds only `base_url`.
//! - `QueryClient`, `ProductForm` and `DeleteFlow` are state machines that
//!   hand out requests and accept results, so they can be driven from any
//!   event loop and tested with canned responses.
//! - `ProductApp` is the blocking driver used by the CLI.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod app;
pub mod client;
pub mod config;
pub mod confirm;
pub mod error;
pub mod form;
pub mod http;
pub mod query;
pub mod routes;
pub mod testing;
pub mod transport;
pub mod types;
pub mod validation;

pub use api::ProductApi;
pub use app::ProductApp;
pub use client::ProductClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use confirm::{DeleteFlow, DeleteState, PendingDelete, ProductRef};
pub use error::ApiError;
pub use form::{FormMode, FormPhase, ProductForm, SubmitError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::{Fetch, ObserverId, QueryClient, QueryData, QueryKey, QueryState, Settle, Ticket};
pub use routes::{Route, RouteError};
pub use transport::{HttpTransport, Transport};
pub use types::{DeleteConfirmation, Product, ProductDraft, ProductId};
pub use validation::{validate_draft, Field, FieldErrors, ValidationError};
