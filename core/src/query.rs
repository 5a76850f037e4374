//! Keyed query cache with in-flight deduplication, bounded retry and
//! invalidation.
//!
//! # Design
//! `QueryClient` never performs I/O. Reads hand out a `Ticket` carrying the
//! request to execute; the host executes it and passes the result back to
//! `settle`. That keeps every transition synchronous and single-threaded:
//!
//! - At most one ticket per key is live. `fetch` on a key with a live ticket
//!   joins it instead of issuing a second request.
//! - Every issued ticket gets a fresh generation. Settling a ticket whose
//!   generation is no longer the key's current one is discarded, so a
//!   superseded response can never overwrite a newer one.
//! - A failed ticket is handed back as a retry (same generation) until the
//!   retry budget is spent, then the key settles into its error state.
//! - Settled results notify only the observers subscribed at that moment;
//!   an unmounted view is never told about a late response.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::{debug, warn};

use crate::client::ProductClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{Product, ProductId};

/// Logical identity of a cacheable read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryKey {
    /// `products`: the full list.
    Products,
    /// `product:{id}`: one product.
    Product(ProductId),
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Products => f.write_str("products"),
            QueryKey::Product(id) => write!(f, "product:{id}"),
        }
    }
}

/// Cached payload of a key.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Products(Vec<Product>),
    Product(Product),
}

/// What a view sees for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub is_fetching: bool,
    pub is_stale: bool,
}

impl<T> QueryState<T> {
    /// Nothing to show yet and a request is underway.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.is_fetching
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some() && !self.is_fetching
    }

    fn map<U>(self, f: impl FnOnce(T) -> Option<U>) -> QueryState<U> {
        QueryState {
            data: self.data.and_then(f),
            error: self.error,
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_fetching: false,
            is_stale: false,
        }
    }
}

/// Handle for one mounted consumer of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

/// A request the host must execute and hand back to `QueryClient::settle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: QueryKey,
    generation: u64,
    attempt: u32,
    request: HttpRequest,
}

impl Ticket {
    pub fn key(&self) -> QueryKey {
        self.key
    }

    /// 0 for the first try, 1 for the first automatic retry, and so on.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }
}

/// Outcome of `QueryClient::fetch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    /// Cached data is current; nothing to send.
    Fresh,
    /// A request for this key is already in flight; wait for it.
    Pending,
    /// Send this request.
    Issue(Ticket),
}

/// Outcome of `QueryClient::settle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    /// The ticket was superseded; its result was dropped.
    Discarded,
    /// The attempt failed and the retry budget allows another; send this.
    Retry(Ticket),
    /// The key reached a new data or error state.
    Settled {
        key: QueryKey,
        notify: Vec<ObserverId>,
    },
}

#[derive(Debug, Default)]
struct Entry {
    data: Option<QueryData>,
    error: Option<ApiError>,
    stale: bool,
    generation: u64,
    in_flight: bool,
    observers: BTreeSet<ObserverId>,
}

/// The process-wide query cache.
#[derive(Debug)]
pub struct QueryClient {
    client: ProductClient,
    retry: u32,
    refetch_on_window_focus: bool,
    entries: HashMap<QueryKey, Entry>,
    observers: HashMap<ObserverId, QueryKey>,
    next_generation: u64,
    next_observer: u64,
}

impl QueryClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: ProductClient::new(&config.base_url),
            retry: config.retry,
            refetch_on_window_focus: config.refetch_on_window_focus,
            entries: HashMap::new(),
            observers: HashMap::new(),
            next_generation: 0,
            next_observer: 0,
        }
    }

    pub fn client(&self) -> &ProductClient {
        &self.client
    }

    /// Register a consumer of `key` (a view mounting).
    pub fn subscribe(&mut self, key: QueryKey) -> ObserverId {
        self.next_observer += 1;
        let id = ObserverId(self.next_observer);
        self.entries.entry(key).or_default().observers.insert(id);
        self.observers.insert(id, key);
        debug!(%key, observer = id.0, "observer subscribed");
        id
    }

    /// Drop a consumer (a view unmounting). Returns false for unknown observers.
    pub fn unsubscribe(&mut self, observer: ObserverId) -> bool {
        let Some(key) = self.observers.remove(&observer) else {
            return false;
        };
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.observers.remove(&observer);
        }
        debug!(%key, observer = observer.0, "observer unsubscribed");
        true
    }

    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.entries.get(key).map_or(0, |e| e.observers.len())
    }

    /// Read `key`: serve the cache, join an in-flight request, or issue one.
    pub fn fetch(&mut self, key: QueryKey) -> Fetch {
        let entry = self.entries.entry(key).or_default();
        if entry.in_flight {
            debug!(%key, "joined in-flight request");
            return Fetch::Pending;
        }
        if entry.data.is_some() && !entry.stale {
            return Fetch::Fresh;
        }
        Fetch::Issue(self.issue(key))
    }

    /// Unconditionally issue a new request for `key`, superseding any in-flight one.
    pub fn refetch(&mut self, key: QueryKey) -> Ticket {
        self.issue(key)
    }

    /// Feed the transport's result for `ticket` back into the cache.
    pub fn settle(&mut self, ticket: Ticket, result: Result<HttpResponse, ApiError>) -> Settle {
        let Some(entry) = self.entries.get_mut(&ticket.key) else {
            return Settle::Discarded;
        };
        if entry.generation != ticket.generation {
            debug!(key = %ticket.key, generation = ticket.generation, "discarded superseded response");
            return Settle::Discarded;
        }

        let parsed = result.and_then(|response| match ticket.key {
            QueryKey::Products => self.client.parse_list_products(response).map(QueryData::Products),
            QueryKey::Product(_) => self.client.parse_get_product(response).map(QueryData::Product),
        });

        match parsed {
            Ok(data) => {
                entry.data = Some(data);
                entry.error = None;
                entry.stale = false;
                entry.in_flight = false;
                debug!(key = %ticket.key, "query settled with data");
            }
            Err(e) if ticket.attempt < self.retry => {
                debug!(key = %ticket.key, attempt = ticket.attempt, error = %e, "retrying query");
                return Settle::Retry(Ticket {
                    attempt: ticket.attempt + 1,
                    ..ticket
                });
            }
            Err(e) => {
                warn!(key = %ticket.key, error = %e, "query failed");
                entry.error = Some(e);
                entry.in_flight = false;
            }
        }
        Settle::Settled {
            key: ticket.key,
            notify: entry.observers.iter().copied().collect(),
        }
    }

    /// Mark `key` stale so the next read goes to the server. A key with
    /// mounted observers is refetched right away.
    pub fn invalidate(&mut self, key: QueryKey) -> Option<Ticket> {
        let entry = self.entries.get_mut(&key)?;
        entry.stale = true;
        debug!(%key, "query invalidated");
        if entry.observers.is_empty() {
            None
        } else {
            Some(self.issue(key))
        }
    }

    /// Write a product the server just returned into its detail key. Any
    /// in-flight read of that key is superseded.
    pub fn store_product(&mut self, product: Product) {
        let key = QueryKey::Product(product.id);
        let generation = self.bump_generation();
        let entry = self.entries.entry(key).or_default();
        entry.data = Some(QueryData::Product(product));
        entry.error = None;
        entry.stale = false;
        entry.in_flight = false;
        entry.generation = generation;
        debug!(%key, "query data replaced");
    }

    /// Forget the cached data of `key`. Observers stay subscribed; an
    /// in-flight read is superseded and the next read goes to the server.
    pub fn remove(&mut self, key: QueryKey) {
        let generation = self.bump_generation();
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        if entry.observers.is_empty() {
            self.entries.remove(&key);
        } else {
            entry.data = None;
            entry.error = None;
            entry.stale = false;
            entry.in_flight = false;
            entry.generation = generation;
        }
        debug!(%key, "query removed");
    }

    /// Refetch observed keys after the window regains focus, when enabled.
    pub fn window_focused(&mut self) -> Vec<Ticket> {
        if !self.refetch_on_window_focus {
            return Vec::new();
        }
        let mut keys: Vec<QueryKey> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.observers.is_empty() && !e.in_flight)
            .map(|(k, _)| *k)
            .collect();
        keys.sort();
        keys.into_iter().map(|key| self.issue(key)).collect()
    }

    pub fn state(&self, key: &QueryKey) -> QueryState<QueryData> {
        self.entries
            .get(key)
            .map(|e| QueryState {
                data: e.data.clone(),
                error: e.error.clone(),
                is_fetching: e.in_flight,
                is_stale: e.stale,
            })
            .unwrap_or_default()
    }

    pub fn products(&self) -> QueryState<Vec<Product>> {
        self.state(&QueryKey::Products).map(|data| match data {
            QueryData::Products(products) => Some(products),
            QueryData::Product(_) => None,
        })
    }

    pub fn product(&self, id: ProductId) -> QueryState<Product> {
        self.state(&QueryKey::Product(id)).map(|data| match data {
            QueryData::Product(product) => Some(product),
            QueryData::Products(_) => None,
        })
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn issue(&mut self, key: QueryKey) -> Ticket {
        let generation = self.bump_generation();
        let entry = self.entries.entry(key).or_default();
        entry.generation = generation;
        entry.in_flight = true;
        debug!(%key, generation, "issuing request");

        let request = match key {
            QueryKey::Products => self.client.build_list_products(),
            QueryKey::Product(id) => self.client.build_get_product(id),
        };
        Ticket {
            key,
            generation,
            attempt: 0,
            request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEN: &str = r#"{"id":1,"product_name":"pen","product_description":"nice pen","price":5}"#;

    fn queries() -> QueryClient {
        QueryClient::new(&ClientConfig::with_base_url("http://api.test"))
    }

    fn ok(body: &str) -> Result<HttpResponse, ApiError> {
        Ok(HttpResponse::new(200, body))
    }

    fn down() -> Result<HttpResponse, ApiError> {
        Err(ApiError::NetworkError("connection refused".to_string()))
    }

    fn issued(fetch: Fetch) -> Ticket {
        match fetch {
            Fetch::Issue(ticket) => ticket,
            other => panic!("expected a ticket, got {other:?}"),
        }
    }

    #[test]
    fn keys_display_as_logical_names() {
        assert_eq!(QueryKey::Products.to_string(), "products");
        assert_eq!(QueryKey::Product(ProductId(42)).to_string(), "product:42");
    }

    #[test]
    fn concurrent_reads_share_one_request() {
        let mut q = queries();
        let key = QueryKey::Product(ProductId(1));
        let a = q.subscribe(key);
        let b = q.subscribe(key);

        let ticket = issued(q.fetch(key));
        assert_eq!(ticket.request().path, "http://api.test/product/1");
        assert_eq!(q.fetch(key), Fetch::Pending);
        assert!(q.product(ProductId(1)).is_loading());

        let settled = q.settle(ticket, ok(PEN));
        assert_eq!(settled, Settle::Settled { key, notify: vec![a, b] });
        assert_eq!(q.product(ProductId(1)).data.unwrap().product_name, "pen");
        assert_eq!(q.fetch(key), Fetch::Fresh);
    }

    #[test]
    fn failure_retries_once_then_errors() {
        let mut q = queries();
        let ticket = issued(q.fetch(QueryKey::Products));

        let Settle::Retry(retry) = q.settle(ticket, down()) else {
            panic!("expected a retry");
        };
        assert_eq!(retry.attempt(), 1);
        assert!(q.products().is_fetching);

        let settled = q.settle(retry, down());
        assert!(matches!(settled, Settle::Settled { .. }));
        let state = q.products();
        assert!(state.is_error());
        assert!(!state.is_loading());
        assert!(matches!(state.error, Some(ApiError::NetworkError(_))));
    }

    #[test]
    fn manual_retry_ignores_spent_budget() {
        let mut q = queries();
        let ticket = issued(q.fetch(QueryKey::Products));
        let Settle::Retry(retry) = q.settle(ticket, down()) else {
            panic!("expected a retry");
        };
        q.settle(retry, down());

        let manual = q.refetch(QueryKey::Products);
        assert_eq!(manual.attempt(), 0);
        assert!(matches!(q.settle(manual, ok("[]")), Settle::Settled { .. }));
        let state = q.products();
        assert_eq!(state.data, Some(Vec::new()));
        assert_eq!(state.error, None);
    }

    #[test]
    fn zero_retry_budget_errors_immediately() {
        let config = ClientConfig {
            retry: 0,
            ..ClientConfig::default()
        };
        let mut q = QueryClient::new(&config);
        let ticket = issued(q.fetch(QueryKey::Products));
        assert!(matches!(q.settle(ticket, down()), Settle::Settled { .. }));
    }

    #[test]
    fn superseded_response_is_discarded() {
        let mut q = queries();
        let key = QueryKey::Product(ProductId(1));
        let old = issued(q.fetch(key));
        let new = q.refetch(key);

        let newer = r#"{"id":1,"product_name":"pen v2","product_description":"nicer pen","price":6}"#;
        assert!(matches!(q.settle(new, ok(newer)), Settle::Settled { .. }));
        assert_eq!(q.settle(old, ok(PEN)), Settle::Discarded);
        assert_eq!(q.product(ProductId(1)).data.unwrap().product_name, "pen v2");
    }

    #[test]
    fn superseded_failure_does_not_retry() {
        let mut q = queries();
        let old = issued(q.fetch(QueryKey::Products));
        let _new = q.refetch(QueryKey::Products);
        assert_eq!(q.settle(old, down()), Settle::Discarded);
        assert!(q.products().is_fetching);
    }

    #[test]
    fn unmounted_observers_are_not_notified() {
        let mut q = queries();
        let view = q.subscribe(QueryKey::Products);
        let ticket = issued(q.fetch(QueryKey::Products));
        assert_eq!(q.observer_count(&QueryKey::Products), 1);
        assert!(q.unsubscribe(view));
        assert!(!q.unsubscribe(view));
        assert_eq!(q.observer_count(&QueryKey::Products), 0);

        let settled = q.settle(ticket, ok("[]"));
        assert_eq!(
            settled,
            Settle::Settled {
                key: QueryKey::Products,
                notify: Vec::new()
            }
        );
    }

    #[test]
    fn invalidation_forces_the_next_read() {
        let mut q = queries();
        let ticket = issued(q.fetch(QueryKey::Products));
        q.settle(ticket, ok("[]"));
        assert_eq!(q.fetch(QueryKey::Products), Fetch::Fresh);

        assert_eq!(q.invalidate(QueryKey::Products), None);
        assert!(q.products().is_stale);
        let ticket = issued(q.fetch(QueryKey::Products));
        q.settle(ticket, ok(&format!("[{PEN}]")));
        assert_eq!(q.products().data.unwrap().len(), 1);
        assert!(!q.products().is_stale);
    }

    #[test]
    fn invalidating_an_observed_key_refetches_now() {
        let mut q = queries();
        q.subscribe(QueryKey::Products);
        let ticket = issued(q.fetch(QueryKey::Products));
        q.settle(ticket, ok("[]"));

        let ticket = q.invalidate(QueryKey::Products).unwrap();
        assert_eq!(ticket.request().path, "http://api.test/products");
        assert_eq!(q.fetch(QueryKey::Products), Fetch::Pending);
    }

    #[test]
    fn invalidating_the_list_leaves_details_cached() {
        let mut q = queries();
        let key = QueryKey::Product(ProductId(1));
        let ticket = issued(q.fetch(key));
        q.settle(ticket, ok(PEN));

        q.invalidate(QueryKey::Products);
        assert_eq!(q.fetch(key), Fetch::Fresh);
    }

    #[test]
    fn failed_refetch_keeps_previous_data() {
        let config = ClientConfig {
            retry: 0,
            ..ClientConfig::default()
        };
        let mut q = QueryClient::new(&config);
        let ticket = issued(q.fetch(QueryKey::Products));
        q.settle(ticket, ok(&format!("[{PEN}]")));

        let ticket = q.refetch(QueryKey::Products);
        q.settle(ticket, Ok(HttpResponse::new(503, "unavailable")));
        let state = q.products();
        assert_eq!(state.data.unwrap().len(), 1);
        assert_eq!(state.error.and_then(|e| e.status()), Some(503));
    }

    #[test]
    fn not_found_settles_into_error() {
        let mut q = queries();
        let key = QueryKey::Product(ProductId(42));
        let ticket = issued(q.fetch(key));
        let Settle::Retry(retry) = q.settle(ticket, Ok(HttpResponse::new(404, ""))) else {
            panic!("expected a retry");
        };
        q.settle(retry, Ok(HttpResponse::new(404, "")));
        assert_eq!(q.product(ProductId(42)).error, Some(ApiError::NotFound));
    }

    #[test]
    fn focus_refetch_is_off_by_default() {
        let mut q = queries();
        q.subscribe(QueryKey::Products);
        let ticket = issued(q.fetch(QueryKey::Products));
        q.settle(ticket, ok("[]"));
        assert!(q.window_focused().is_empty());
    }

    #[test]
    fn focus_refetch_covers_observed_keys_when_enabled() {
        let config = ClientConfig {
            refetch_on_window_focus: true,
            ..ClientConfig::default()
        };
        let mut q = QueryClient::new(&config);
        q.subscribe(QueryKey::Products);
        let ticket = issued(q.fetch(QueryKey::Products));
        q.settle(ticket, ok("[]"));
        let unobserved = issued(q.fetch(QueryKey::Product(ProductId(1))));
        q.settle(unobserved, ok(PEN));

        let tickets = q.window_focused();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].key(), QueryKey::Products);
    }

    #[test]
    fn stored_product_replaces_the_detail_and_supersedes_reads() {
        let mut q = queries();
        let key = QueryKey::Product(ProductId(1));
        let ticket = issued(q.fetch(key));
        q.settle(ticket, ok(PEN));
        let late = q.refetch(key);

        let mut updated: Product = serde_json::from_str(PEN).unwrap();
        updated.price = 7.0;
        q.store_product(updated);

        assert_eq!(q.fetch(key), Fetch::Fresh);
        assert_eq!(q.settle(late, ok(PEN)), Settle::Discarded);
        let state = q.product(ProductId(1));
        assert_eq!(state.data.unwrap().price, 7.0);
        assert!(!state.is_fetching);
    }

    #[test]
    fn removed_detail_is_fetched_again() {
        let mut q = queries();
        let key = QueryKey::Product(ProductId(1));
        let ticket = issued(q.fetch(key));
        q.settle(ticket, ok(PEN));

        q.remove(key);
        assert_eq!(q.product(ProductId(1)), QueryState::default());
        let ticket = issued(q.fetch(key));
        assert_eq!(ticket.request().path, "http://api.test/product/1");
    }

    #[test]
    fn removing_an_observed_key_keeps_its_observers() {
        let mut q = queries();
        let key = QueryKey::Product(ProductId(1));
        let view = q.subscribe(key);
        let stale = issued(q.fetch(key));

        q.remove(key);
        assert_eq!(q.observer_count(&key), 1);
        assert_eq!(q.settle(stale, ok(PEN)), Settle::Discarded);
        assert_eq!(q.product(ProductId(1)).data, None);
        assert!(q.unsubscribe(view));
    }
}
