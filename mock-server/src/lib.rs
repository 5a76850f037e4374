use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: u64,
    pub product_name: String,
    pub product_description: String,
    pub price: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductInput {
    pub product_name: String,
    pub product_description: String,
    pub price: f64,
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    products: BTreeMap<u64, Product>,
}

impl Store {
    fn insert(&mut self, input: ProductInput) -> Product {
        self.next_id += 1;
        let product = Product {
            id: self.next_id,
            product_name: input.product_name,
            product_description: input.product_description,
            price: input.price,
        };
        self.products.insert(product.id, product.clone());
        product
    }
}

pub type Db = Arc<RwLock<Store>>;

/// 404 body in the shape the real backend uses.
pub struct NotFound;

impl IntoResponse for NotFound {
    fn into_response(self) -> Response {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Product not found" })),
        )
            .into_response()
    }
}

/// The three products the real backend seeds into an empty database.
pub fn sample_products() -> Vec<ProductInput> {
    [("pen", "nice pen", 5.0), ("box", "nice box", 50.0), ("scale", "nice scale", 15.0)]
        .into_iter()
        .map(|(name, description, price)| ProductInput {
            product_name: name.to_string(),
            product_description: description.to_string(),
            price,
        })
        .collect()
}

pub fn app() -> Router {
    app_with(Vec::new())
}

pub fn seeded_app() -> Router {
    app_with(sample_products())
}

pub fn app_with(products: Vec<ProductInput>) -> Router {
    let mut store = Store::default();
    for product in products {
        store.insert(product);
    }
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/", get(welcome))
        .route("/products", get(list_products))
        .route("/product", post(create_product))
        .route(
            "/product/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .with_state(db)
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn welcome() -> Json<&'static str> {
    Json("Hi, welcome!")
}

async fn list_products(State(db): State<Db>) -> Json<Vec<Product>> {
    let store = db.read().await;
    Json(store.products.values().cloned().collect())
}

async fn create_product(State(db): State<Db>, Json(input): Json<ProductInput>) -> Json<Product> {
    let product = db.write().await.insert(input);
    info!(id = product.id, "product created");
    Json(product)
}

async fn get_product(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Product>, NotFound> {
    let store = db.read().await;
    store.products.get(&id).cloned().map(Json).ok_or(NotFound)
}

async fn update_product(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>, NotFound> {
    let mut store = db.write().await;
    let product = store.products.get_mut(&id).ok_or(NotFound)?;
    product.product_name = input.product_name;
    product.product_description = input.product_description;
    product.price = input.price;
    info!(id, "product updated");
    Ok(Json(product.clone()))
}

async fn delete_product(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, NotFound> {
    let mut store = db.write().await;
    store.products.remove(&id).ok_or(NotFound)?;
    info!(id, "product deleted");
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
