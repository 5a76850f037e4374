//! Text rendering for the four screens and their loading/error states.
//!
//! Every function returns the screen as a `String`; the shell decides where
//! it goes.

use product_core::{
    ApiError, DeleteFlow, Field, FormMode, FormPhase, Product, ProductForm, QueryState, RouteError,
};

/// A user-facing operation, for choosing the failure banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    LoadProducts,
    LoadProduct,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::LoadProducts => "Failed to load products. Please try again.",
            Operation::LoadProduct => "Failed to load product. Please try again.",
            Operation::Create => "Failed to create product. Please try again.",
            Operation::Update => "Failed to update product. Please try again.",
            Operation::Delete => "Failed to delete product. Please try again.",
        }
    }
}

pub const RETRY_HINT: &str = "Type `retry` to try again.";

pub fn product_list(state: &QueryState<Vec<Product>>) -> String {
    if state.is_loading() {
        return "Loading...\n".to_string();
    }
    let Some(products) = &state.data else {
        return error_banner(Operation::LoadProducts, state.error.as_ref());
    };

    let mut out = String::from("Products\n");
    if let Some(error) = &state.error {
        out.push_str(&format!("(showing cached data: {error})\n"));
    }
    if products.is_empty() {
        out.push_str("No products\nGet started by creating a new product: /add\n");
        return out;
    }
    for product in products {
        let id = product.id;
        out.push_str(&format!(
            "#{id}  {}  ${}\n    {}\n    view: /product/{id}  edit: /edit/{id}  delete: delete {id}\n",
            product.product_name, product.price, product.product_description,
        ));
    }
    out.push_str("Add New Product: /add\n");
    out
}

pub fn product_details(state: &QueryState<Product>) -> String {
    if state.is_loading() {
        return "Loading...\n".to_string();
    }
    let Some(product) = &state.data else {
        return match &state.error {
            Some(ApiError::NotFound) | None => not_found(),
            Some(error) => error_banner(Operation::LoadProduct, Some(error)),
        };
    };

    format!(
        "Product Information\n  Product ID:   {id}\n  Product Name: {}\n  Description:  {}\n  Price:        ${}\nEdit: /edit/{id}  Back to Products: /\n",
        product.product_name,
        product.product_description,
        product.price,
        id = product.id,
    )
}

pub fn not_found() -> String {
    "Product not found\nThe product you're looking for doesn't exist.\nBack to Products: /\n"
        .to_string()
}

pub fn error_banner(operation: Operation, error: Option<&ApiError>) -> String {
    let mut out = format!("Error: {}\n", operation.failure_message());
    if let Some(error) = error {
        out.push_str(&format!("  ({error})\n"));
    }
    out.push_str(RETRY_HINT);
    out.push('\n');
    out
}

pub fn form_title(form: &ProductForm) -> &'static str {
    match form.mode() {
        FormMode::Create => "Add New Product",
        FormMode::Edit(_) => "Edit Product",
    }
}

/// Current draft, field errors and submission state.
pub fn form(form: &ProductForm) -> String {
    let mut out = format!("{}\n", form_title(form));
    let draft = form.draft();
    for field in Field::ALL {
        let value = match field {
            Field::ProductName => draft.product_name.clone(),
            Field::ProductDescription => draft.product_description.clone(),
            Field::Price => draft.price.to_string(),
        };
        out.push_str(&format!("  {} *: {value}\n", field.label()));
        if let Some(error) = form.error(field) {
            out.push_str(&format!("    ! {error}\n"));
        }
    }
    match form.phase() {
        FormPhase::Editing => {}
        FormPhase::Submitting => out.push_str(match form.mode() {
            FormMode::Create => "Creating...\n",
            FormMode::Edit(_) => "Updating...\n",
        }),
        FormPhase::Succeeded(product) => out.push_str(&format!("Saved product #{}\n", product.id)),
        FormPhase::Failed(_) => {
            let operation = match form.mode() {
                FormMode::Create => Operation::Create,
                FormMode::Edit(_) => Operation::Update,
            };
            out.push_str(&format!("Error: {}\n", operation.failure_message()));
        }
    }
    out
}

pub fn delete_dialog(flow: &DeleteFlow) -> String {
    let Some(prompt) = flow.prompt() else {
        return String::new();
    };
    let mut out = format!("Delete Product\n{prompt}\n");
    if flow.last_error().is_some() {
        out.push_str(&format!("Error: {}\n", Operation::Delete.failure_message()));
    }
    out.push_str("Type `yes` to delete or `no` to cancel.\n");
    out
}

pub fn route_error(error: &RouteError) -> String {
    match error {
        RouteError::InvalidId(_) => format!("Invalid product id: {error}\nBack to Products: /\n"),
        RouteError::NoMatch(_) => format!("Page not found: {error}\nBack to Products: /\n"),
    }
}
