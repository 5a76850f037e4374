//! Line-oriented event loop over the views.
//!
//! Typing a path navigates like an address bar. Navigating unmounts the
//! previous view's query observer and mounts the next one, so a view that is
//! gone never receives a late result.

use std::io::{self, BufRead, Write};

use product_core::{
    DeleteFlow, DeleteState, Field, FormMode, ObserverId, ProductApp, ProductForm, ProductId,
    Route, SubmitError, Transport,
};
use tracing::{debug, warn};

use crate::views;

const HELP: &str = "\
Commands:
  /                 product list
  /add              create a product
  /product/<id>     product details
  /edit/<id>        edit a product
  delete <id>       delete a product from the list (asks for confirmation)
  yes | no          answer the delete confirmation
  retry             reload the current view
  help              show this help
  quit              leave
In forms, press enter to keep the shown value or type `cancel` to leave.
";

pub struct Shell<T> {
    app: ProductApp<T>,
    route: Route,
    observer: Option<ObserverId>,
    delete: DeleteFlow,
}

impl<T: Transport> Shell<T> {
    pub fn new(app: ProductApp<T>) -> Self {
        Self {
            app,
            route: Route::ProductList,
            observer: None,
            delete: DeleteFlow::new(),
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn delete_state(&self) -> &DeleteState {
        self.delete.state()
    }

    /// Resolve `path` and navigate there. Bad paths render an error and stay put.
    pub fn open<W: Write>(&mut self, path: &str, out: &mut W) -> io::Result<()> {
        match Route::resolve(path) {
            Ok(route) => self.navigate(route, out),
            Err(e) => {
                debug!(path, error = %e, "route rejected");
                out.write_all(views::route_error(&e).as_bytes())
            }
        }
    }

    pub fn navigate<W: Write>(&mut self, route: Route, out: &mut W) -> io::Result<()> {
        if let Some(observer) = self.observer.take() {
            self.app.unmount(observer);
        }
        self.delete.cancel();
        self.route = route;
        debug!(%route, "navigated");
        if let Some(key) = route.query_key() {
            self.observer = Some(self.app.mount(key));
        }
        self.render(out)
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let queries = self.app.queries();
        let screen = match self.route {
            Route::ProductList => views::product_list(&queries.products()),
            Route::ProductDetails(id) => views::product_details(&queries.product(id)),
            Route::AddProduct => views::form(&ProductForm::create()),
            Route::EditProduct(id) => {
                let state = queries.product(id);
                match &state.data {
                    Some(product) => views::form(&ProductForm::edit(product)),
                    None => views::product_details(&state),
                }
            }
        };
        out.write_all(screen.as_bytes())
    }

    /// Manual retry of the current view's read.
    pub fn retry<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if let Some(key) = self.route.query_key() {
            self.app.refetch(key);
        }
        self.render(out)
    }

    /// A fresh form for the current route, if it is a form whose data is loaded.
    pub fn open_form(&self) -> Option<ProductForm> {
        match self.route {
            Route::AddProduct => Some(ProductForm::create()),
            Route::EditProduct(id) => self
                .app
                .queries()
                .product(id)
                .data
                .map(|product| ProductForm::edit(&product)),
            _ => None,
        }
    }

    /// Submit `form`. On success returns to the list; otherwise the form is
    /// re-rendered with its errors and the draft kept.
    pub fn submit_form<W: Write>(&mut self, form: &mut ProductForm, out: &mut W) -> io::Result<bool> {
        match self.app.submit(form) {
            Ok(product) => {
                let verb = match form.mode() {
                    FormMode::Create => "Created",
                    FormMode::Edit(_) => "Updated",
                };
                writeln!(out, "{verb} product #{}", product.id)?;
                self.navigate(Route::ProductList, out)?;
                Ok(true)
            }
            Err(SubmitError::Invalid(_) | SubmitError::Failed(_)) => {
                out.write_all(views::form(form).as_bytes())?;
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "submit ignored");
                Ok(false)
            }
        }
    }

    /// Open the delete dialog for a product in the loaded list.
    pub fn request_delete<W: Write>(&mut self, raw_id: &str, out: &mut W) -> io::Result<bool> {
        if self.route != Route::ProductList {
            writeln!(out, "Deleting is done from the product list: /")?;
            return Ok(false);
        }
        let product = raw_id.trim().parse::<ProductId>().ok().and_then(|id| {
            self.app
                .queries()
                .products()
                .data
                .and_then(|products| products.into_iter().find(|p| p.id == id))
        });
        let Some(product) = product else {
            writeln!(out, "No product {raw_id:?} in the list.")?;
            return Ok(false);
        };
        self.delete.select(&product);
        out.write_all(views::delete_dialog(&self.delete).as_bytes())?;
        Ok(true)
    }

    /// Answer the open delete dialog.
    pub fn answer_delete<W: Write>(&mut self, confirmed: bool, out: &mut W) -> io::Result<()> {
        if !confirmed {
            if self.delete.cancel() {
                writeln!(out, "Cancelled.")?;
            }
            return Ok(());
        }
        match self.app.confirm_delete(&mut self.delete) {
            Ok(Some(confirmation)) => {
                writeln!(out, "{}", confirmation.message)?;
                self.render(out)
            }
            Ok(None) => writeln!(out, "Nothing to confirm."),
            Err(_) => out.write_all(views::delete_dialog(&self.delete).as_bytes()),
        }
    }

    /// Run commands from `input` until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        let mut lines = input.lines();
        self.navigate(Route::ProductList, out)?;
        loop {
            write!(out, "> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                return Ok(());
            };
            let line = line?;
            let command = line.trim();
            match command {
                "" => {}
                "quit" | "exit" => return Ok(()),
                "help" => out.write_all(HELP.as_bytes())?,
                "retry" => self.retry(out)?,
                "yes" | "y" => self.answer_delete(true, out)?,
                "no" | "n" => self.answer_delete(false, out)?,
                _ if command.starts_with('/') => {
                    self.open(command, out)?;
                    if let Some(mut form) = self.open_form() {
                        self.fill_form(&mut form, &mut lines, out)?;
                    }
                }
                _ => match command.strip_prefix("delete ") {
                    Some(id) => {
                        self.request_delete(id, out)?;
                    }
                    None => writeln!(out, "Unknown command {command:?}. Type `help`.")?,
                },
            }
        }
    }

    /// Prompt for each field, then submit; repeat until saved, cancelled or out of input.
    fn fill_form<I, W>(&mut self, form: &mut ProductForm, lines: &mut I, out: &mut W) -> io::Result<()>
    where
        I: Iterator<Item = io::Result<String>>,
        W: Write,
    {
        loop {
            for field in Field::ALL {
                let draft = form.draft();
                let current = match field {
                    Field::ProductName => draft.product_name.clone(),
                    Field::ProductDescription => draft.product_description.clone(),
                    Field::Price => draft.price.to_string(),
                };
                write!(out, "{} [{current}]: ", field.label())?;
                out.flush()?;
                let Some(line) = lines.next() else {
                    return Ok(());
                };
                let line = line?;
                if line.trim() == "cancel" {
                    writeln!(out, "Cancelled.")?;
                    return self.navigate(Route::ProductList, out);
                }
                if !line.is_empty() {
                    form.set_field(field, &line);
                }
            }
            if self.submit_form(form, out)? {
                return Ok(());
            }
            writeln!(out, "Fix the fields above and submit again, or type `cancel`.")?;
        }
    }
}
