//! Path → view dispatch.
//!
//! Routes are a static table of patterns. `:id` segments are parsed into a
//! `ProductId` before any view sees them; a bad id is a `RouteError`, never a
//! request for product 0.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::query::QueryKey;
use crate::types::ProductId;

/// A resolved view with its parsed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ProductList,
    AddProduct,
    EditProduct(ProductId),
    ProductDetails(ProductId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no view matches {0:?}")]
    NoMatch(String),

    #[error("invalid product id {0:?}")]
    InvalidId(String),
}

#[derive(Debug, Clone, Copy)]
enum View {
    List,
    Add,
    Edit,
    Details,
}

const ROUTES: &[(&str, View)] = &[
    ("/", View::List),
    ("/add", View::Add),
    ("/edit/:id", View::Edit),
    ("/product/:id", View::Details),
];

enum Match<'a> {
    No,
    Exact(Option<&'a str>),
    MissingParam,
}

impl Route {
    /// Resolve a path such as `/product/42`. Query strings and fragments are ignored.
    pub fn resolve(path: &str) -> Result<Route, RouteError> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        for (pattern, view) in ROUTES {
            match match_pattern(pattern, &segments) {
                Match::No => continue,
                Match::MissingParam => return Err(RouteError::InvalidId(String::new())),
                Match::Exact(param) => {
                    return match view {
                        View::List => Ok(Route::ProductList),
                        View::Add => Ok(Route::AddProduct),
                        View::Edit => parse_id(param.unwrap_or_default()).map(Route::EditProduct),
                        View::Details => {
                            parse_id(param.unwrap_or_default()).map(Route::ProductDetails)
                        }
                    };
                }
            }
        }
        Err(RouteError::NoMatch(path.to_string()))
    }

    pub fn path(&self) -> String {
        match self {
            Route::ProductList => "/".to_string(),
            Route::AddProduct => "/add".to_string(),
            Route::EditProduct(id) => format!("/edit/{id}"),
            Route::ProductDetails(id) => format!("/product/{id}"),
        }
    }

    /// The cached read this view depends on, if any.
    pub fn query_key(&self) -> Option<QueryKey> {
        match self {
            Route::ProductList => Some(QueryKey::Products),
            Route::AddProduct => None,
            Route::EditProduct(id) | Route::ProductDetails(id) => Some(QueryKey::Product(*id)),
        }
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::resolve(s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn match_pattern<'a>(pattern: &str, segments: &[&'a str]) -> Match<'a> {
    let parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let mut param = None;

    for (i, part) in parts.iter().enumerate() {
        match (part.strip_prefix(':'), segments.get(i)) {
            (Some(_), Some(value)) => param = Some(*value),
            (Some(_), None) if i == segments.len() && i > 0 => return Match::MissingParam,
            (None, Some(value)) if value == part => {}
            _ => return Match::No,
        }
    }
    if segments.len() == parts.len() {
        Match::Exact(param)
    } else {
        Match::No
    }
}

/// Ids are positive integers; 0 is never assigned by the server.
fn parse_id(raw: &str) -> Result<ProductId, RouteError> {
    match raw.parse::<ProductId>() {
        Ok(id) if id.0 > 0 => Ok(id),
        _ => Err(RouteError::InvalidId(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_view() {
        assert_eq!(Route::resolve("/"), Ok(Route::ProductList));
        assert_eq!(Route::resolve(""), Ok(Route::ProductList));
        assert_eq!(Route::resolve("/add"), Ok(Route::AddProduct));
        assert_eq!(Route::resolve("/edit/3"), Ok(Route::EditProduct(ProductId(3))));
        assert_eq!(
            Route::resolve("/product/42"),
            Ok(Route::ProductDetails(ProductId(42)))
        );
    }

    #[test]
    fn trailing_slash_and_query_are_ignored() {
        assert_eq!(
            Route::resolve("/product/42/?tab=info"),
            Ok(Route::ProductDetails(ProductId(42)))
        );
    }

    #[test]
    fn bad_ids_are_rejected_before_any_request() {
        assert_eq!(
            Route::resolve("/product/abc"),
            Err(RouteError::InvalidId("abc".to_string()))
        );
        assert_eq!(
            Route::resolve("/edit/-1"),
            Err(RouteError::InvalidId("-1".to_string()))
        );
        assert_eq!(
            Route::resolve("/product/0"),
            Err(RouteError::InvalidId("0".to_string()))
        );
        assert_eq!(Route::resolve("/edit"), Err(RouteError::InvalidId(String::new())));
        assert_eq!(Route::resolve("/product/"), Err(RouteError::InvalidId(String::new())));
    }

    #[test]
    fn unknown_paths_do_not_match() {
        assert_eq!(
            Route::resolve("/products/1/reviews"),
            Err(RouteError::NoMatch("/products/1/reviews".to_string()))
        );
        assert!(matches!(Route::resolve("/add/1"), Err(RouteError::NoMatch(_))));
    }

    #[test]
    fn paths_round_trip() {
        for route in [
            Route::ProductList,
            Route::AddProduct,
            Route::EditProduct(ProductId(9)),
            Route::ProductDetails(ProductId(9)),
        ] {
            assert_eq!(route.path().parse::<Route>(), Ok(route));
        }
    }

    #[test]
    fn views_map_to_query_keys() {
        assert_eq!(Route::ProductList.query_key(), Some(QueryKey::Products));
        assert_eq!(
            Route::EditProduct(ProductId(2)).query_key(),
            Some(QueryKey::Product(ProductId(2)))
        );
        assert_eq!(Route::AddProduct.query_key(), None);
    }
}
