//! Field rules for product drafts.
//!
//! All rules run on every validation pass so the form can show every
//! failing field at once.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::types::ProductDraft;

/// An editable field of a product draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    ProductName,
    ProductDescription,
    Price,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::ProductName, Field::ProductDescription, Field::Price];

    /// Wire name of the field.
    pub fn name(self) -> &'static str {
        match self {
            Field::ProductName => "product_name",
            Field::ProductDescription => "product_description",
            Field::Price => "price",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::ProductName => "Product Name",
            Field::ProductDescription => "Product Description",
            Field::Price => "Price",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed field rule. The display text is what the form shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Product name is required")]
    NameRequired,
    #[error("Product description is required")]
    DescriptionRequired,
    #[error("Price must be greater than 0")]
    PriceNotPositive,
}

impl ValidationError {
    pub fn field(self) -> Field {
        match self {
            ValidationError::NameRequired => Field::ProductName,
            ValidationError::DescriptionRequired => Field::ProductDescription,
            ValidationError::PriceNotPositive => Field::Price,
        }
    }
}

/// Field errors keyed by field, at most one per field.
pub type FieldErrors = BTreeMap<Field, ValidationError>;

/// Run every rule against `draft`. An empty map means the draft may be sent.
pub fn validate_draft(draft: &ProductDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if draft.product_name.trim().is_empty() {
        errors.insert(Field::ProductName, ValidationError::NameRequired);
    }
    if draft.product_description.trim().is_empty() {
        errors.insert(Field::ProductDescription, ValidationError::DescriptionRequired);
    }
    // NaN fails this comparison too.
    if !(draft.price > 0.0) {
        errors.insert(Field::Price, ValidationError::PriceNotPositive);
    }
    errors
}

/// Price text as typed by the user. Like a browser's number coercion, only
/// the leading number counts (`"12abc"` is 12). Text without one, or one that
/// is not finite, becomes `0`, which the price rule rejects.
pub fn parse_price(input: &str) -> f64 {
    let input = input.trim_start();
    match input[..numeric_prefix_len(input)].parse::<f64>() {
        Ok(price) if price.is_finite() => price,
        _ => 0.0,
    }
}

/// Byte length of the longest `[+-]digits[.digits][e[+-]digits]` prefix.
fn numeric_prefix_len(input: &str) -> usize {
    let bytes = input.as_bytes();
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    end
}
