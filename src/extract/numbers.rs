//! Context-gated number extraction.
//!
//! The same digits mean different things in different requests: "compra 2
//! Dune" carries a quantity, "pagar orden #7" an order id. Each context only
//! accepts its own marker patterns; in particular an order id is never pulled
//! from a bare number.

use once_cell::sync::Lazy;
use regex::Regex;

static QTY_UNITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:copias?|unidades?|ejemplares?)").unwrap());

static QTY_AFTER_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:compra|dame|ponme|tráeme|traeme|agrega|añade|buy|add|get)\s+(\d+)\s+")
        .unwrap()
});

static SMALL_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})\b").unwrap());

static ORDER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:orden|pedido|order)\s*#?\s*(\d+)").unwrap());

static ANY_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberContext {
    /// Purchase quantity, bounded to `1..=99`.
    Quantity,
    /// Order id; requires an explicit orden/pedido/order marker.
    OrderId,
    /// First number anywhere.
    Any,
}

pub fn extract_number(query: &str, context: NumberContext) -> Option<i64> {
    match context {
        NumberContext::Quantity => {
            // Out-of-range hits fall through to the next pattern.
            [&*QTY_UNITS, &*QTY_AFTER_VERB, &*SMALL_NUMBER]
                .into_iter()
                .filter_map(|re| first_capture(re, query))
                .find(|n| (1..=99).contains(n))
        }
        NumberContext::OrderId => first_capture(&ORDER_MARKER, query),
        NumberContext::Any => first_capture(&ANY_NUMBER, query),
    }
}

fn first_capture(re: &Regex, query: &str) -> Option<i64> {
    re.captures(query)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_from_unit_phrase() {
        assert_eq!(extract_number("quiero 3 copias de Dune", NumberContext::Quantity), Some(3));
        assert_eq!(extract_number("2 ejemplares por favor", NumberContext::Quantity), Some(2));
    }

    #[test]
    fn quantity_after_command_verb() {
        assert_eq!(extract_number("compra 2 Dune", NumberContext::Quantity), Some(2));
        assert_eq!(extract_number("add 4 The Alchemist", NumberContext::Quantity), Some(4));
    }

    #[test]
    fn standalone_small_number_counts_as_quantity() {
        assert_eq!(extract_number("Dune, 2", NumberContext::Quantity), Some(2));
    }

    #[test]
    fn quantity_out_of_bounds_rejected() {
        assert_eq!(extract_number("quiero 500 copias", NumberContext::Quantity), None);
        assert_eq!(extract_number("0 copias", NumberContext::Quantity), None);
    }

    #[test]
    fn order_id_requires_marker() {
        assert_eq!(extract_number("pagar orden #7", NumberContext::OrderId), Some(7));
        assert_eq!(extract_number("estado del pedido 12", NumberContext::OrderId), Some(12));
        assert_eq!(extract_number("pagar 7", NumberContext::OrderId), None);
    }

    #[test]
    fn any_takes_first_number() {
        assert_eq!(extract_number("entre 10 y 20", NumberContext::Any), Some(10));
        assert_eq!(extract_number("sin numeros", NumberContext::Any), None);
    }
}
