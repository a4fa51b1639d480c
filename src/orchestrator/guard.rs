//! Pre-resolver shortcuts: greetings, help requests and the domain guard.
//!
//! All local pattern checks; nothing here calls a provider.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::response::{GREETING_RESPONSE, HELP_RESPONSE};

static GREETING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(?:hola|hey|buenas?|buenos?\s+d[ií]as?|buenas?\s+tardes?|buenas?\s+noches?)[\s!.?]*$",
        r"^(?:hi|hello|saludos?)[\s!.?]*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static HELP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:qu[eé]|que)\s+(?:puedes?|puede)\s+hacer",
        r"(?:qu[eé]|que)\s+(?:sabes?|sabe)\s+hacer",
        r"(?:ayuda|help)\b",
        r"(?:c[oó]mo|como)\s+(?:funciona|te\s+uso)",
        r"(?:qu[eé]|que)\s+(?:opciones|funciones|servicios)",
        r"(?:para\s+)?(?:qu[eé]|que)\s+(?:sirves?|eres)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Substring probes; a hit anywhere in the query marks it as in-domain.
const DOMAIN_KEYWORDS: &[&str] = &[
    "libro", "libros", "leer", "lectura", "autor", "autora", "novela", "novelas", "comprar",
    "compra", "carrito", "pedido", "orden", "pago", "pagar", "checkout", "stock", "disponible",
    "recomend", "buscar", "busca", "busco", "catálogo", "catalogo", "precio", "tienda",
    "librería", "libreria", "genero", "género", "ficción", "ficcion", "fantasia", "fantasía",
    "ciencia", "clásico", "clasico", "romance", "terror", "horror", "book", "cart", "order",
    "pay", "search", "recommend", "agregar", "añadir", "eliminar", "quitar", "cancelar",
    "detalle", "detalles", "información", "informacion", "hola", "ayuda", "ayudar", "help",
    "qué puedes", "que puedes",
];

/// Canned response for greetings and help requests, checked before intent
/// resolution.
pub fn help_or_greeting(query: &str) -> Option<&'static str> {
    let q = query.to_lowercase();
    let q = q.trim();

    if GREETING_PATTERNS.iter().any(|p| p.is_match(q)) {
        return Some(GREETING_RESPONSE);
    }
    if HELP_PATTERNS.iter().any(|p| p.is_match(q)) {
        return Some(HELP_RESPONSE);
    }
    None
}

/// Domain guard for unclassified queries. Short queries pass: they are
/// usually fragments of an in-domain conversation.
pub fn is_domain_relevant(query: &str) -> bool {
    let q = query.to_lowercase();
    if DOMAIN_KEYWORDS.iter().any(|kw| q.contains(kw)) {
        return true;
    }
    query.split_whitespace().count() <= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_get_the_greeting() {
        assert_eq!(help_or_greeting("hola"), Some(GREETING_RESPONSE));
        assert_eq!(help_or_greeting("Buenos días!"), Some(GREETING_RESPONSE));
        assert_eq!(help_or_greeting("hello"), Some(GREETING_RESPONSE));
    }

    #[test]
    fn greeting_must_be_the_whole_query() {
        assert_eq!(help_or_greeting("hola, busca libros de terror"), None);
    }

    #[test]
    fn help_requests_get_the_capability_list() {
        assert_eq!(help_or_greeting("qué puedes hacer?"), Some(HELP_RESPONSE));
        assert_eq!(help_or_greeting("necesito ayuda"), Some(HELP_RESPONSE));
    }

    #[test]
    fn domain_guard_passes_bookstore_queries() {
        assert!(is_domain_relevant("busca libros de terror"));
        assert!(is_domain_relevant("cuánto cuesta el envío de mi pedido"));
    }

    #[test]
    fn domain_guard_passes_short_fragments() {
        assert!(is_domain_relevant("el segundo"));
    }

    #[test]
    fn domain_guard_rejects_long_off_topic_queries() {
        assert!(!is_domain_relevant(
            "explícame la teoría de la relatividad general de Einstein por favor"
        ));
    }
}
