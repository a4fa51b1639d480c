//! Keyword extraction, three phases with early exit:
//!
//! 1. Quoted fragments are taken verbatim as exact titles (at most 3).
//! 2. Capitalized title phrases, allowing lowercase connector words between
//!    the capitalized runs ("One Hundred Years of Solitude"). Single
//!    capitalized words count unless they are command verbs.
//! 3. Remaining tokens minus a reduced stop-word list. The list deliberately
//!    keeps title-forming words like "the" out of phase 2 untouched.
//!
//! At most five keywords come back in every case.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());

// Capitalized word runs with optional lowercase connectors between them.
static TITLE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b([A-ZÁÉÍÓÚÑ][a-záéíóúñA-ZÁÉÍÓÚÑ]*(?:\s+(?:the|of|a|an|and|in|to|for|del|de|la|el|los|las|y)\s+[A-ZÁÉÍÓÚÑ][a-záéíóúñA-ZÁÉÍÓÚÑ]*|(?:\s+[A-ZÁÉÍÓÚÑ][a-záéíóúñA-ZÁÉÍÓÚÑ]*))*)\b",
    )
    .unwrap()
});

static LONG_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-zA-ZáéíóúñÁÉÍÓÚÑ]{3,}\b").unwrap());

// Keeps digits so queries like "1984" survive as keywords.
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-zA-ZáéíóúñÁÉÍÓÚÑ0-9]{2,}\b").unwrap());

/// Command verbs that look like proper nouns at sentence start but never are
/// titles on their own.
static ACTION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "busca", "busco", "buscar", "compra", "comprar", "agrega", "agregar", "dame", "ponme",
        "muestra", "mostrar", "quiero", "deseo", "ver", "añadir", "eliminar", "quitar", "sacar",
        "pagar", "cancelar", "recomienda", "sugiere", "hola", "buenas", "gracias", "buy", "add",
        "remove", "search", "find", "show", "get", "want",
    ]
    .into_iter()
    .collect()
});

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "is", "are", "was", "were", "be", "been", "do", "does", "did", "have", "has", "had",
        "will", "would", "could", "should", "may", "might", "can", "shall", "i", "me", "my",
        "you", "your", "we", "our", "they", "them", "this", "that", "these", "those", "it",
        "its", "for", "to", "from", "with", "about", "in", "on", "at", "by", "and", "or", "but",
        "not", "no", "if", "so", "as", "what", "which", "who", "whom", "how", "when", "where",
        "why", "want", "need", "like", "get", "find", "show", "give", "tell", "search", "look",
        "looking", "please", "help", "book", "books", "buy", "purchase", "recommend",
        "recommendation", "available", "stock", "cart", "add", "remove", "order", "pay",
        "cancel", "check", "status", "details", "detail", "information", "info", "quiero",
        "buscar", "ver", "dame", "muestra", "mostrar", "tiene", "tienen", "hay", "del", "de",
        "el", "la", "los", "las", "un", "una", "unos", "unas", "mi", "mis", "tu", "tus", "por",
        "para", "con", "sin", "que", "como", "donde", "cuando", "porque", "pero", "este",
        "esta", "estos", "estas", "ese", "esa", "libro", "libros", "comprar", "agregar",
        "añadir", "carrito", "pagar", "cancelar", "recomendar", "recomendación", "disponible",
        "estado", "pedido", "orden", "quitar", "eliminar", "sacar", "también", "algo", "algún",
        "alguna", "más", "menos", "puedo", "puedes", "puede", "podría", "necesito", "necesitas",
        "favor", "gracias", "hola", "buenas", "cuánto", "cuántos", "cuál", "cuáles", "sobre",
        "quisiera", "deseo", "gustaría", "prefiero", "tienda", "venta", "catálogo", "precio",
        "cuesta", "cuanto", "cuantos", "cual", "cuales", "esos", "esas", "aquel", "aquella",
        "mío", "tuyo", "suyo", "nuestro", "vuestro", "ser", "estar", "tener", "hacer", "poder",
        "decir", "saber", "dar", "llegar", "llevar", "ponme", "tráeme", "traeme", "compra",
        "agrega",
    ]
    .into_iter()
    .collect()
});

pub fn extract_keywords(query: &str) -> Vec<String> {
    // Phase 1: quoted fragments are exact titles.
    let quoted: Vec<String> = QUOTED
        .captures_iter(query)
        .take(3)
        .map(|c| c[1].to_string())
        .collect();
    if !quoted.is_empty() {
        return quoted;
    }

    // Phase 2: capitalized title phrases.
    let mut title_phrases: Vec<String> = Vec::new();
    for m in TITLE_PHRASE.find_iter(query) {
        let phrase = m.as_str();
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.len() >= 2 {
            title_phrases.push(phrase.to_string());
        } else if words.len() == 1 && !ACTION_WORDS.contains(words[0].to_lowercase().as_str()) {
            title_phrases.push(phrase.to_string());
        }
    }

    let lowered = query.to_lowercase();

    if !title_phrases.is_empty() {
        let title_words: HashSet<String> = title_phrases
            .iter()
            .flat_map(|p| p.split_whitespace())
            .map(|w| w.to_lowercase())
            .collect();
        let mut out = title_phrases;
        for m in LONG_WORD.find_iter(&lowered) {
            let w = m.as_str();
            if !STOP_WORDS.contains(w) && !title_words.contains(w) {
                out.push(w.to_string());
            }
        }
        out.truncate(5);
        return out;
    }

    // Phase 3: plain tokens minus stop words.
    WORD.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(w))
        .take(5)
        .map(|w| w.to_string())
        .collect()
}
