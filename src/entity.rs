//! Catalog entity resolution: which book is the user talking about?
//!
//! Three short-circuiting tiers over the full catalog:
//!
//! 1. exact case-insensitive title substring, longest title first
//! 2. AND: the best-scoring title contains every extracted keyword
//! 3. OR with scoring; a sole or strictly-top scorer wins, ties are returned
//!    as an ambiguity of at most five candidates
//!
//! Pure function of its inputs; callers load the catalog.

use tracing::debug;

use crate::extract::extract_keywords;
use crate::store::models::Book;

#[derive(Debug, Clone)]
pub enum EntityResolution {
    Found(Book),
    /// Tied top scorers, at most five, for the user to pick from.
    Ambiguous(Vec<Book>),
    NotFound,
}

pub fn resolve_book(query: &str, books: &[Book]) -> EntityResolution {
    if books.is_empty() {
        return EntityResolution::NotFound;
    }

    let query_lower = query.to_lowercase();

    // Tier 1: exact title substring. Longest titles first so "The Great
    // Gatsby" beats a catalog entry literally titled "The".
    let mut by_length: Vec<&Book> = books.iter().collect();
    by_length.sort_by_key(|b| std::cmp::Reverse(b.title.len()));

    let exact: Vec<&Book> = by_length
        .iter()
        .filter(|b| query_lower.contains(&b.title.to_lowercase()))
        .copied()
        .collect();
    if let Some(best) = exact.first() {
        debug!(title = %best.title, "exact title match");
        return EntityResolution::Found((*best).clone());
    }

    // Tiers 2 and 3 work off extracted keywords.
    let keywords = extract_keywords(query);
    if keywords.is_empty() {
        return EntityResolution::NotFound;
    }

    let mut scored: Vec<(&Book, usize)> = books
        .iter()
        .filter_map(|book| {
            let title = book.title.to_lowercase();
            let hits = keywords
                .iter()
                .filter(|kw| title.contains(&kw.to_lowercase()))
                .count();
            (hits > 0).then_some((book, hits))
        })
        .collect();
    if scored.is_empty() {
        return EntityResolution::NotFound;
    }
    scored.sort_by_key(|(_, hits)| std::cmp::Reverse(*hits));

    let (best, best_hits) = scored[0];

    // Tier 2: every keyword present in the top title.
    if best_hits == keywords.len() {
        debug!(title = %best.title, "all keywords matched");
        return EntityResolution::Found(best.clone());
    }

    // Tier 3: partial-match scoring.
    if scored.len() == 1 {
        return EntityResolution::Found(best.clone());
    }
    let second_hits = scored[1].1;
    if best_hits > second_hits {
        debug!(title = %best.title, best_hits, second_hits, "strict top scorer");
        return EntityResolution::Found(best.clone());
    }

    let tied: Vec<Book> = scored
        .iter()
        .take(5)
        .filter(|(_, hits)| *hits == best_hits)
        .map(|(b, _)| (*b).clone())
        .collect();
    debug!(count = tied.len(), "ambiguous book reference");
    EntityResolution::Ambiguous(tied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: i64, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            author: "Autor".to_string(),
            genre: Some("ficción".to_string()),
            price: 10.0,
            stock: 5,
            description: None,
        }
    }

    fn catalog() -> Vec<Book> {
        vec![
            book(1, "Dune"),
            book(2, "Dune Messiah"),
            book(3, "The Great Gatsby"),
            book(4, "One Hundred Years of Solitude"),
        ]
    }

    #[test]
    fn exact_substring_prefers_longest_title() {
        // Both "Dune" and "Dune Messiah" are substrings of the query; the
        // longer, more specific title wins.
        match resolve_book("agrega dune messiah al carrito", &catalog()) {
            EntityResolution::Found(b) => assert_eq!(b.id, 2),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn exact_substring_simple() {
        match resolve_book("quiero comprar Dune", &catalog()) {
            EntityResolution::Found(b) => assert_eq!(b.id, 1),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn keyword_and_match() {
        match resolve_book("detalles de \"Great Gatsby\"", &catalog()) {
            EntityResolution::Found(b) => assert_eq!(b.id, 3),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn strict_top_partial_scorer_wins() {
        let books = vec![
            book(1, "Harry Potter y la Piedra Filosofal"),
            book(2, "El Alfarero Potter"),
        ];
        // "fenix" matches nothing, so the best book covers 2 of 3 keywords
        // and the runner-up only 1.
        match resolve_book("harry potter fenix", &books) {
            EntityResolution::Found(b) => assert_eq!(b.id, 1),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn tied_partial_scores_return_candidates() {
        let books = vec![
            book(1, "Cuentos de la Selva"),
            book(2, "Cuentos de Terror"),
        ];
        // Each title covers exactly one of the two keywords.
        match resolve_book("busco selva terror", &books) {
            EntityResolution::Ambiguous(c) => {
                assert_eq!(c.len(), 2);
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn ambiguity_is_capped_at_five_candidates() {
        let books = vec![
            book(1, "Selva Negra"),
            book(2, "Selva Azul"),
            book(3, "Selva Verde"),
            book(4, "Selva Roja"),
            book(5, "Selva Gris"),
            book(6, "Selva Blanca"),
            book(7, "Selva Dorada"),
        ];
        // All seven titles tie on the "selva" keyword; only five come back.
        match resolve_book("busco selva terror", &books) {
            EntityResolution::Ambiguous(c) => assert_eq!(c.len(), 5),
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn nothing_matches() {
        match resolve_book("un libro cualquiera", &catalog()) {
            EntityResolution::NotFound => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn resolution_is_idempotent() {
        let first = resolve_book("quiero comprar Dune", &catalog());
        let second = resolve_book("quiero comprar Dune", &catalog());
        match (first, second) {
            (EntityResolution::Found(a), EntityResolution::Found(b)) => assert_eq!(a.id, b.id),
            _ => panic!("expected stable Found"),
        }
    }
}
