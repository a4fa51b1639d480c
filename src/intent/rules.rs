//! Rule tier of the intent resolver.
//!
//! Ordered `(action, pattern-set)` table, scanned top to bottom; the first
//! regex hit wins. Patterns are bilingual and deliberately loose: this tier
//! exists so the common storefront phrasings never touch the vector or
//! generative backends.
//!
//! Ordering matters. Payment confirmation and cart viewing come before
//! add-to-cart because the add patterns include a bare `carrito` catch-all
//! that would otherwise swallow them.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::actions::StoreAction;

static RULES: Lazy<Vec<(StoreAction, Vec<Regex>)>> = Lazy::new(|| {
    let table: &[(StoreAction, &[&str])] = &[
        (
            StoreAction::ConfirmPayment,
            &[
                r"(?:sí|si)[,\s]+confirmo",
                r"confirmo\s+(?:el\s+)?pago",
                r"(?:sí|si)[,\s]+(?:paga|pagar|págalo|pagalo)",
                r"yes[,\s]+confirm",
                r"confirm\s+(?:the\s+)?payment",
            ],
        ),
        (
            StoreAction::ViewCart,
            &[
                r"(?:ver|muestra|mostrar|revisa|revisar|enseñame|enséñame)\s+(?:mi\s+|el\s+)?carrito",
                r"(?:qué|que)\s+(?:hay|tengo|llevo)\s+en\s+(?:mi\s+|el\s+)?carrito",
                r"(?:cómo|como)\s+va\s+(?:mi\s+|el\s+)?carrito",
                r"show\s+(?:me\s+)?(?:my\s+)?cart",
                r"what'?s\s+in\s+(?:my\s+)?cart",
            ],
        ),
        (
            StoreAction::AddToCart,
            &[
                r"agrega[r]?.*(?:carrito|compra|karr?ito)",
                r"añad[ei]r?.*(?:carrito|compra)",
                r"pon(?:er|me|lo)?.*carrito",
                r"(?:quiero|deseo)\s+comprar",
                r"me\s+llevo",
                r"sumar.*(?:carrito|compra)",
                r"guardar.*carrito",
                r"(?:meter|poner).*carrito",
                r"comprar\s+(?:el\s+)?(?:libro\s+)?(?:de\s+)?\w+",
                r"al\s+carrito",
                r"(?:mi\s+)?carrit[oa].*agrega",
                r"(?:a\s+mi\s+)?(?:carrito|karr?ito)",
                r"(?:libro|este).*(?:carrito|karr?ito)",
                r"compra\s+\d+\s+",
                r"(?:dame|ponme|tráeme|traeme)\s+\w+",
                r"me\s+das\s+\w+",
                r"buy\s+\w+",
                r"add\s+.*(?:to\s+)?cart",
                r"i\s+want\s+\w+",
            ],
        ),
        (
            StoreAction::RemoveFromCart,
            &[
                r"(?:quita|elimina|borra|saca|remueve)[r]?.*(?:carrito|compra)",
                r"(?:no\s+quiero|ya\s+no).*(?:libro|carrito|comprar)",
                r"(?:cancelar|quitar).*(?:carrito|producto)",
                r"remove\s+.*(?:from\s+)?cart",
                r"delete\s+.*(?:from\s+)?cart",
                r"take\s+.*out\s+(?:of\s+)?cart",
            ],
        ),
        (
            StoreAction::SearchBooks,
            &[
                r"(?:busca|busco|buscar)\s+libros?",
                r"(?:muestra|mostrar|ver|dame).*libros?",
                r"(?:qué|que)\s+libros?\s+(?:tienen|hay)",
                r"libros?\s+(?:de|sobre|disponibles)",
                r"(?:catálogo|catalogo|opciones)\s+(?:de\s+)?libros?",
                r"(?:qué|que)\s+(?:opciones|libros?)\s+hay",
                r"tienen.*(?:libros?|novelas?)",
                r"(?:busca|busco|buscar)\s+\w+",
                r"search\s+(?:for\s+)?books?",
                r"find\s+(?:me\s+)?books?",
                r"show\s+(?:me\s+)?books?",
            ],
        ),
        (
            StoreAction::RecommendBooks,
            &[
                r"(?:recomiend[ae]|sugi[eé]r[ae]|sugiere)",
                r"(?:qué|que)\s+(?:libro|me)\s+(?:recomiendas|sugieres)",
                r"(?:no\s+sé|no\s+se)\s+qu[eé]\s+leer",
                r"(?:dame|dime)\s+(?:una?\s+)?(?:recomendaci[oó]n|sugerencia)",
                r"(?:algo|libro)\s+(?:bueno|interesante|entretenido)",
                r"(?:qué|que)\s+(?:puedo|debería)\s+leer",
                r"sorpr[eé]ndeme",
            ],
        ),
        (
            StoreAction::BookDetails,
            &[
                r"(?:cuéntame|cuentame|dime|info|información|informacion)\s+(?:sobre|de|del)",
                r"(?:de\s+)?qu[eé]\s+trata",
                r"(?:detalles?|detalle)\s+(?:de|del|sobre)",
                r"(?:acerca|respecto)\s+(?:de|del)",
                r"(?:quién|quien)\s+(?:es\s+)?(?:el\s+)?autor",
                r"(?:cuál|cual)\s+es\s+(?:el\s+)?precio",
                r"(?:vale\s+la\s+pena|es\s+bueno)",
                r"(?:qué|que)\s+(?:género|genero)\s+es",
            ],
        ),
        (
            StoreAction::CheckStock,
            &[
                r"(?:está|esta)\s+disponible",
                r"(?:hay|tienen|queda).*(?:stock|disponible|ejemplar|copia)",
                r"(?:cuántos?|cuantos?)\s+(?:libros?|ejemplares?|copias?)",
                r"(?:stock|disponibilidad)",
                r"(?:está|esta)\s+agotado",
                r"(?:puedo\s+comprar).*(?:ahora|ya)",
            ],
        ),
        (
            StoreAction::Checkout,
            &[
                r"(?:hacer|realizar)\s+(?:el\s+)?check\s*out",
                r"check\s*out",
                r"(?:finalizar|terminar|completar|cerrar)\s+(?:la\s+)?compra",
                r"(?:proceder|pasar)\s+al\s+pago",
                r"(?:confirmar|realizar)\s+(?:mi\s+)?(?:pedido|orden)",
                r"(?:quiero|deseo)\s+(?:pagar|comprar\s+todo)",
                r"hacer\s+(?:el\s+)?pedido",
            ],
        ),
        (
            StoreAction::ProcessPayment,
            &[
                r"(?:pagar|pago)\s+(?:mi\s+)?(?:pedido|orden|compra)",
                r"(?:realizar|procesar|confirmar|autorizar|completar)\s+(?:el\s+)?pago",
                r"(?:ya\s+)?quiero\s+pagar",
                r"pagar\s+ahora",
            ],
        ),
        (
            StoreAction::CancelOrder,
            &[
                r"(?:cancelar|anular)\s+(?:mi\s+)?(?:pedido|orden|compra)",
                r"(?:no\s+quiero)\s+(?:esta\s+)?(?:orden|pedido|compra)",
                r"(?:detener|parar)\s+(?:la\s+)?compra",
                r"(?:eliminar|borrar)\s+(?:mi\s+)?(?:pedido|orden)",
            ],
        ),
        (
            StoreAction::OrderStatus,
            &[
                r"(?:estado|status)\s+(?:de\s+)?(?:mi\s+)?(?:pedido|orden|compra)",
                r"(?:cómo|como)\s+va\s+(?:mi\s+)?(?:pedido|orden)",
                r"(?:revisar|consultar|ver)\s+(?:mi\s+)?(?:pedido|orden)",
                r"(?:qué|que)\s+pas[oó]\s+con\s+(?:mi\s+)?(?:pedido|orden)",
                r"(?:mi\s+)?(?:pedido|orden|compra)\s+(?:está|esta|sigue|fue)",
            ],
        ),
    ];

    table
        .iter()
        .map(|(action, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("bad intent pattern {p:?}: {e}")))
                .collect();
            (*action, compiled)
        })
        .collect()
});

/// First-match scan over the rule table. `None` hands off to the embedding
/// tier.
pub fn rule_match(query: &str) -> Option<StoreAction> {
    let q = query.to_lowercase();
    let q = q.trim();

    for (action, patterns) in RULES.iter() {
        for pattern in patterns {
            if pattern.is_match(q) {
                debug!(action = action.name(), pattern = pattern.as_str(), "rule hit");
                return Some(*action);
            }
        }
    }
    None
}
