//! Prompt builders for the two generative-provider uses: intent
//! classification fallback and natural-language response wording.
//!
//! Transactional confirmations never go through these — money-affecting text
//! comes from the deterministic templates in [`crate::response`].

use crate::store::models::SemanticAction;

/// Fixed refusal for out-of-domain queries.
pub const DOMAIN_GUARDRAIL: &str = "No puedo ayudar con eso. Puedo ayudarte con compras, \
     recomendaciones y pedidos de libros.";

/// Generic apology used when nothing better can be said.
pub const FALLBACK_RESPONSE: &str = "Lo siento, hubo un problema al procesar tu solicitud. \
     ¿Podrías intentar de nuevo?";

/// Classification prompt: the provider must answer with exactly one action
/// name from the list, or `NONE`.
pub fn classification_prompt(query: &str, actions: &[SemanticAction]) -> String {
    let mut listing = String::new();
    for action in actions {
        listing.push_str(&format!("- {}: {}\n", action.name, action.description));
    }

    format!(
        "You are a classifier for a bookstore chatbot.\n\
         Given the user query, classify it into ONE of these functions.\n\
         If the query is NOT related to a bookstore (buying books, carts, orders, \
         recommendations), respond with \"NONE\".\n\n\
         Available functions:\n{listing}\n\
         User query: \"{query}\"\n\n\
         Respond with ONLY the function name or \"NONE\". No explanation."
    )
}

/// Natural-response prompt for read-only actions: the provider rewords the
/// structured result, and the rules force it to keep the concrete data.
pub fn natural_response_prompt(action: &str, result: &serde_json::Value, query: &str) -> String {
    format!(
        "Eres un asistente amigable de una libreria online. Responde en espanol \
         de forma natural y util.\n\n\
         REGLAS IMPORTANTES:\n\
         - SIEMPRE incluye los datos concretos del resultado (titulos, autores, \
         precios, cantidades, estados, etc.)\n\
         - Si hay una lista de libros, menciona cada uno con su titulo, autor y precio\n\
         - Si es stock, di cuantas unidades hay disponibles\n\
         - Si es una orden, incluye el numero de orden, estado y total\n\
         - Si hay un error en el resultado, explicalo amablemente\n\
         - Se conciso pero COMPLETO con la informacion\n\n\
         Accion realizada: {action}\n\
         Datos del resultado: {result}\n\
         Consulta original del usuario: {query}\n\n\
         Responde de forma natural incluyendo TODOS los datos relevantes:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::SemanticAction;

    #[test]
    fn classification_prompt_lists_every_action() {
        let actions = vec![
            SemanticAction {
                id: 1,
                name: "search_books_for_sale".into(),
                description: "Buscar libros".into(),
                examples: vec![],
                combined_embedding: None,
                description_embeddings: vec![],
                example_embeddings: vec![],
            },
            SemanticAction {
                id: 2,
                name: "view_cart".into(),
                description: "Ver el carrito".into(),
                examples: vec![],
                combined_embedding: None,
                description_embeddings: vec![],
                example_embeddings: vec![],
            },
        ];

        let prompt = classification_prompt("quiero algo de terror", &actions);
        assert!(prompt.contains("- search_books_for_sale: Buscar libros"));
        assert!(prompt.contains("- view_cart: Ver el carrito"));
        assert!(prompt.contains("quiero algo de terror"));
        assert!(prompt.contains("NONE"));
    }
}
