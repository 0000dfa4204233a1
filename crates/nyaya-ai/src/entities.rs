//! Per-document entity extraction.

use tracing::{debug, warn};

use nyaya_core::evidence::EntitySet;

use crate::generator::{Generator, is_generation_failure, safe_generate};
use crate::parse::parse_json;
use crate::prompt::entity_extraction_prompt;

/// Output budget for one entity-extraction call.
pub const ENTITY_MAX_TOKENS: u32 = 4096;

/// Extract entities from one document's text.
///
/// Exhausted retries or an unparsable response yield an empty set; the
/// caller keeps accumulating across the remaining files.
pub async fn extract_entities(
    generator: &dyn Generator,
    text: &str,
    max_tokens: u32,
    retries: u32,
) -> EntitySet {
    let prompt = entity_extraction_prompt(text);
    let response = safe_generate(generator, &prompt, max_tokens, retries).await;
    if is_generation_failure(&response) {
        warn!("entity extraction gave up after retries");
        return EntitySet::default();
    }

    let parsed = parse_json(&response);
    if parsed.is_empty() {
        warn!(response_len = response.len(), "entity response unparsable");
        return EntitySet::default();
    }
    let entities = EntitySet::from_json(&parsed);
    debug!(total = entities.total(), "extracted entities");
    entities
}
