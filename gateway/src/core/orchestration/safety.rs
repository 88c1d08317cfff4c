//! Fallback messaging for crisis responses that arrive without text.
//!
//! When the orchestration flow flags a crisis but returns nothing to say, the
//! user still gets an empathetic message. A hard-block variant, which refuses
//! to discuss methods, is chosen when the flow signals method intent or a
//! `hard_block` subtype.

use serde_json::{Map, Value};
use tracing::info;

use super::normalize::{NormalizedResponse, OrchestrationResult, truthy};

/// Response type of the crisis path
pub const CRISIS_TYPE: &str = "crisis";

/// Default crisis message
pub const STANDARD_CRISIS_MESSAGE: &str = "Aku menyesal kamu sedang merasa seperti ini. Keselamatanmu sangat penting. Jika kamu dalam bahaya segera, mohon hubungi layanan darurat setempat. Kamu tidak sendirian—dukungan dari orang tepercaya atau profesional bisa membantu. Jika berkenan, aku bisa membagikan informasi bantuan resmi sesuai wilayahmu.";

/// Crisis message used when method intent or a hard-block subtype is signalled
pub const HARD_BLOCK_CRISIS_MESSAGE: &str = "Keselamatanmu sangat penting. Jika kamu dalam bahaya segera, mohon hubungi layanan darurat setempat sekarang. Kami tidak dapat memberikan detail cara atau langkah. Kamu tidak sendirian—dukungan dari orang tepercaya atau profesional bisa membantu. Jika berkenan, aku bisa membagikan informasi bantuan resmi sesuai wilayahmu.";

/// Which canned message applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    Standard,
    HardBlock,
}

impl FallbackKind {
    pub fn message(&self) -> &'static str {
        match self {
            FallbackKind::Standard => STANDARD_CRISIS_MESSAGE,
            FallbackKind::HardBlock => HARD_BLOCK_CRISIS_MESSAGE,
        }
    }
}

/// True when the result takes the crisis path.
///
/// Used both to trigger the fallback and to route the response, so the two
/// decisions can never disagree.
pub fn is_crisis(result: &OrchestrationResult) -> bool {
    result
        .response_type
        .as_deref()
        .is_some_and(|t| t.trim().eq_ignore_ascii_case(CRISIS_TYPE))
        || result.crisis_flag == Some(true)
}

/// Pick the fallback variant from the payload and the record's `meta`.
pub fn fallback_kind(payload: &Value, meta: Option<&Map<String, Value>>) -> FallbackKind {
    let top = payload.as_object();
    let lookup = |key: &str| {
        top.and_then(|m| m.get(key))
            .into_iter()
            .chain(meta.and_then(|m| m.get(key)))
    };

    let hard_block_subtype = lookup("subtype")
        .filter_map(Value::as_str)
        .find(|s| !s.trim().is_empty())
        .is_some_and(|s| {
            let s = s.trim();
            s.eq_ignore_ascii_case("hard_block") || s.eq_ignore_ascii_case("hard-block")
        });
    let method_intent = lookup("method_intent").any(truthy);

    if hard_block_subtype || method_intent {
        FallbackKind::HardBlock
    } else {
        FallbackKind::Standard
    }
}

/// Fill in crisis text when the flow flagged a crisis without any.
///
/// Returns the variant applied, if any. The resolved type is forced to `crisis`.
pub fn apply_fallback(response: &mut NormalizedResponse) -> Option<FallbackKind> {
    let result = &response.result;
    if !is_crisis(result) || result.text().is_some() {
        return None;
    }

    let kind = fallback_kind(&response.payload, result.meta.as_ref());
    info!(?kind, "Crisis response without text, using fallback message");

    response.result.text = Some(kind.message().to_string());
    response.result.response_type = Some(CRISIS_TYPE.to_string());
    Some(kind)
}
