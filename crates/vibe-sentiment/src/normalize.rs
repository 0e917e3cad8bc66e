use serde::Deserialize;
use serde_json::Value;

use crate::provider::ProviderKind;

/// The canonical result of a successful analysis. Labels are passed
/// through verbatim; no attempt is made to map one provider's
/// taxonomy onto another's.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sentiment {
    pub label: Option<String>,
    pub score: Option<f64>,
}

/// `{label, score}` as most providers emit it; either field may be
/// missing and the element is still usable.
#[derive(Debug, Default, Deserialize)]
struct LabelScore {
    label: Option<String>,
    score: Option<f64>,
}

/// Map a provider's raw success body into a `(label, score)` pair.
/// Never fails: a body that matches none of the known shapes simply
/// yields an empty result and the caller leaves sentiment unset.
pub fn normalize(kind: ProviderKind, body: &str) -> Sentiment {
    match kind {
        ProviderKind::HuggingFace => normalize_huggingface(body),
        ProviderKind::HfSpace => normalize_space(body),
        ProviderKind::Custom => normalize_custom(body),
    }
}

/// Flat list of `{label, score}`, or one list per input nested one
/// level deeper. Picks the highest-scored element; on equal scores the
/// earlier element wins, preserving the provider's own ordering.
fn normalize_huggingface(body: &str) -> Sentiment {
    let items: Vec<LabelScore> = match serde_json::from_str::<Vec<LabelScore>>(body) {
        Ok(flat) => flat,
        Err(_) => match serde_json::from_str::<Vec<Vec<LabelScore>>>(body) {
            Ok(nested) => nested.into_iter().next().unwrap_or_default(),
            Err(_) => return Sentiment::default(),
        },
    };

    let mut best: Option<LabelScore> = None;
    for item in items {
        let beats = best
            .as_ref()
            .is_none_or(|b| item.score.unwrap_or(0.0) > b.score.unwrap_or(0.0));
        if beats {
            best = Some(item);
        }
    }

    match best {
        Some(item) => Sentiment {
            label: item.label,
            score: item.score,
        },
        None => Sentiment::default(),
    }
}

#[derive(Debug, Deserialize)]
struct SpaceEnvelope {
    data: Vec<Value>,
}

/// Gradio Spaces wrap results in `{"data": [...]}` but disagree on the
/// element shape: objects, bare strings, or `[label, score]` pairs all
/// occur in the wild. The first element that produces a non-empty
/// label wins.
fn normalize_space(body: &str) -> Sentiment {
    let Ok(envelope) = serde_json::from_str::<SpaceEnvelope>(body) else {
        return Sentiment::default();
    };

    for entry in envelope.data {
        let (label, score) = match entry {
            Value::Object(map) => (
                map.get("label").and_then(Value::as_str).map(str::to_owned),
                map.get("score").and_then(Value::as_f64),
            ),
            Value::String(s) => (Some(s), None),
            Value::Array(items) => (
                items.first().and_then(Value::as_str).map(str::to_owned),
                items.get(1).and_then(Value::as_f64),
            ),
            _ => (None, None),
        };

        if let Some(label) = label {
            if !label.is_empty() {
                return Sentiment {
                    label: Some(label),
                    score,
                };
            }
        }
    }

    Sentiment::default()
}

fn normalize_custom(body: &str) -> Sentiment {
    match serde_json::from_str::<LabelScore>(body) {
        Ok(item) => Sentiment {
            label: item.label,
            score: item.score,
        },
        Err(_) => Sentiment::default(),
    }
}
