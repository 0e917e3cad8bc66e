use serde_json::{Value, json};

use crate::provider::{AiConfig, ProviderKind};

/// One concrete attempt: a URL and the JSON body to POST to it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub url: String,
    pub payload: Value,
}

/// When is the next candidate allowed to run after a failed attempt?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Only a 404 moves on; any other failure is final. Used for the
    /// Hugging Face trailing-slash toggle.
    NotFoundOnly,
    /// Any non-success status moves on. Used for the Space path×payload
    /// search.
    AnyFailure,
}

/// The full, eagerly-built attempt sequence for one message. The
/// client walks it in order and stops at the first success.
#[derive(Debug, Clone)]
pub struct AttemptPlan {
    pub candidates: Vec<Candidate>,
    pub fallback: FallbackPolicy,
}

/// Join base and path without ever producing a double slash or losing
/// a base path segment: the base gets exactly one trailing slash, the
/// path loses its leading ones.
fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn toggle_trailing_slash(url: &str) -> String {
    match url.strip_suffix('/') {
        Some(stripped) => stripped.to_string(),
        None => format!("{}/", url),
    }
}

/// Build the ordered candidate list for the configured provider.
pub fn build_plan(cfg: &AiConfig, text: &str) -> AttemptPlan {
    let path = cfg.path.as_deref().map(str::trim).filter(|p| !p.is_empty());

    match cfg.provider {
        ProviderKind::HuggingFace => {
            // With no path configured the base URL itself is the
            // endpoint. Some deployments 404 depending on the trailing
            // slash, so the toggled form is kept as a fallback.
            let primary = match path {
                Some(p) => join_url(&cfg.base_url, p),
                None => cfg.base_url.clone(),
            };
            let alternate = toggle_trailing_slash(&primary);
            let payload = json!({ "inputs": text });

            AttemptPlan {
                candidates: vec![
                    Candidate { url: primary, payload: payload.clone() },
                    Candidate { url: alternate, payload },
                ],
                fallback: FallbackPolicy::NotFoundOnly,
            }
        }
        ProviderKind::HfSpace => {
            // Spaces differ in both the predict route and the expected
            // payload nesting; the cross product is tried path-major.
            let configured = path.unwrap_or("api/predict").to_string();
            let forced_slash = if configured.ends_with('/') {
                configured.clone()
            } else {
                format!("{}/", configured)
            };
            let paths = [
                configured,
                forced_slash,
                "run/predict".to_string(),
                "run/predict/".to_string(),
            ];
            let payloads = [
                json!({ "data": [text] }),
                json!({ "data": [[text]] }),
                json!({ "data": [text], "fn_index": 0 }),
                json!({ "data": [[text]], "fn_index": 0 }),
            ];

            let mut candidates = Vec::with_capacity(paths.len() * payloads.len());
            for p in &paths {
                let url = join_url(&cfg.base_url, p);
                for payload in &payloads {
                    candidates.push(Candidate {
                        url: url.clone(),
                        payload: payload.clone(),
                    });
                }
            }

            AttemptPlan {
                candidates,
                fallback: FallbackPolicy::AnyFailure,
            }
        }
        ProviderKind::Custom => {
            let url = join_url(&cfg.base_url, path.unwrap_or("analyze"));

            AttemptPlan {
                candidates: vec![Candidate {
                    url,
                    payload: json!({ "text": text }),
                }],
                fallback: FallbackPolicy::NotFoundOnly,
            }
        }
    }
}
