//! Interprets `generateContent` response bodies.
//!
//! Image extraction looks at the first candidate only and tries each
//! extractor in `EXTRACTORS` across all of its parts before moving on to the
//! next one, so an inline payload always wins over a link found in text.

use crate::{
    error::ResolutionError,
    models::{Candidate, GenerateContentResponse, ImageReference, ResponsePart},
};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_INLINE_MIME: &str = "image/png";
const IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".webp", ".gif"];

type Extractor = fn(&[ResponsePart]) -> Option<ImageReference>;

const EXTRACTORS: [(&str, Extractor); 3] = [
    ("inline data", inline_image),
    ("markdown link", markdown_image),
    ("bare image url", bare_image_url),
];

pub fn resolve(body: &Value) -> Result<ImageReference, ResolutionError> {
    let response = parse(body)?;
    let candidate = first_candidate(&response)?;
    let parts = candidate.parts();

    for (strategy, extract) in EXTRACTORS {
        if let Some(image) = extract(parts) {
            log::debug!("Resolved image via {}", strategy);
            return Ok(image);
        }
    }

    if candidate.hit_token_limit() {
        return Err(ResolutionError::TruncatedResponse);
    }

    let text: String = parts.iter().filter_map(|part| part.text.as_deref()).collect();
    let text = text.trim();
    log::warn!("No image in response (finish reason: {:?})", candidate.finish_reason);
    Err(ResolutionError::NoImageFound {
        text: (!text.is_empty()).then(|| text.to_string()),
    })
}

/// Text of the first part of the first candidate, trimmed.
pub fn resolve_text(body: &Value) -> Result<String, ResolutionError> {
    let response = parse(body)?;
    let candidate = first_candidate(&response)?;

    let text = candidate
        .parts()
        .first()
        .and_then(|part| part.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty());

    match text {
        Some(text) => Ok(text.to_string()),
        None if candidate.hit_token_limit() => Err(ResolutionError::TruncatedResponse),
        None => Err(ResolutionError::EmptyResponse {
            detail: "the first candidate carries no text".into(),
        }),
    }
}

fn parse(body: &Value) -> Result<GenerateContentResponse, ResolutionError> {
    GenerateContentResponse::deserialize(body)
        .map_err(|e| ResolutionError::MalformedResponse(e.to_string()))
}

fn first_candidate(response: &GenerateContentResponse) -> Result<&Candidate, ResolutionError> {
    response.candidates.first().ok_or_else(|| {
        let block_reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref());
        let detail = match block_reason {
            Some(reason) => format!("no candidates, prompt blocked ({})", reason),
            None => "no candidates in response".to_string(),
        };
        ResolutionError::EmptyResponse { detail }
    })
}

fn inline_image(parts: &[ResponsePart]) -> Option<ImageReference> {
    parts.iter().find_map(|part| {
        let inline = part.inline_data.as_ref()?;
        let data = inline.data.as_deref().filter(|data| !data.is_empty())?;
        let mime_type = inline
            .mime_type
            .as_deref()
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_INLINE_MIME);
        Some(ImageReference::Inline {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    })
}

fn markdown_image(parts: &[ResponsePart]) -> Option<ImageReference> {
    texts(parts)
        .find_map(find_markdown_image_url)
        .map(|url| ImageReference::Remote {
            url: url.to_string(),
        })
}

fn bare_image_url(parts: &[ResponsePart]) -> Option<ImageReference> {
    texts(parts)
        .find_map(find_bare_image_url)
        .map(|url| ImageReference::Remote {
            url: url.to_string(),
        })
}

fn texts(parts: &[ResponsePart]) -> impl Iterator<Item = &str> {
    parts.iter().filter_map(|part| part.text.as_deref())
}

/// First `![alt](http(s)://...)` target. The alt text stays on one line.
fn find_markdown_image_url(text: &str) -> Option<&str> {
    let mut search = text;
    while let Some(start) = search.find("![") {
        let after = &search[start + 2..];
        let alt_line = after.split('\n').next().unwrap_or("");
        let found = alt_line.match_indices("](").find_map(|(idx, _)| {
            let target = &after[idx + 2..];
            let url = &target[..target.find(')')?];
            is_http_url(url).then_some(url)
        });
        if found.is_some() {
            return found;
        }
        search = after;
    }
    None
}

fn is_http_url(url: &str) -> bool {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .map_or(false, |rest| !rest.is_empty())
}

/// First `http(s)://<non-space>.<ext>` with an image extension, matched
/// case-insensitively and extended to the last extension in the token.
fn find_bare_image_url(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    let mut from = 0;

    while let Some(offset) = lower[from..].find("http") {
        let start = from + offset;
        let rest = &lower[start..];
        from = start + 4;

        let scheme_len = if rest.starts_with("https://") {
            8
        } else if rest.starts_with("http://") {
            7
        } else {
            continue;
        };

        let token = &rest[..rest.find(char::is_whitespace).unwrap_or(rest.len())];
        let end = (scheme_len + 1..=token.len()).rev().find(|&end| {
            token.is_char_boundary(end)
                && IMAGE_EXTENSIONS
                    .iter()
                    .any(|ext| token[..end].ends_with(ext) && end - ext.len() > scheme_len)
        });
        if let Some(end) = end {
            return Some(&text[start..start + end]);
        }
    }
    None
}
