//! Tolerant parsing of free-form judge output.
//!
//! The judge is asked for `[{"index": 0, "score": 0.8, "reason": "..."}, ...]` but
//! models wrap it in prose or code fences. We take the first well-formed JSON
//! list in the text and classify each record.

use serde_json::Value;

/// One classified record from a judge response.
#[derive(Debug, Clone, PartialEq)]
pub enum JudgeRecord {
    ParsedScore {
        index: Option<usize>,
        id: Option<String>,
        score: f32,
        reason: String,
    },
    ParseFailure(String),
}

/// Find the first substring starting at `[` that deserializes as a JSON array
/// holding at least one object. Lists of bare numbers or strings in the prose
/// ("slides [1, 2]") are skipped; an empty list counts only when nothing better follows.
pub fn extract_first_list(text: &str) -> Option<Vec<Value>> {
    let mut empty = None;
    for (pos, _) in text.match_indices('[') {
        let mut stream = serde_json::Deserializer::from_str(&text[pos..]).into_iter::<Value>();
        if let Some(Ok(Value::Array(items))) = stream.next() {
            if items.iter().any(Value::is_object) {
                return Some(items);
            }
            if items.is_empty() && empty.is_none() {
                empty = Some(items);
            }
        }
    }
    empty
}

fn as_index(v: &Value) -> Option<usize> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .map(|x| x as usize)
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as usize)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_score(v: &Value) -> Option<f32> {
    let raw = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    raw.is_finite().then(|| (raw as f32).clamp(0.0, 1.0))
}

/// Classify one list element.
pub fn classify_record(item: &Value) -> JudgeRecord {
    let Value::Object(map) = item else {
        return JudgeRecord::ParseFailure("record is not an object".into());
    };
    let index = map.get("index").and_then(as_index);
    let id = map.get("id").and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    if index.is_none() && id.is_none() {
        return JudgeRecord::ParseFailure("record has neither index nor id".into());
    }
    let Some(score) = map.get("score").and_then(as_score) else {
        return JudgeRecord::ParseFailure("missing or non-numeric score".into());
    };
    let reason = map
        .get("reason")
        .and_then(Value::as_str)
        .map(sanitize_reason)
        .unwrap_or_default();
    JudgeRecord::ParsedScore { index, id, score, reason }
}

/// Parse a whole response. `None` means no list was found at all.
pub fn parse_judge_response(text: &str) -> Option<Vec<JudgeRecord>> {
    extract_first_list(text).map(|items| items.iter().map(classify_record).collect())
}

/// ASCII-only, single line, at most 160 chars, whitespace collapsed.
pub fn sanitize_reason(input: &str) -> String {
    let mut out = String::with_capacity(160);
    let mut prev_space = false;
    for ch in input.chars() {
        let c = match ch {
            '\r' | '\n' | '\t' => ' ',
            c if c.is_ascii() => c,
            _ => ' ',
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.len() >= 160 {
            break;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_list_wrapped_in_prose_and_fences() {
        let text = "Sure! Here you go:\n```json\n[{\"index\": 0, \"score\": 0.9, \"reason\": \"on point\"}]\n```\nThanks [end]";
        let recs = parse_judge_response(text).unwrap();
        assert_eq!(
            recs,
            vec![JudgeRecord::ParsedScore {
                index: Some(0),
                id: None,
                score: 0.9,
                reason: "on point".into()
            }]
        );
    }

    #[test]
    fn skips_malformed_bracket_before_real_list() {
        let text = "Scores [see below]: [{\"index\": \"1\", \"score\": \"0.4\"}]";
        let recs = parse_judge_response(text).unwrap();
        assert!(matches!(recs[0], JudgeRecord::ParsedScore { index: Some(1), .. }));
    }

    #[test]
    fn bad_records_become_failures_and_scores_clamp() {
        let text = r#"[{"index": 0, "score": 1.7}, {"index": 1}, "oops", {"score": 0.2}]"#;
        let recs = parse_judge_response(text).unwrap();
        assert!(matches!(recs[0], JudgeRecord::ParsedScore { score, .. } if score == 1.0));
        assert!(matches!(recs[1], JudgeRecord::ParseFailure(_)));
        assert!(matches!(recs[2], JudgeRecord::ParseFailure(_)));
        assert!(matches!(recs[3], JudgeRecord::ParseFailure(_)));
    }

    #[test]
    fn numeric_list_in_prose_does_not_hide_records() {
        let text = r#"Scores for slides [1, 2]: [{"index": 0, "score": 0.9, "reason": "fit"}, {"index": 1, "score": 0.1}]"#;
        let recs = parse_judge_response(text).unwrap();
        assert_eq!(recs.len(), 2);
        assert!(matches!(recs[0], JudgeRecord::ParsedScore { index: Some(0), score, .. } if score == 0.9));
        assert!(matches!(recs[1], JudgeRecord::ParsedScore { index: Some(1), .. }));

        assert_eq!(parse_judge_response("Nothing relevant: []"), Some(vec![]));
        assert!(parse_judge_response("Only ids [3, 4] here").is_none());
    }

    #[test]
    fn no_list_returns_none() {
        assert!(parse_judge_response("I cannot rate these slides.").is_none());
        assert!(parse_judge_response("[unterminated").is_none());
    }

    #[test]
    fn sanitize_collapses_whitespace_and_non_ascii() {
        assert_eq!(sanitize_reason("  Great\n fit \u{2014} really  "), "Great fit really");
    }
}
