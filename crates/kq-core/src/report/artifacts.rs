//! Parsers for sibling artifacts merged into the cycle report.

use kq_model::{UnknownGenes, round_to};
use serde_json::Value;

/// Collector section; `None` when the document does not parse.
pub(crate) fn parse_collector(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Unknown-genes section from NDJSON text.
///
/// `None` when there are no records. A record without `unknown_score` counts as `0.0`;
/// any unparsable line or non-numeric score invalidates the whole section.
pub(crate) fn summarize_unknown_genes(text: &str) -> Option<UnknownGenes> {
    let mut count = 0usize;
    let mut total = 0.0f64;

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let Ok(Value::Object(record)) = serde_json::from_str::<Value>(line) else {
            return Some(UnknownGenes::invalid());
        };
        let score = match record.get("unknown_score") {
            None => 0.0,
            Some(v) => match v.as_f64() {
                Some(s) => s,
                None => return Some(UnknownGenes::invalid()),
            },
        };
        count += 1;
        total += score;
    }

    (count > 0).then(|| UnknownGenes::Stats {
        count,
        avg_score: round_to(total / count as f64, 3),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collector_parses_or_rejects() {
        assert_eq!(parse_collector(r#"{"downloads": 3}"#), Some(json!({"downloads": 3})));
        assert_eq!(parse_collector("{not json"), None);
    }

    #[test]
    fn unknown_genes_average_with_missing_scores() {
        let text = "{\"unknown_score\": 0.5}\n\n{\"gene\": \"x\"}\n{\"unknown_score\": 0.4}\n";
        assert_eq!(
            summarize_unknown_genes(text),
            Some(UnknownGenes::Stats {
                count: 3,
                avg_score: 0.3
            })
        );
    }

    #[test]
    fn unknown_genes_rounds_to_three_decimals() {
        let text = "{\"unknown_score\": 1}\n{\"unknown_score\": 0}\n{\"unknown_score\": 0}\n";
        assert_eq!(
            summarize_unknown_genes(text),
            Some(UnknownGenes::Stats {
                count: 3,
                avg_score: 0.333
            })
        );
    }

    #[test]
    fn unknown_genes_blank_file_is_absent() {
        assert_eq!(summarize_unknown_genes("\n  \n"), None);
    }

    #[test]
    fn unknown_genes_bad_line_invalidates() {
        assert_eq!(
            summarize_unknown_genes("{\"unknown_score\": 0.5}\nnope\n"),
            Some(UnknownGenes::invalid())
        );
        assert_eq!(
            summarize_unknown_genes("{\"unknown_score\": \"high\"}\n"),
            Some(UnknownGenes::invalid())
        );
        assert_eq!(summarize_unknown_genes("[1, 2]\n"), Some(UnknownGenes::invalid()));
    }
}
