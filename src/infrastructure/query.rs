// Predicate evaluation shared by the in-memory and SQLite document stores

use serde_json::Value;
use std::cmp::Ordering;

use super::document_store::{Document, DocumentList, Predicate, DEFAULT_LIST_LIMIT};

/// Apply filters, ordering and the offset/limit window to a candidate set
pub fn evaluate(candidates: Vec<Document>, predicates: &[Predicate]) -> DocumentList {
    let mut matched: Vec<Document> = candidates
        .into_iter()
        .filter(|doc| {
            predicates
                .iter()
                .filter(|p| is_filter(p))
                .all(|p| matches(doc, p))
        })
        .collect();

    let orderings: Vec<(&str, bool)> = predicates
        .iter()
        .filter_map(|p| match p {
            Predicate::OrderAsc(field) => Some((field.as_str(), false)),
            Predicate::OrderDesc(field) => Some((field.as_str(), true)),
            _ => None,
        })
        .collect();

    matched.sort_by(|a, b| {
        for (field, descending) in &orderings {
            let ord = compare_values(a.field(field).as_ref(), b.field(field).as_ref());
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        // Ids are time-ordered, so this keeps insertion order as the tie-breaker
        a.id.cmp(&b.id)
    });

    let total = matched.len() as u64;
    let offset = predicates
        .iter()
        .rev()
        .find_map(|p| match p {
            Predicate::Offset(n) => Some(*n),
            _ => None,
        })
        .unwrap_or(0);
    let limit = predicates
        .iter()
        .rev()
        .find_map(|p| match p {
            Predicate::Limit(n) => Some(*n),
            _ => None,
        })
        .unwrap_or(DEFAULT_LIST_LIMIT);

    let documents = matched.into_iter().skip(offset).take(limit).collect();
    DocumentList { documents, total }
}

fn is_filter(predicate: &Predicate) -> bool {
    matches!(
        predicate,
        Predicate::Equal(..) | Predicate::Search(..) | Predicate::Any(..)
    )
}

/// Whether a single filter predicate accepts the document
pub fn matches(doc: &Document, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Equal(field, expected) => match doc.field(field) {
            Some(actual) => equal_matches(&actual, expected),
            None => expected.is_null(),
        },
        Predicate::Search(field, term) => match doc.field(field) {
            Some(Value::String(text)) => search_matches(&text, term),
            _ => false,
        },
        Predicate::Any(alternatives) => alternatives.iter().any(|p| matches(doc, p)),
        _ => true,
    }
}

fn equal_matches(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (_, Value::Array(options)) => options.iter().any(|o| equal_matches(actual, o)),
        (Value::Array(items), scalar) => items.iter().any(|item| item == scalar),
        (a, b) => a == b,
    }
}

fn search_matches(text: &str, term: &str) -> bool {
    let haystack = text.to_lowercase();
    let mut words = term.split_whitespace().peekable();
    if words.peek().is_none() {
        return true;
    }
    words.all(|word| haystack.contains(&word.to_lowercase()))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (x, y) => x.to_string().cmp(&y.to_string()),
        },
    }
}
