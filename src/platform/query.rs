use std::cmp::Ordering;

use serde_json::Value;

use super::{Document, DocumentPage, PlatformError, PlatformResult};

/// Page size used when a listing carries no `Limit`.
pub const DEFAULT_LIMIT: usize = 25;

/// Predicates understood by `DocumentStore::list_documents`.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Attribute equals any of the values.
    Equal(String, Vec<Value>),
    OrderDesc(String),
    OrderAsc(String),
    Limit(usize),
    /// Start after the document with this id (in the final ordering).
    CursorAfter(String),
    /// Word match against a text attribute.
    Search(String, String),
}

impl Query {
    pub fn equal(attribute: &str, value: impl Into<Value>) -> Self {
        Query::Equal(attribute.to_string(), vec![value.into()])
    }

    pub fn order_desc(attribute: &str) -> Self {
        Query::OrderDesc(attribute.to_string())
    }

    pub fn order_asc(attribute: &str) -> Self {
        Query::OrderAsc(attribute.to_string())
    }

    pub fn limit(n: usize) -> Self {
        Query::Limit(n)
    }

    pub fn cursor_after(document_id: &str) -> Self {
        Query::CursorAfter(document_id.to_string())
    }

    pub fn search(attribute: &str, term: &str) -> Self {
        Query::Search(attribute.to_string(), term.to_string())
    }
}

/// Run `queries` over a full collection: filter, sort, cursor, limit.
pub fn apply(documents: Vec<Document>, queries: &[Query]) -> PlatformResult<DocumentPage> {
    let mut matched: Vec<Document> = documents
        .into_iter()
        .filter(|doc| queries.iter().all(|q| matches(doc, q)))
        .collect();

    let orders: Vec<(&str, bool)> = queries
        .iter()
        .filter_map(|q| match q {
            Query::OrderDesc(attr) => Some((attr.as_str(), true)),
            Query::OrderAsc(attr) => Some((attr.as_str(), false)),
            _ => None,
        })
        .collect();

    // Ties fall back to id so that cursors see a total order.
    let tie_desc = orders.first().map(|(_, desc)| *desc).unwrap_or(false);
    matched.sort_by(|a, b| {
        for (attr, desc) in &orders {
            let ord = compare_values(a.attribute(attr).as_ref(), b.attribute(attr).as_ref());
            let ord = if *desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        let ord = a.id.cmp(&b.id);
        if tie_desc {
            ord.reverse()
        } else {
            ord
        }
    });

    let total = matched.len();

    let mut start = 0;
    for query in queries {
        if let Query::CursorAfter(cursor) = query {
            let position = matched
                .iter()
                .position(|doc| &doc.id == cursor)
                .ok_or_else(|| PlatformError::NotFound(format!("cursor document {}", cursor)))?;
            start = position + 1;
        }
    }

    let limit = queries
        .iter()
        .rev()
        .find_map(|q| match q {
            Query::Limit(n) => Some(*n),
            _ => None,
        })
        .unwrap_or(DEFAULT_LIMIT);

    let documents = matched.into_iter().skip(start).take(limit).collect();
    Ok(DocumentPage { total, documents })
}

fn matches(doc: &Document, query: &Query) -> bool {
    match query {
        Query::Equal(attr, values) => match doc.attribute(attr) {
            Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
            Some(actual) => values.contains(&actual),
            None => false,
        },
        Query::Search(attr, term) => match doc.attribute(attr) {
            Some(Value::String(text)) => search_matches(&text, term),
            _ => false,
        },
        _ => true,
    }
}

/// True when any word of `term` is also a word of `text`, ignoring case.
pub fn search_matches(text: &str, term: &str) -> bool {
    let words: Vec<String> = tokenize(text).collect();
    tokenize(term).any(|needle| words.contains(&needle))
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}
