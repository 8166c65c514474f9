//! Free-text search shared by the product and client listings.
//!
//! The listings re-run the search on every keystroke, so the matching stays a
//! plain linear scan: lowercase the query once, then test each listed field of
//! each record for substring containment.

/// Accessor returning one searchable text field of a record.
pub type FieldAccessor<T> = fn(&T) -> &str;

/// Return the records whose fields contain `query`, ignoring case.
///
/// - A record matches when ANY accessor in `fields` yields text containing the
///   query (logical OR across fields).
/// - An empty query returns every record.
/// - Matching records keep their input order.
pub fn search<'a, T>(records: &'a [T], query: &str, fields: &[FieldAccessor<T>]) -> Vec<&'a T> {
    if query.is_empty() {
        return records.iter().collect();
    }

    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| matches(*record, &needle, fields))
        .collect()
}

/// Check a single record against an already-lowercased needle.
fn matches<T>(record: &T, lowercase_needle: &str, fields: &[FieldAccessor<T>]) -> bool {
    fields
        .iter()
        .any(|field| field(record).to_lowercase().contains(lowercase_needle))
}
