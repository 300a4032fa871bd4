//! Free-text address lookup
//!
//! Users narrow the address list with a substring and pick one exact address
//! for the address predicate. Too broad a search returns nothing selectable.

use serde::Serialize;

/// Default upper bound on selectable matches
pub const DEFAULT_MATCH_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddressSearch {
    /// No address contains the search text
    NotFound,
    /// Between one and `limit` matches, in input order
    Matches { addresses: Vec<String> },
    /// More than `limit` matches; the caller must narrow the search
    TooMany { count: usize },
}

#[cfg(test)]
impl AddressSearch {
    fn addresses(&self) -> &[String] {
        match self {
            AddressSearch::Matches { addresses } => addresses,
            _ => &[],
        }
    }
}

/// Case-insensitive substring search over `addresses`.
///
/// Matches keep the order of `addresses`; the dataset supplies them sorted and
/// distinct, so the result is deterministic.
pub fn search_addresses<S: AsRef<str>>(addresses: &[S], query: &str, limit: usize) -> AddressSearch {
    let needle = query.to_lowercase();

    let matches: Vec<&str> = addresses
        .iter()
        .map(|addr| addr.as_ref())
        .filter(|addr| addr.to_lowercase().contains(&needle))
        .collect();

    match matches.len() {
        0 => AddressSearch::NotFound,
        n if n > limit => AddressSearch::TooMany { count: n },
        _ => AddressSearch::Matches {
            addresses: matches.into_iter().map(str::to_string).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_matches() {
        let addresses = ["Street 1", "Street 12", "Avenue 5"];
        let result = search_addresses(&addresses, "street", DEFAULT_MATCH_LIMIT);
        assert_eq!(
            result,
            AddressSearch::Matches {
                addresses: vec!["Street 1".to_string(), "Street 12".to_string()]
            }
        );
    }

    #[test]
    fn test_cyrillic_case_folding() {
        let addresses = ["г. Москва, ул. Тверская", "г. Тверь"];
        let result = search_addresses(&addresses, "ТВЕР", DEFAULT_MATCH_LIMIT);
        assert_eq!(result.addresses().len(), 2);
    }

    #[test]
    fn test_too_many_matches() {
        let addresses: Vec<String> = (0..51).map(|i| format!("Street {}", i)).collect();
        let result = search_addresses(&addresses, "street", DEFAULT_MATCH_LIMIT);
        assert_eq!(result, AddressSearch::TooMany { count: 51 });
        assert!(result.addresses().is_empty());
    }

    #[test]
    fn test_exactly_limit_matches() {
        let addresses: Vec<String> = (0..50).map(|i| format!("Street {}", i)).collect();
        let result = search_addresses(&addresses, "street", DEFAULT_MATCH_LIMIT);
        assert_eq!(result.addresses().len(), 50);
    }

    #[test]
    fn test_not_found() {
        let addresses = ["Street 1", "Avenue 5"];
        assert_eq!(
            search_addresses(&addresses, "boulevard", DEFAULT_MATCH_LIMIT),
            AddressSearch::NotFound
        );
    }
}
