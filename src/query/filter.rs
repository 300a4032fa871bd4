use serde::{Deserialize, Serialize};

use crate::data::Utility;

/// Category selector value meaning "every category"
pub const ALL_CATEGORIES: &str = "Все";

/// Three-valued utility filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityFilter {
    #[default]
    Unset,
    RequireTrue,
    RequireFalse,
}

impl UtilityFilter {
    /// The flag value a row must have, or None when the filter is off
    pub fn required(&self) -> Option<bool> {
        match self {
            UtilityFilter::Unset => None,
            UtilityFilter::RequireTrue => Some(true),
            UtilityFilter::RequireFalse => Some(false),
        }
    }
}

/// Independent predicates over the parcel table, all ANDed together
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub category: Option<String>,
    pub water: UtilityFilter,
    pub gas: UtilityFilter,
    pub sewer: UtilityFilter,
    pub heat: UtilityFilter,
    pub electricity: UtilityFilter,
    /// Case-sensitive substring of the cadastral block code
    pub cadastral_block: Option<String>,
    /// Exact address, normally picked from an address search
    pub address: Option<String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_utility(mut self, utility: Utility, filter: UtilityFilter) -> Self {
        *self.utility_mut(utility) = filter;
        self
    }

    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.cadastral_block = Some(block.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn utility(&self, utility: Utility) -> UtilityFilter {
        match utility {
            Utility::Water => self.water,
            Utility::Gas => self.gas,
            Utility::Sewer => self.sewer,
            Utility::Heat => self.heat,
            Utility::Electricity => self.electricity,
        }
    }

    fn utility_mut(&mut self, utility: Utility) -> &mut UtilityFilter {
        match utility {
            Utility::Water => &mut self.water,
            Utility::Gas => &mut self.gas,
            Utility::Sewer => &mut self.sewer,
            Utility::Heat => &mut self.heat,
            Utility::Electricity => &mut self.electricity,
        }
    }

    /// Active category, ignoring the "all" sentinel and empty input
    pub fn active_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
    }

    pub fn active_block(&self) -> Option<&str> {
        self.cadastral_block.as_deref().filter(|b| !b.is_empty())
    }

    pub fn active_address(&self) -> Option<&str> {
        self.address.as_deref().filter(|a| !a.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_inactive() {
        let spec = FilterSpec::new()
            .with_category(ALL_CATEGORIES)
            .with_block("")
            .with_address("");
        assert_eq!(spec.active_category(), None);
        assert_eq!(spec.active_block(), None);
        assert_eq!(spec.active_address(), None);
    }

    #[test]
    fn test_deserialize_partial_spec() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"category": "Земли лесного фонда", "gas": "require_false"}"#)
                .unwrap();
        assert_eq!(spec.active_category(), Some("Земли лесного фонда"));
        assert_eq!(spec.gas, UtilityFilter::RequireFalse);
        assert_eq!(spec.water, UtilityFilter::Unset);
        assert_eq!(spec.address, None);
    }

    #[test]
    fn test_utility_builder() {
        let spec = FilterSpec::new().with_utility(Utility::Heat, UtilityFilter::RequireTrue);
        assert_eq!(spec.utility(Utility::Heat).required(), Some(true));
        assert_eq!(spec.utility(Utility::Gas).required(), None);
    }
}
