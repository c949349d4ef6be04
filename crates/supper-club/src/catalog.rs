use std::collections::HashMap;

use crate::domain::{Criterion, CriterionId};

/// Ordered criterion catalog. Order is the store's listing order and drives
/// every catalog-driven display; ids unknown to the catalog keep working and
/// display as their raw id.
#[derive(Debug, Clone, Default)]
pub struct CriterionCatalog {
    criteria: Vec<Criterion>,
    index: HashMap<CriterionId, usize>,
}

impl CriterionCatalog {
    pub fn new(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        let mut ordered = Vec::new();
        let mut index = HashMap::new();

        for mut criterion in criteria {
            if index.contains_key(&criterion.id) {
                continue;
            }
            if criterion.label.trim().is_empty() {
                criterion.label = label_from_id(criterion.id.as_str());
            }
            index.insert(criterion.id.clone(), ordered.len());
            ordered.push(criterion);
        }

        Self {
            criteria: ordered,
            index,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.iter()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn contains(&self, id: &CriterionId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &CriterionId) -> Option<&Criterion> {
        self.index.get(id).map(|&position| &self.criteria[position])
    }

    /// Display label, falling back to the raw id for dangling references.
    pub fn label<'a>(&'a self, id: &'a CriterionId) -> &'a str {
        self.get(id)
            .map(|criterion| criterion.label.as_str())
            .unwrap_or_else(|| id.as_str())
    }

    /// Sort key placing catalog criteria first in catalog order, then
    /// dangling ids by id.
    pub(crate) fn display_rank<'a>(&self, id: &'a CriterionId) -> (usize, &'a str) {
        match self.index.get(id) {
            Some(&position) => (position, ""),
            None => (self.criteria.len(), id.as_str()),
        }
    }
}

/// Derive a readable label from a snake_case id: `preis_leistung` becomes
/// `Preis Leistung`.
pub fn label_from_id(id: &str) -> String {
    let spaced = id.replace('_', " ");
    let mut label = String::with_capacity(spaced.len());
    let mut at_word_start = true;

    for ch in spaced.chars() {
        if at_word_start && ch.is_alphanumeric() {
            label.extend(ch.to_uppercase());
        } else {
            label.push(ch);
        }
        at_word_start = !ch.is_alphanumeric();
    }

    label
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(id: &str, label: &str) -> Criterion {
        Criterion {
            id: CriterionId::new(id),
            label: label.to_string(),
        }
    }

    #[test]
    fn label_from_id_title_cases_words() {
        assert_eq!(label_from_id("preis_leistung"), "Preis Leistung");
        assert_eq!(label_from_id("service"), "Service");
        assert_eq!(label_from_id("wine_by_glass"), "Wine By Glass");
    }

    #[test]
    fn blank_labels_are_derived_and_duplicates_dropped() {
        let catalog = CriterionCatalog::new(vec![
            criterion("food", "Essen"),
            criterion("preis_leistung", " "),
            criterion("food", "Duplicate"),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label(&CriterionId::new("food")), "Essen");
        assert_eq!(
            catalog.label(&CriterionId::new("preis_leistung")),
            "Preis Leistung"
        );
    }

    #[test]
    fn dangling_ids_display_raw_and_rank_after_catalog() {
        let catalog = CriterionCatalog::new(vec![criterion("food", "Food")]);
        let dangling = CriterionId::new("ambience");

        assert!(!catalog.contains(&dangling));
        assert_eq!(catalog.label(&dangling), "ambience");
        assert!(
            catalog.display_rank(&CriterionId::new("food")) < catalog.display_rank(&dangling)
        );
    }
}
