//! Small shared helpers: category display labels and lenient id parsing.

use adapters::{CategoryType, Gender};
use uuid::Uuid;

/// Where a category label is shown. The ballot calls the popularity contest "Smart".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelContext {
    Ballot,
    Results,
}

pub fn category_label(gender: &Gender, category_type: &CategoryType, context: LabelContext) -> String {
    match category_type {
        CategoryType::King if *gender == Gender::Female => "Queen".to_string(),
        CategoryType::King => "King".to_string(),
        CategoryType::Style => "Style".to_string(),
        CategoryType::Popular => match context {
            LabelContext::Ballot => "Smart".to_string(),
            LabelContext::Results => "Popular".to_string(),
        },
        CategoryType::Innocent => "Innocent".to_string(),
        CategoryType::Other(raw) => raw.clone(),
    }
}

pub fn gender_label(gender: &Gender) -> &'static str {
    if *gender == Gender::Female {
        "Female"
    } else {
        "Male"
    }
}

/// Parses an optional id argument. Empty, `null`, `undefined` and non-UUID text all mean "none given".
pub fn parse_optional_id(raw: Option<&str>) -> Option<Uuid> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("undefined") {
        return None;
    }
    Uuid::parse_str(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels() {
        assert_eq!(
            category_label(&Gender::Female, &CategoryType::King, LabelContext::Results),
            "Queen"
        );
        assert_eq!(
            category_label(&Gender::Male, &CategoryType::King, LabelContext::Ballot),
            "King"
        );
        assert_eq!(
            category_label(&Gender::Male, &CategoryType::Popular, LabelContext::Ballot),
            "Smart"
        );
        assert_eq!(
            category_label(&Gender::Male, &CategoryType::Popular, LabelContext::Results),
            "Popular"
        );
        assert_eq!(
            category_label(
                &Gender::Female,
                &CategoryType::parse("charm"),
                LabelContext::Results
            ),
            "charm"
        );
    }

    #[test]
    fn test_parse_optional_id() {
        let id = Uuid::new_v4();

        assert_eq!(parse_optional_id(Some(&id.to_string())), Some(id));
        assert_eq!(parse_optional_id(Some(" NULL ")), None);
        assert_eq!(parse_optional_id(Some("undefined")), None);
        assert_eq!(parse_optional_id(Some("")), None);
        assert_eq!(parse_optional_id(Some("uni-42")), None);
        assert_eq!(parse_optional_id(None), None);
    }
}
