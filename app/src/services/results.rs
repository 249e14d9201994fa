//! Shaping of vote tallies for display.
//!
//! The backend computes every count. This module only groups the admin tally
//! rows into per-contest sections and assembles the public "live results"
//! view from the top-result rows and candidate previews.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use adapters::{
    AdminResultRow, CandidatePreview, Category, CategoryType, Gender, ServiceResult, TopResult,
    University, UniversityId, VotingService,
};
use tracing::debug;

use crate::utils::{category_label, gender_label, LabelContext};

/// Display order of the eight contest slots, as `gender-type` keys.
pub const SLOT_ORDER: [&str; 8] = [
    "male-king",
    "female-king",
    "male-style",
    "female-style",
    "male-popular",
    "female-popular",
    "male-innocent",
    "female-innocent",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ResultGroup {
    pub key: String,
    pub label: String,
    pub candidates: Vec<AdminResultRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminResults {
    pub university_name: Option<String>,
    pub groups: Vec<ResultGroup>,
    pub total_votes: i64,
}

fn slot_key(gender: &Gender, category_type: &CategoryType) -> String {
    format!("{}-{}", gender.key(), category_type.as_str().to_lowercase())
}

/// Groups tally rows by contest, most votes first (ties by candidate id), in `SLOT_ORDER`
/// followed by any unexpected contests in first-seen order.
pub fn group_results(rows: Vec<AdminResultRow>) -> Vec<ResultGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<AdminResultRow>> = HashMap::new();

    for row in rows {
        let key = slot_key(&row.gender, &row.category_type);
        if !buckets.contains_key(&key) {
            order.push(key.clone());
        }
        buckets.entry(key).or_default().push(row);
    }

    let known = SLOT_ORDER.iter().map(|key| key.to_string());
    let unknown = order
        .into_iter()
        .filter(|key| !SLOT_ORDER.contains(&key.as_str()));

    known
        .chain(unknown)
        .filter_map(|key| {
            let mut candidates = buckets.remove(&key)?;
            candidates.sort_by(|a, b| {
                b.votes
                    .cmp(&a.votes)
                    .then_with(|| a.candidate_id.cmp(&b.candidate_id))
            });

            let first = candidates.first()?;
            let label = format!(
                "{} — {}",
                category_label(&first.gender, &first.category_type, LabelContext::Results),
                gender_label(&first.gender)
            );

            Some(ResultGroup {
                key,
                label,
                candidates,
            })
        })
        .collect()
}

pub fn total_votes(rows: &[AdminResultRow]) -> i64 {
    rows.iter().map(|row| row.votes).sum()
}

/// One contest slot of the public results.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveCategory {
    pub category: Category,
    pub label: String,
    pub top: Option<TopResult>,
    pub candidate: Option<CandidatePreview>,
}

impl LiveCategory {
    pub fn votes(&self) -> i64 {
        self.top.as_ref().map_or(0, |top| top.votes)
    }

    pub fn headline(&self) -> &'static str {
        if self.candidate.is_some() {
            "Who will it be?"
        } else {
            "No votes yet"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveResults {
    pub universities: Vec<University>,
    pub university: Option<University>,
    pub categories: Vec<LiveCategory>,
}

/// Builds the public results for `university`, or for the first active university by name.
pub async fn live_results(
    service: &Arc<dyn VotingService>,
    university: Option<UniversityId>,
) -> ServiceResult<LiveResults> {
    let universities = service.list_universities(true).await?;

    let selected = match university {
        Some(id) => match universities.iter().find(|u| u.id == id) {
            Some(found) => Some(found.clone()),
            // An inactive university can still be viewed by id.
            None => service.get_university(id).await?,
        },
        None => universities.first().cloned(),
    };

    let Some(selected) = selected else {
        return Ok(LiveResults {
            universities,
            ..Default::default()
        });
    };

    let categories = service.list_categories(selected.id, None, true).await?;
    let category_ids: Vec<_> = categories.iter().map(|c| c.id).collect();
    let tops = service.get_top_results(&category_ids).await?;

    let candidate_ids: Vec<_> = tops
        .iter()
        .map(|top| top.candidate_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let previews = service.get_candidates(&candidate_ids).await?;
    debug!(
        "live results: {} categories, {} leaders",
        categories.len(),
        previews.len()
    );

    let mut by_slot: HashMap<String, Category> = categories
        .into_iter()
        .map(|category| (slot_key(&category.gender, &category.category_type), category))
        .collect();

    let categories = SLOT_ORDER
        .iter()
        .filter_map(|key| by_slot.remove(*key))
        .map(|category| {
            let top = tops.iter().find(|t| t.category_id == category.id).cloned();
            let candidate = top
                .as_ref()
                .and_then(|t| previews.iter().find(|p| p.id == t.candidate_id).cloned());

            LiveCategory {
                label: category_label(&category.gender, &category.category_type, LabelContext::Results),
                category,
                top,
                candidate,
            }
        })
        .collect();

    Ok(LiveResults {
        universities,
        university: Some(selected),
        categories,
    })
}
