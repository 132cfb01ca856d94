//! Filter, search and sort over a snapshot.
//!
//! Everything here is pure: [`apply`] borrows the snapshot and returns a new
//! ordered view without touching the records themselves.

use std::cmp::Ordering;
use std::collections::HashMap;

use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::model::Costume;

pub const ALL_CATEGORIES: &str = "all";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn parse(value: &str) -> Self {
        if value == ALL_CATEGORIES {
            Self::All
        } else {
            Self::Only(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Only(category) => category,
        }
    }

    fn keeps(&self, costume: &Costume) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => costume.category == *category,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Default,
    Name,
    Size,
}

impl SortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "default" => Some(Self::Default),
            "name" => Some(Self::Name),
            "size" => Some(Self::Size),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Name => "name",
            Self::Size => "size",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Raw listing parameters as they arrive in a query string.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct QueryParams {
    pub category: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub category: CategoryFilter,
    pub search: String,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl Query {
    /// Unknown sort keys and orders fall back to their defaults.
    pub fn from_params(params: &QueryParams) -> Self {
        Self {
            category: params
                .category
                .as_deref()
                .map(CategoryFilter::parse)
                .unwrap_or_default(),
            search: params.q.clone().unwrap_or_default(),
            sort: params
                .sort
                .as_deref()
                .and_then(SortKey::parse)
                .unwrap_or_default(),
            order: params
                .order
                .as_deref()
                .and_then(SortOrder::parse)
                .unwrap_or_default(),
        }
    }

    pub fn to_params(&self) -> QueryParams {
        QueryParams {
            category: Some(self.category.as_str().to_string()),
            q: Some(self.search.clone()),
            sort: Some(self.sort.as_str().to_string()),
            order: Some(self.order.as_str().to_string()),
        }
    }
}

pub fn size_rank(size: &str) -> u8 {
    match size {
        "S" => 1,
        "M" => 2,
        "L" => 3,
        _ => 0,
    }
}

thread_local! {
    static NAME_COLLATOR: Option<Collator> =
        Collator::try_new(&locale!("ja").into(), CollatorOptions::new()).ok();
}

/// Locale-aware name order using Japanese collation: Latin before kana,
/// accents as secondary differences, hiragana and katakana interleaved by
/// reading. Names the collator ranks equal fall back to code point order,
/// so only identical strings compare equal.
pub fn collate(a: &str, b: &str) -> Ordering {
    NAME_COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => a.to_lowercase().cmp(&b.to_lowercase()),
        })
        .then_with(|| a.cmp(b))
}

fn compare(a: &Costume, b: &Costume, key: SortKey) -> Ordering {
    match key {
        SortKey::Default => Ordering::Equal,
        SortKey::Name => collate(&a.name, &b.name),
        SortKey::Size => size_rank(&a.size).cmp(&size_rank(&b.size)),
    }
}

fn matches_search(costume: &Costume, needle: &str) -> bool {
    [&costume.name, &costume.description, &costume.category]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Category filter, then text search, then a stable sort.
pub fn apply<'a>(costumes: &'a [Costume], query: &Query) -> Vec<&'a Costume> {
    let mut out: Vec<&Costume> = costumes
        .iter()
        .filter(|c| query.category.keeps(c))
        .collect();

    if !query.search.is_empty() {
        let needle = query.search.to_lowercase();
        out.retain(|c| matches_search(c, &needle));
    }

    if query.sort != SortKey::Default {
        out.sort_by(|a, b| query.order.apply(compare(a, b, query.sort)));
    }

    out
}

/// `"all"` followed by every category in first-seen order.
pub fn categories(costumes: &[Costume]) -> Vec<String> {
    std::iter::once(ALL_CATEGORIES)
        .chain(costumes.iter().map(|c| c.category.as_str()).unique())
        .map(str::to_string)
        .collect()
}

pub fn category_counts(costumes: &[Costume]) -> HashMap<&str, usize> {
    costumes.iter().map(|c| c.category.as_str()).counts()
}
