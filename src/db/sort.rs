//! Per-view ordering. A view stores its sort as text (`"authors, title DESC"`);
//! the text is parsed against a fixed set of keys and rendered to SQL from
//! those keys only, so nothing a caller typed is ever spliced into a query.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Order in which books were added to the view.
    Added,
    Id,
    Title,
    Subtitle,
    Authors,
    Isbn,
    VolumeId,
    Description,
    PageCount,
}

impl SortKey {
    const ALL: [SortKey; 9] = [
        SortKey::Added,
        SortKey::Id,
        SortKey::Title,
        SortKey::Subtitle,
        SortKey::Authors,
        SortKey::Isbn,
        SortKey::VolumeId,
        SortKey::Description,
        SortKey::PageCount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SortKey::Added => "added",
            SortKey::Id => "id",
            SortKey::Title => "title",
            SortKey::Subtitle => "subtitle",
            SortKey::Authors => "authors",
            SortKey::Isbn => "isbn",
            SortKey::VolumeId => "volume_id",
            SortKey::Description => "description",
            SortKey::PageCount => "page_count",
        }
    }

    /// Column expression in the book list query, where `bv` is `book_views`
    /// and `b` is the aggregated-authors view.
    fn expression(self) -> &'static str {
        match self {
            SortKey::Added => "bv.id",
            SortKey::Id => "b.id",
            SortKey::Title => "b.title COLLATE NOCASE",
            SortKey::Subtitle => "b.subtitle COLLATE NOCASE",
            SortKey::Authors => "b.all_authors COLLATE NOCASE",
            SortKey::Isbn => "b.isbn",
            SortKey::VolumeId => "b.volume_id",
            SortKey::Description => "b.description COLLATE NOCASE",
            SortKey::PageCount => "b.page_count",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.name().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortTerm {
    pub key: SortKey,
    pub descending: bool,
}

/// A validated, non-empty list of sort terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    terms: Vec<SortTerm>,
}

impl SortOrder {
    pub fn new(terms: Vec<SortTerm>) -> Self {
        if terms.is_empty() {
            Self::default()
        } else {
            Self { terms }
        }
    }

    pub fn terms(&self) -> &[SortTerm] {
        &self.terms
    }

    /// `ORDER BY` body. View insertion order always breaks ties.
    pub(crate) fn to_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .terms
            .iter()
            .map(|term| {
                if term.descending {
                    format!("{} DESC", term.key.expression())
                } else {
                    term.key.expression().to_string()
                }
            })
            .collect();
        if !self.terms.iter().any(|term| term.key == SortKey::Added) {
            parts.push(SortKey::Added.expression().to_string());
        }
        parts.join(", ")
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            terms: vec![SortTerm {
                key: SortKey::Added,
                descending: false,
            }],
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        if spec.trim().is_empty() {
            return Ok(Self::default());
        }

        let terms = spec
            .split(',')
            .map(|raw| {
                let mut words = raw.split_whitespace();
                let key = words
                    .next()
                    .and_then(SortKey::parse)
                    .ok_or_else(|| Error::InvalidSort(spec.to_string()))?;
                let descending = match words.next() {
                    None => false,
                    Some(dir) if dir.eq_ignore_ascii_case("asc") => false,
                    Some(dir) if dir.eq_ignore_ascii_case("desc") => true,
                    Some(_) => return Err(Error::InvalidSort(spec.to_string())),
                };
                if words.next().is_some() {
                    return Err(Error::InvalidSort(spec.to_string()));
                }
                Ok(SortTerm { key, descending })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { terms })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(term.key.name())?;
            if term.descending {
                f.write_str(" DESC")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_and_directions() {
        let order: SortOrder = "Authors, title desc ,page_count ASC".parse().unwrap();
        assert_eq!(
            order.terms(),
            &[
                SortTerm { key: SortKey::Authors, descending: false },
                SortTerm { key: SortKey::Title, descending: true },
                SortTerm { key: SortKey::PageCount, descending: false },
            ]
        );
        assert_eq!(order.to_string(), "authors, title DESC, page_count");
    }

    #[test]
    fn blank_means_insertion_order() {
        assert_eq!("  ".parse::<SortOrder>().unwrap(), SortOrder::default());
        assert_eq!(SortOrder::default().to_sql(), "bv.id");
    }

    #[test]
    fn rejects_anything_outside_the_key_set() {
        for bad in ["books_title", "title; DROP TABLE books", "title sideways", "title,,isbn", "title desc nulls"] {
            assert!(
                matches!(bad.parse::<SortOrder>(), Err(Error::InvalidSort(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn sql_appends_tie_breaker_once() {
        let order: SortOrder = "title".parse().unwrap();
        assert_eq!(order.to_sql(), "b.title COLLATE NOCASE, bv.id");

        let order: SortOrder = "added desc".parse().unwrap();
        assert_eq!(order.to_sql(), "bv.id DESC");
    }
}
