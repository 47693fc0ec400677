//! Google Books volume responses mapped to `NewBook`. Fetching is left to
//! the caller; this only understands the JSON. Fields the catalog omits
//! default to empty or zero instead of failing the whole record.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::NewBook;

const VOLUMES_KIND: &str = "books#volumes";
const VOLUME_KIND: &str = "books#volume";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumesResponse {
    kind: String,
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    kind: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: String,
    subtitle: String,
    description: String,
    authors: Vec<String>,
    page_count: i64,
    industry_identifiers: Vec<IndustryIdentifier>,
    image_links: ImageLinks,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ImageLinks {
    small_thumbnail: String,
    thumbnail: String,
}

/// Prefer ISBN-13, fall back to ISBN-10.
fn pick_isbn(identifiers: &[IndustryIdentifier]) -> String {
    ["ISBN_13", "ISBN_10"]
        .iter()
        .find_map(|kind| identifiers.iter().find(|id| id.kind == *kind))
        .map(|id| id.identifier.clone())
        .unwrap_or_default()
}

impl Volume {
    fn into_book(self) -> Result<NewBook> {
        if self.kind != VOLUME_KIND {
            return Err(Error::InvalidResponse(format!(
                "expected {VOLUME_KIND}, got {}",
                self.kind
            )));
        }

        let info = self.volume_info;
        Ok(NewBook {
            volume_id: self.id,
            isbn: pick_isbn(&info.industry_identifiers),
            title: info.title,
            subtitle: info.subtitle,
            description: info.description,
            small_thumbnail: info.image_links.small_thumbnail,
            large_thumbnail: info.image_links.thumbnail,
            page_count: info.page_count,
            authors: info.authors,
        })
    }
}

/// Parse a `volumes` search response. No matches is an empty list.
pub fn parse_volumes(body: &str) -> Result<Vec<NewBook>> {
    let response: VolumesResponse = serde_json::from_str(body)?;
    if response.kind != VOLUMES_KIND {
        return Err(Error::InvalidResponse(format!(
            "expected {VOLUMES_KIND}, got {}",
            response.kind
        )));
    }
    response.items.into_iter().map(Volume::into_book).collect()
}

/// Parse a single volume resource.
pub fn parse_volume(body: &str) -> Result<NewBook> {
    let volume: Volume = serde_json::from_str(body)?;
    volume.into_book()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUNE: &str = r#"{
        "kind": "books#volumes",
        "totalItems": 1,
        "items": [{
            "kind": "books#volume",
            "id": "B1hSG45JCX4C",
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "description": "Set on the desert planet Arrakis...",
                "pageCount": 896,
                "industryIdentifiers": [
                    {"type": "ISBN_10", "identifier": "0441013597"},
                    {"type": "ISBN_13", "identifier": "9780441013593"}
                ],
                "imageLinks": {
                    "smallThumbnail": "http://books.google.com/small",
                    "thumbnail": "http://books.google.com/large"
                }
            }
        }]
    }"#;

    #[test]
    fn parses_a_full_volume() {
        let books = parse_volumes(DUNE).unwrap();
        assert_eq!(books.len(), 1);

        let dune = &books[0];
        assert_eq!(dune.volume_id, "B1hSG45JCX4C");
        assert_eq!(dune.isbn, "9780441013593");
        assert_eq!(dune.title, "Dune");
        assert_eq!(dune.subtitle, "");
        assert_eq!(dune.page_count, 896);
        assert_eq!(dune.authors, ["Frank Herbert"]);
        assert_eq!(dune.small_thumbnail, "http://books.google.com/small");
        assert_eq!(dune.large_thumbnail, "http://books.google.com/large");
    }

    #[test]
    fn missing_fields_default() {
        let book = parse_volume(r#"{"kind": "books#volume", "volumeInfo": {"title": "Untitled"}}"#)
            .unwrap();
        assert_eq!(
            book,
            NewBook {
                title: "Untitled".into(),
                ..NewBook::default()
            }
        );

        let bare = parse_volume(r#"{"kind": "books#volume"}"#).unwrap();
        assert_eq!(bare, NewBook::default());
    }

    #[test]
    fn isbn_10_is_used_when_there_is_no_isbn_13() {
        let book = parse_volume(
            r#"{"kind": "books#volume", "volumeInfo": {"industryIdentifiers": [
                {"type": "OTHER", "identifier": "UOM:39015"},
                {"type": "ISBN_10", "identifier": "0441013597"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(book.isbn, "0441013597");
    }

    #[test]
    fn no_matches_is_empty() {
        let books = parse_volumes(r#"{"kind": "books#volumes", "totalItems": 0}"#).unwrap();
        assert!(books.is_empty());
    }

    #[test]
    fn wrong_kind_is_rejected() {
        assert!(matches!(
            parse_volumes(r#"{"kind": "books#bookshelves", "items": []}"#),
            Err(Error::InvalidResponse(_))
        ));
        assert!(matches!(parse_volumes("not json"), Err(Error::Json(_))));
    }
}
