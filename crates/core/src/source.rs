//! Line-delimited JSON listing records, as exported from the listings dataset.
//!
//! Each non-blank line is one object with `_id` (or `id`), `name`, `space`,
//! `amenities`, `price` and an optional `text_embeddings` array. A bad line
//! yields an error item instead of ending the iteration.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::{Document, IngestError};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceRecord {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub space: Option<String>,
    #[serde(default, deserialize_with = "list_or_null")]
    pub amenities: Vec<String>,
    #[serde(deserialize_with = "price_value")]
    pub price: f64,
    #[serde(default, alias = "text_embeddings")]
    pub embedding: Option<Vec<f32>>,
}

impl SourceRecord {
    /// Text the embedder sees when the record carries no precomputed vector.
    pub fn embedding_text(&self) -> String {
        match (self.name.as_deref(), self.space.as_deref()) {
            (Some(name), Some(space)) if !space.is_empty() => format!("{name}\n{space}"),
            (Some(name), _) => name.to_string(),
            (None, Some(space)) => space.to_string(),
            (None, None) => String::new(),
        }
    }

    pub fn into_document(self, embedding: Vec<f32>) -> Document {
        Document {
            id: self.id,
            name: self.name.unwrap_or_default(),
            space: self.space.unwrap_or_default(),
            amenities: self.amenities,
            price: self.price,
            embedding,
        }
    }
}

impl From<Document> for SourceRecord {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            name: Some(document.name),
            space: Some(document.space),
            amenities: document.amenities,
            price: document.price,
            embedding: Some(document.embedding),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn list_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn price_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let price = match Value::deserialize(deserializer)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| serde::de::Error::custom("price is not numeric"))?;

    if !price.is_finite() || price < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "price must be non-negative, got {price}"
        )));
    }
    Ok(price)
}

pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line: usize,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        Ok(Self::from_reader(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = Result<SourceRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.lines.next()?;
            self.line += 1;

            let raw = match raw {
                Ok(raw) => raw,
                Err(error) => {
                    return Some(Err(IngestError::MalformedRecord {
                        line: self.line,
                        details: error.to_string(),
                    }))
                }
            };
            if raw.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&raw).map_err(|error| {
                IngestError::MalformedRecord {
                    line: self.line,
                    details: error.to_string(),
                }
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn parses_dataset_style_records() -> Result<(), Box<dyn std::error::Error>> {
        let input = concat!(
            r#"{"_id": "10006546", "name": "Ribeira Charming Duplex", "space": "Privileged views", "amenities": ["TV", "Wifi"], "price": 80, "text_embeddings": [0.1, 0.2]}"#,
            "\n\n",
            r#"{"id": 42, "name": "Loft", "price": "65.50"}"#,
            "\n",
        );
        let records = JsonLinesSource::from_reader(Cursor::new(input))
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "10006546");
        assert_eq!(records[0].embedding, Some(vec![0.1, 0.2]));
        assert_eq!(records[1].id, "42");
        assert_eq!(records[1].price, 65.5);
        assert!(records[1].amenities.is_empty());
        assert_eq!(records[1].embedding, None);
        Ok(())
    }

    #[test]
    fn bad_lines_surface_as_items_without_ending_iteration() {
        let input = "{\"_id\": \"a\", \"price\": 1}\nnot json\n{\"_id\": \"b\", \"price\": -3}\n{\"_id\": \"c\", \"price\": 2}\n";
        let items: Vec<_> = JsonLinesSource::from_reader(Cursor::new(input)).collect();

        assert_eq!(items.len(), 4);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(IngestError::MalformedRecord { line: 2, .. })));
        assert!(matches!(items[2], Err(IngestError::MalformedRecord { line: 3, .. })));
        assert!(items[3].is_ok());
    }

    #[test]
    fn null_amenities_read_as_empty_list() -> Result<(), Box<dyn std::error::Error>> {
        let input = r#"{"_id": "n", "name": "Bare room", "amenities": null, "price": 30}"#;
        let records = JsonLinesSource::from_reader(Cursor::new(input))
            .collect::<Result<Vec<_>, _>>()?;

        assert_eq!(records.len(), 1);
        assert!(records[0].amenities.is_empty());
        Ok(())
    }

    #[test]
    fn opens_files_from_disk() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, r#"{{"_id": "x", "name": "Cabin", "price": 120}}"#)?;

        let records = JsonLinesSource::open(file.path())?.collect::<Result<Vec<_>, _>>()?;
        assert_eq!(records[0].embedding_text(), "Cabin");
        Ok(())
    }
}
