//! Output columns and their captions.

use std::collections::HashSet;

use crate::fields::extra::{CatalogSnapshot, ExtraFieldType};
use crate::fields::{ColumnRef, DataType, FieldRegistry, Labels};

#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub column: ColumnRef,
    pub caption: String,
    pub data_type: DataType,
    pub sortable: bool,
}

impl OutputColumn {
    pub fn field_id(&self) -> String {
        self.column.field_id()
    }
}

/// Attach captions to resolved columns. Registry fields use their translated
/// label, additional fields the catalog title, unknown ones the raw id.
pub fn output_columns(
    registry: &FieldRegistry,
    columns: &[ColumnRef],
    labels: &Labels,
    catalog: &CatalogSnapshot,
) -> Vec<OutputColumn> {
    let mut out: Vec<OutputColumn> = columns
        .iter()
        .map(|column| match column {
            ColumnRef::Standard(id) => match registry.field(id) {
                Some(field) => OutputColumn {
                    column: column.clone(),
                    caption: labels
                        .get(field.label_key)
                        .unwrap_or(field.default_label)
                        .to_string(),
                    data_type: field.data_type,
                    sortable: field.sortable,
                },
                None => OutputColumn {
                    column: column.clone(),
                    caption: id.to_string(),
                    data_type: DataType::Text,
                    sortable: false,
                },
            },
            ColumnRef::Extra { kind, id } => match catalog.get(*kind, *id) {
                Some(field) => OutputColumn {
                    column: column.clone(),
                    caption: field.title.clone(),
                    data_type: match ExtraFieldType::parse(&field.field_type) {
                        ExtraFieldType::Date => DataType::Date,
                        ExtraFieldType::YesNo => DataType::Label,
                        _ => DataType::Text,
                    },
                    sortable: true,
                },
                None => OutputColumn {
                    column: column.clone(),
                    caption: column.field_id(),
                    data_type: DataType::Text,
                    sortable: false,
                },
            },
        })
        .collect();

    let captions = disambiguate(out.iter().map(|c| c.caption.clone()).collect());
    for (column, caption) in out.iter_mut().zip(captions) {
        column.caption = caption;
    }
    out
}

/// Suffix repeated captions with ` (n)`, `n` being how many earlier captions
/// are equal ignoring case.
pub fn disambiguate(captions: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(captions.len());
    let mut taken: HashSet<String> = HashSet::with_capacity(captions.len());
    captions
        .into_iter()
        .map(|caption| {
            let lowered = caption.to_lowercase();
            let mut n = seen.iter().filter(|c| **c == lowered).count();
            let mut candidate = caption.clone();
            if n > 0 {
                candidate = format!("{caption} ({n})");
            }
            // a generated suffix can collide with a literal caption
            while taken.contains(&candidate.to_lowercase()) {
                n += 1;
                candidate = format!("{caption} ({n})");
            }
            seen.push(lowered);
            taken.insert(candidate.to_lowercase());
            candidate
        })
        .collect()
}
