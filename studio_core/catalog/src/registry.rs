use common::types::{Category, ConnectorKind};

/// Synthetic source kind used when the draft pulls data from uploaded
/// files. Participates in the draft selection but never in the catalog.
pub const UPLOAD_KIND: &str = "upload";

/// Supported source kinds. Fixed set, loaded once.
pub static ALL_CONNECTORS: [ConnectorKind; 8] = [
    ConnectorKind {
        id: "mysql",
        category: Category::Sql,
    },
    ConnectorKind {
        id: "postgres",
        category: Category::Sql,
    },
    ConnectorKind {
        id: "oracle",
        category: Category::Sql,
    },
    ConnectorKind {
        id: "mssql",
        category: Category::Sql,
    },
    ConnectorKind {
        id: "teradata",
        category: Category::Sql,
    },
    ConnectorKind {
        id: "redshift",
        category: Category::Cloud,
    },
    ConnectorKind {
        id: "bigquery",
        category: Category::Cloud,
    },
    ConnectorKind {
        id: "snowflake",
        category: Category::Cloud,
    },
];

#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub search: String,
    pub category: Option<Category>,
}

impl CatalogFilter {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: text.into(),
            category: None,
        }
    }

    pub fn category(category: Category) -> Self {
        Self {
            search: String::new(),
            category: Some(category),
        }
    }
}

/// Case-insensitive substring match on id, optional exact category match.
pub fn list(filter: &CatalogFilter) -> Vec<&'static ConnectorKind> {
    let needle = filter.search.to_lowercase();
    ALL_CONNECTORS
        .iter()
        .filter(|kind| kind.id.to_lowercase().contains(&needle))
        .filter(|kind| filter.category.is_none_or(|c| kind.category == c))
        .collect()
}

pub fn lookup(id: &str) -> Option<&'static ConnectorKind> {
    ALL_CONNECTORS.iter().find(|kind| kind.id == id)
}
