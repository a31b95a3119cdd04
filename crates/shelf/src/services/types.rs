use super::ServiceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted catalog name (and owner id). Names of 100 characters or
/// more are rejected.
pub const CATALOG_NAME_MAX_LENGTH: usize = 99;

/// Catalog type enumeration. Fixed at creation, determines the legal format
/// domain for the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogType {
    Site,
    Replica,
    Transformation,
}

impl CatalogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogType::Site => "site",
            CatalogType::Replica => "replica",
            CatalogType::Transformation => "transformation",
        }
    }

    pub fn all() -> [CatalogType; 3] {
        [
            CatalogType::Site,
            CatalogType::Replica,
            CatalogType::Transformation,
        ]
    }

    /// The formats legal for this catalog type.
    pub fn allowed_formats(&self) -> &'static [CatalogFormat] {
        match self {
            CatalogType::Site => &[CatalogFormat::Xml3, CatalogFormat::Xml4],
            CatalogType::Replica => &[CatalogFormat::File, CatalogFormat::Regex],
            CatalogType::Transformation => &[CatalogFormat::File, CatalogFormat::Text],
        }
    }
}

impl std::fmt::Display for CatalogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CatalogType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "site" => Ok(CatalogType::Site),
            "replica" => Ok(CatalogType::Replica),
            "transformation" => Ok(CatalogType::Transformation),
            _ => Err(anyhow::anyhow!("Invalid catalog type: {}", s)),
        }
    }
}

/// Catalog format enumeration. Which members are legal depends on the
/// catalog type, see [`CatalogType::allowed_formats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogFormat {
    Xml3,
    Xml4,
    File,
    Regex,
    Text,
}

impl CatalogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogFormat::Xml3 => "xml3",
            CatalogFormat::Xml4 => "xml4",
            CatalogFormat::File => "file",
            CatalogFormat::Regex => "regex",
            CatalogFormat::Text => "text",
        }
    }
}

impl std::fmt::Display for CatalogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CatalogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xml3" => Ok(CatalogFormat::Xml3),
            "xml4" => Ok(CatalogFormat::Xml4),
            "file" => Ok(CatalogFormat::File),
            "regex" => Ok(CatalogFormat::Regex),
            "text" => Ok(CatalogFormat::Text),
            _ => Err(anyhow::anyhow!("Invalid catalog format: {}", s)),
        }
    }
}

/// One catalog's metadata row. A single struct covers all three catalog
/// types; `catalog_type` is the discriminator and `(owner, catalog_type,
/// name)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub owner: String,
    pub catalog_type: CatalogType,
    pub name: String,
    pub format: CatalogFormat,
    /// Set at creation and overwritten on every update, so it acts as a
    /// last-modified marker.
    pub created: DateTime<Utc>,
}

impl CatalogRecord {
    /// Generate a new 10-character ID using reduced alphabet
    pub fn generate_id() -> String {
        const ALPHABET: &[char] = &[
            '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j',
            'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
        ];
        nanoid::nanoid!(10, ALPHABET)
    }

    pub fn new(
        owner: impl Into<String>,
        catalog_type: CatalogType,
        name: impl Into<String>,
        format: CatalogFormat,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            owner: owner.into(),
            catalog_type,
            name: name.into(),
            format,
            created: Utc::now(),
        }
    }
}

/// External projection of a record, addressable by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    pub id: String,
    pub name: String,
    pub created: DateTime<Utc>,
    pub format: CatalogFormat,
    /// Stable type+name-addressed reference usable to fetch, replace, or
    /// delete this catalog.
    pub location: String,
}

impl CatalogDescriptor {
    pub fn from_record(record: &CatalogRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            created: record.created,
            format: record.format,
            location: format!("/catalogs/{}/{}", record.catalog_type, record.name),
        }
    }
}

fn valid_identifier(s: &str) -> bool {
    !s.contains("..") && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
}

/// Validate a catalog name. Names are 1-99 characters drawn from
/// `[a-zA-Z0-9.]` and must not contain `..`.
pub fn validate_name(name: &str) -> Result<(), ServiceError> {
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("Specify catalog name".into()));
    }
    if name.len() > CATALOG_NAME_MAX_LENGTH {
        return Err(ServiceError::InvalidInput(format!(
            "Catalog name too long: {}",
            name.len()
        )));
    }
    if !valid_identifier(name) {
        return Err(ServiceError::InvalidInput(format!(
            "Invalid catalog name: {}",
            name
        )));
    }
    Ok(())
}

/// Validate an owner id. Owner ids land in blob paths and journal entry
/// names, so they are held to the same rules as catalog names.
pub fn validate_owner(owner: &str) -> Result<(), ServiceError> {
    if owner.is_empty() {
        return Err(ServiceError::InvalidInput("Specify owner".into()));
    }
    if owner.len() > CATALOG_NAME_MAX_LENGTH || !valid_identifier(owner) {
        return Err(ServiceError::InvalidInput(format!(
            "Invalid owner id: {}",
            owner
        )));
    }
    Ok(())
}

/// Validate that `format` is legal for `catalog_type`.
pub fn validate_format(
    catalog_type: CatalogType,
    format: CatalogFormat,
) -> Result<(), ServiceError> {
    if !catalog_type.allowed_formats().contains(&format) {
        return Err(ServiceError::InvalidInput(format!(
            "Invalid {} catalog format: {}",
            catalog_type, format
        )));
    }
    Ok(())
}
