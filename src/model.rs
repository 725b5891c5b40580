//! Entity metadata: column types, entity definitions, and the model registry.
//!
//! The registry is the adapter's read-only view of the application model. It is
//! built once at startup by whatever loads the model (an external collaborator)
//! and passed explicitly to compilation and execution; there is no ambient
//! "current model" global. Lookups by entity name yield typed failures instead
//! of property-access surprises.

use crate::error::SluiceError;
use sea_query::Value;
use std::collections::HashMap;

/// Abstract column types declared in the model.
///
/// The dialect mapper owns the translation to native PostgreSQL types and the
/// (de)serialization of values of each type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Text,
    Integer,
    BigInt,
    Boolean,
    Double,
    Decimal,
    Timestamp,
    Date,
    Binary,
    Json,
}

impl ColumnType {
    /// Native PostgreSQL type name for this abstract type
    pub fn native_type(&self) -> &'static str {
        match self {
            ColumnType::Uuid => "uuid",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Boolean => "boolean",
            ColumnType::Double => "double precision",
            ColumnType::Decimal => "numeric",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Date => "date",
            ColumnType::Binary => "bytea",
            ColumnType::Json => "jsonb",
        }
    }
}

/// Default-value rule for a column with no supplied value on insert
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultRule {
    /// Bind this literal value
    Literal(Value),
    /// Generate a fresh random 128-bit identifier
    GeneratedUuid,
}

/// One column of an entity definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    key: bool,
    default: Option<DefaultRule>,
}

impl ColumnDef {
    /// Define a column with the given name and abstract type
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            key: false,
            default: None,
        }
    }

    /// Mark this column as part of the primary key
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Mark this column as nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attach a default-value rule
    pub fn default_rule(mut self, rule: DefaultRule) -> Self {
        self.default = Some(rule);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_key(&self) -> bool {
        self.key
    }

    pub fn default(&self) -> Option<&DefaultRule> {
        self.default.as_ref()
    }
}

/// An entity: logical name, physical table, and ordered column definitions.
///
/// Immutable once handed to the registry builder. Column order is declaration
/// order and drives the projection used when a SELECT names no columns.
#[derive(Debug, Clone)]
pub struct EntityDef {
    name: String,
    table: String,
    columns: Vec<ColumnDef>,
}

impl EntityDef {
    /// Define an entity mapped to the given physical table
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Append a column definition (declaration order is preserved)
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Key columns in declaration order
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.is_key())
    }

    /// Look up a declared column by name
    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Look up a column, raising the compile-time error for unknown names
    pub(crate) fn require_column(&self, name: &str) -> Result<&ColumnDef, SluiceError> {
        self.column_def(name).ok_or_else(|| SluiceError::UnknownColumn {
            entity: self.name.clone(),
            column: name.to_string(),
        })
    }
}

/// Typed registry of entity definitions, keyed by entity name.
///
/// Built once via [`ModelRegistry::builder`], read-only afterwards.
///
/// # Examples
///
/// ```
/// use sluice::{ColumnDef, ColumnType, EntityDef, ModelRegistry};
///
/// let registry = ModelRegistry::builder("csw")
///     .entity(
///         EntityDef::new("Beers", "csw_beers")
///             .column(ColumnDef::new("ID", ColumnType::Uuid).key())
///             .column(ColumnDef::new("name", ColumnType::Text).nullable()),
///     )
///     .build()
///     .unwrap();
/// assert!(registry.entity("Beers").is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    namespace: String,
    entities: HashMap<String, EntityDef>,
}

impl ModelRegistry {
    /// Start building a registry for the given namespace
    pub fn builder(namespace: impl Into<String>) -> ModelRegistryBuilder {
        ModelRegistryBuilder {
            namespace: namespace.into(),
            entities: Vec::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolve an entity by name
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::UnknownEntity`] when the name is absent.
    pub fn entity(&self, name: &str) -> Result<&EntityDef, SluiceError> {
        self.entities.get(name).ok_or_else(|| SluiceError::UnknownEntity {
            entity: name.to_string(),
        })
    }
}

/// Builder validating the model invariants at `build()` time
pub struct ModelRegistryBuilder {
    namespace: String,
    entities: Vec<EntityDef>,
}

impl ModelRegistryBuilder {
    /// Add an entity definition
    pub fn entity(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self
    }

    /// Validate and freeze the registry.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidModel`] when an entity name repeats, an
    /// entity has no columns, duplicate column names, or no key column.
    pub fn build(self) -> Result<ModelRegistry, SluiceError> {
        let mut entities = HashMap::with_capacity(self.entities.len());
        for entity in self.entities {
            if entity.columns.is_empty() {
                return Err(SluiceError::InvalidModel {
                    detail: format!("entity {} declares no columns", entity.name),
                });
            }
            if entity.key_columns().next().is_none() {
                return Err(SluiceError::InvalidModel {
                    detail: format!("entity {} declares no key column", entity.name),
                });
            }
            let mut seen = Vec::with_capacity(entity.columns.len());
            for column in &entity.columns {
                if seen.contains(&column.name()) {
                    return Err(SluiceError::InvalidModel {
                        detail: format!(
                            "entity {} declares column {} more than once",
                            entity.name,
                            column.name()
                        ),
                    });
                }
                seen.push(column.name());
            }
            let name = entity.name.clone();
            if entities.insert(name.clone(), entity).is_some() {
                return Err(SluiceError::InvalidModel {
                    detail: format!("duplicate entity name in registry: {name}"),
                });
            }
        }
        Ok(ModelRegistry {
            namespace: self.namespace,
            entities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beers() -> EntityDef {
        EntityDef::new("Beers", "csw_beers")
            .column(ColumnDef::new("ID", ColumnType::Uuid).key())
            .column(ColumnDef::new("name", ColumnType::Text).nullable())
            .column(ColumnDef::new("abv", ColumnType::Double).nullable())
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ModelRegistry::builder("csw").entity(beers()).build().unwrap();
        let entity = registry.entity("Beers").unwrap();
        assert_eq!(entity.table(), "csw_beers");
        assert_eq!(entity.columns().len(), 3);
        assert!(matches!(
            registry.entity("Breweries"),
            Err(SluiceError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn test_key_columns_in_declaration_order() {
        let entity = EntityDef::new("Pairs", "pairs")
            .column(ColumnDef::new("left", ColumnType::Uuid).key())
            .column(ColumnDef::new("right", ColumnType::Uuid).key())
            .column(ColumnDef::new("note", ColumnType::Text).nullable());
        let keys: Vec<_> = entity.key_columns().map(|c| c.name().to_string()).collect();
        assert_eq!(keys, vec!["left", "right"]);
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let err = ModelRegistry::builder("csw")
            .entity(beers())
            .entity(beers())
            .build()
            .unwrap_err();
        assert!(matches!(err, SluiceError::InvalidModel { .. }));
    }

    #[test]
    fn test_keyless_entity_rejected() {
        let entity = EntityDef::new("Notes", "notes")
            .column(ColumnDef::new("text", ColumnType::Text));
        let err = ModelRegistry::builder("csw").entity(entity).build().unwrap_err();
        assert!(matches!(err, SluiceError::InvalidModel { .. }));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let entity = EntityDef::new("Notes", "notes")
            .column(ColumnDef::new("id", ColumnType::Uuid).key())
            .column(ColumnDef::new("id", ColumnType::Text));
        let err = ModelRegistry::builder("csw").entity(entity).build().unwrap_err();
        assert!(matches!(err, SluiceError::InvalidModel { .. }));
    }

    #[test]
    fn test_native_type_names() {
        assert_eq!(ColumnType::Uuid.native_type(), "uuid");
        assert_eq!(ColumnType::Decimal.native_type(), "numeric");
        assert_eq!(ColumnType::Binary.native_type(), "bytea");
    }
}
