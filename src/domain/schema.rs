use crate::constants::columns;
use crate::error::{EtlError, Result};

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable,
        }
    }

    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, false)
    }

    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, true)
    }
}

/// Ordered column descriptor for a [`RecordBatch`](super::RecordBatch).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Raw generator output. `age` mixes integers and the `"unknown"`
    /// sentinel, so it is carried as text.
    pub fn bronze() -> Self {
        use FieldType::*;
        Self::new(vec![
            Field::nullable(columns::NAME, Text),
            Field::nullable(columns::EMAIL, Text),
            Field::nullable(columns::PHONE, Text),
            Field::nullable(columns::AGE, Text),
            Field::nullable(columns::SALARY, Int),
            Field::nullable(columns::ADDRESS, Text),
            Field::nullable(columns::SIGNUP_DATE, Text),
            Field::nullable(columns::STATUS, Text),
        ])
    }

    /// Canonical cleaned layout.
    pub fn silver() -> Self {
        use FieldType::*;
        Self::new(vec![
            Field::required(columns::NAME, Text),
            Field::required(columns::EMAIL, Text),
            Field::nullable(columns::PHONE, Text),
            Field::required(columns::AGE, Int),
            Field::required(columns::SALARY, Int),
            Field::required(columns::ADDRESS, Text),
            Field::required(columns::SIGNUP_DATE, Text),
            Field::required(columns::STATUS, Text),
        ])
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names from `required` that this schema does not carry, in the order
    /// they were asked for.
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.index_of(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    pub fn require(&self, required: &[&str]) -> Result<()> {
        let missing = self.missing(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EtlError::Schema { missing })
        }
    }

    /// Copy of this schema with extra trailing fields.
    pub fn extend(&self, extra: impl IntoIterator<Item = Field>) -> Self {
        let mut fields = self.fields.clone();
        fields.extend(extra);
        Self { fields }
    }
}
