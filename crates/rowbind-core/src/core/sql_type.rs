// crates/rowbind-core/src/core/sql_type.rs
// ============================================================================
// Module: Rowbind SQL Types
// Description: Column type codes declared on field and parameter mappings.
// Purpose: Give mapping declarations a closed, parseable set of SQL types.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! SQL type codes that mapping documents may name through `jdbcType`
//! attributes. Parsing is case-insensitive; unknown names are rejected by the
//! caller so that typos surface as configuration errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: SQL Type
// ============================================================================

/// SQL column type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[allow(missing_docs, reason = "Variants mirror the standard SQL type code names.")]
pub enum SqlType {
    Array,
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    VarChar,
    LongVarChar,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Null,
    Other,
    Blob,
    Clob,
    Boolean,
    Cursor,
    Undefined,
    NVarChar,
    NChar,
    NClob,
    Struct,
    JavaObject,
    Distinct,
    Ref,
    DataLink,
    RowId,
    LongNVarChar,
    SqlXml,
    DateTimeOffset,
    TimeWithTimezone,
    TimestampWithTimezone,
}

/// Canonical names in declaration order.
const SQL_TYPE_NAMES: &[(&str, SqlType)] = &[
    ("ARRAY", SqlType::Array),
    ("BIT", SqlType::Bit),
    ("TINYINT", SqlType::TinyInt),
    ("SMALLINT", SqlType::SmallInt),
    ("INTEGER", SqlType::Integer),
    ("BIGINT", SqlType::BigInt),
    ("FLOAT", SqlType::Float),
    ("REAL", SqlType::Real),
    ("DOUBLE", SqlType::Double),
    ("NUMERIC", SqlType::Numeric),
    ("DECIMAL", SqlType::Decimal),
    ("CHAR", SqlType::Char),
    ("VARCHAR", SqlType::VarChar),
    ("LONGVARCHAR", SqlType::LongVarChar),
    ("DATE", SqlType::Date),
    ("TIME", SqlType::Time),
    ("TIMESTAMP", SqlType::Timestamp),
    ("BINARY", SqlType::Binary),
    ("VARBINARY", SqlType::VarBinary),
    ("LONGVARBINARY", SqlType::LongVarBinary),
    ("NULL", SqlType::Null),
    ("OTHER", SqlType::Other),
    ("BLOB", SqlType::Blob),
    ("CLOB", SqlType::Clob),
    ("BOOLEAN", SqlType::Boolean),
    ("CURSOR", SqlType::Cursor),
    ("UNDEFINED", SqlType::Undefined),
    ("NVARCHAR", SqlType::NVarChar),
    ("NCHAR", SqlType::NChar),
    ("NCLOB", SqlType::NClob),
    ("STRUCT", SqlType::Struct),
    ("JAVA_OBJECT", SqlType::JavaObject),
    ("DISTINCT", SqlType::Distinct),
    ("REF", SqlType::Ref),
    ("DATALINK", SqlType::DataLink),
    ("ROWID", SqlType::RowId),
    ("LONGNVARCHAR", SqlType::LongNVarChar),
    ("SQLXML", SqlType::SqlXml),
    ("DATETIMEOFFSET", SqlType::DateTimeOffset),
    ("TIME_WITH_TIMEZONE", SqlType::TimeWithTimezone),
    ("TIMESTAMP_WITH_TIMEZONE", SqlType::TimestampWithTimezone),
];

impl SqlType {
    /// Parses a type code name, ignoring ASCII case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        SQL_TYPE_NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, sql_type)| *sql_type)
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub fn name(self) -> &'static str {
        SQL_TYPE_NAMES
            .iter()
            .find(|(_, sql_type)| *sql_type == self)
            .map_or("OTHER", |(name, _)| name)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<SqlType> for String {
    fn from(value: SqlType) -> Self {
        value.name().to_string()
    }
}

impl TryFrom<String> for SqlType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown sql type: {value}"))
    }
}
