//! Value types of data elements and attributes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage value type of a data element or tracked entity attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    #[default]
    Number,
    Integer,
    IntegerPositive,
    IntegerNegative,
    IntegerZeroOrPositive,
    Percentage,
    UnitInterval,
    Text,
    LongText,
    Letter,
    PhoneNumber,
    Email,
    Date,
    Datetime,
    Time,
    Age,
    Boolean,
    TrueOnly,
    OrganisationUnit,
}

impl ValueType {
    /// Classify into the coarse type used by expression type checking
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Number
            | Self::Integer
            | Self::IntegerPositive
            | Self::IntegerNegative
            | Self::IntegerZeroOrPositive
            | Self::Percentage
            | Self::UnitInterval => DataType::Numeric,
            Self::Date | Self::Datetime | Self::Age => DataType::Date,
            Self::Boolean | Self::TrueOnly => DataType::Boolean,
            Self::Text
            | Self::LongText
            | Self::Letter
            | Self::PhoneNumber
            | Self::Email
            | Self::Time
            | Self::OrganisationUnit => DataType::Text,
        }
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self.data_type(), DataType::Numeric)
    }

    pub const fn is_boolean(&self) -> bool {
        matches!(self.data_type(), DataType::Boolean)
    }
}

/// Coarse type of an expression or one of its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    #[default]
    Numeric,
    Text,
    Date,
    Boolean,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Text => write!(f, "text"),
            Self::Date => write!(f, "date"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}
