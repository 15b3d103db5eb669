use std::cmp::Ordering;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::Comic;

/// Comparison predicate a rule applies to one comic field.
///
/// Operators serialize as their canonical name and resolve back through a
/// fixed case-insensitive table; an unknown name is a rule-definition
/// error at load time, never a silent no-op at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Is,
    IsNot,
    Contains,
    DoesNotContain,
    LessThan,
    GreaterThan,
}

impl Operator {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "is" | "equal" => Some(Self::Is),
            "isnot" | "notequal" => Some(Self::IsNot),
            "contains" => Some(Self::Contains),
            "doesnotcontain" => Some(Self::DoesNotContain),
            "lessthan" => Some(Self::LessThan),
            "greaterthan" => Some(Self::GreaterThan),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::IsNot => "isNot",
            Self::Contains => "contains",
            Self::DoesNotContain => "doesNotContain",
            Self::LessThan => "lessThan",
            Self::GreaterThan => "greaterThan",
        }
    }

    pub fn apply(&self, lhs: &str, rhs: &str) -> bool {
        match self {
            Self::Is => lhs.eq_ignore_ascii_case(rhs),
            Self::IsNot => !lhs.eq_ignore_ascii_case(rhs),
            Self::Contains => lhs.to_lowercase().contains(&rhs.to_lowercase()),
            Self::DoesNotContain => !lhs.to_lowercase().contains(&rhs.to_lowercase()),
            Self::LessThan => compare(lhs, rhs) == Ordering::Less,
            Self::GreaterThan => compare(lhs, rhs) == Ordering::Greater,
        }
    }
}

/// Numeric comparison when both operands parse as numbers, lexical
/// otherwise.
fn compare(lhs: &str, rhs: &str) -> Ordering {
    match (lhs.trim().parse::<f64>(), rhs.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => lhs.cmp(rhs),
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_name(&raw).ok_or_else(|| D::Error::custom(format!("unknown operator '{raw}'")))
    }
}

/// The comic fields a rule may inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComicField {
    Series,
    Number,
    Writer,
    Artist,
    CoverArtist,
    Publisher,
    Description,
    Price,
    Code,
    Reprint,
    Variant,
}

impl ComicField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "series" => Some(Self::Series),
            "number" => Some(Self::Number),
            "writer" => Some(Self::Writer),
            "artist" => Some(Self::Artist),
            "coverartist" => Some(Self::CoverArtist),
            "publisher" => Some(Self::Publisher),
            "description" => Some(Self::Description),
            "price" => Some(Self::Price),
            "code" => Some(Self::Code),
            "reprint" => Some(Self::Reprint),
            "variant" => Some(Self::Variant),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Series => "series",
            Self::Number => "number",
            Self::Writer => "writer",
            Self::Artist => "artist",
            Self::CoverArtist => "coverArtist",
            Self::Publisher => "publisher",
            Self::Description => "description",
            Self::Price => "price",
            Self::Code => "code",
            Self::Reprint => "reprint",
            Self::Variant => "variant",
        }
    }

    /// Stringified field value, the form every operator compares against.
    pub fn value_of(&self, comic: &Comic) -> String {
        match self {
            Self::Series => comic.series.clone(),
            Self::Number => comic.number.to_string(),
            Self::Writer => comic.writer.clone(),
            Self::Artist => comic.artist.clone(),
            Self::CoverArtist => comic.cover_artist.clone(),
            Self::Publisher => comic.publisher.clone(),
            Self::Description => comic.description.clone(),
            Self::Price => comic.price.to_string(),
            Self::Code => comic.code.clone(),
            Self::Reprint => comic.reprint.to_string(),
            Self::Variant => comic.variant.to_string(),
        }
    }
}

impl fmt::Display for ComicField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ComicField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ComicField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_name(&raw).ok_or_else(|| D::Error::custom(format!("unknown comic field '{raw}'")))
    }
}
