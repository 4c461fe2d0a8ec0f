use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Week parity ──────────────────────────────────────────────────────────

/// Which weeks of the biweekly cycle a lesson runs on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum WeekParity {
    #[default]
    All,
    /// Numerator weeks (числитель)
    Odd,
    /// Denominator weeks (знаменатель)
    Even,
    /// A tag the source uses that maps to none of the above, kept verbatim.
    /// Never "all", "odd" or "even": those load back as the variants above.
    Other(String),
}

impl WeekParity {
    /// Tag used in persisted files.
    pub fn as_tag(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Odd => "odd",
            Self::Even => "even",
            Self::Other(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "all" => Self::All,
            "odd" => Self::Odd,
            "even" => Self::Even,
            other => Self::Other(other.to_string()),
        }
    }

    /// Label shown to students, in the portal's own terms.
    pub fn label(&self) -> &str {
        match self {
            Self::All => "все",
            Self::Odd => "числитель",
            Self::Even => "знаменатель",
            Self::Other(tag) => tag,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Serialize for WeekParity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for WeekParity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

// ── Lesson entries ───────────────────────────────────────────────────────

/// One lesson as stored under a teacher key in the persisted index.
///
/// `group`, `subject`, `day`, `time` and `room` are the stable field names of
/// the index file; `week` and `pair` are omitted when absent so files written
/// by older builds still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LessonEntry {
    pub group: String,
    pub subject: String,
    /// Weekday name, weekday number or date, as the source gave it
    pub day: String,
    /// "HH:MM–HH:MM"
    pub time: String,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "WeekParity::is_all")]
    pub week: WeekParity,
    /// Pair (class period) number, when the source numbers them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
}

/// A lesson attributed to exactly one teacher.
///
/// A class taught by several teachers becomes several `Lesson`s.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lesson {
    pub teacher: String,
    #[serde(flatten)]
    pub entry: LessonEntry,
}

/// Canonical teacher name → that teacher's lessons.
pub type TeacherMap = BTreeMap<String, Vec<LessonEntry>>;

// ── Raw group dump ───────────────────────────────────────────────────────

/// Every lesson parsed for one group, with the source it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub source: String,
    pub lessons: Vec<Lesson>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_tags() {
        assert_eq!(WeekParity::from_tag("odd"), WeekParity::Odd);
        assert_eq!(WeekParity::from_tag("even").as_tag(), "even");
        assert_eq!(
            WeekParity::from_tag("каждую третью"),
            WeekParity::Other("каждую третью".into())
        );
        assert_eq!(WeekParity::Odd.label(), "числитель");
        assert_eq!(WeekParity::Other("x".into()).label(), "x");
    }
}
