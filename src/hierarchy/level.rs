//! Level definitions for the administrative hierarchy
//!
//! Every portal exposes some prefix of this hierarchy. Stateful portals stop at
//! `Locality`; stateless portals may go down to `Record`.

use std::fmt;

/// A level of the district -> mandal -> village -> survey -> khata tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    /// District
    Region,

    /// Mandal or taluka
    SubRegion,

    /// Village
    Locality,

    /// Survey number
    Parcel,

    /// Khata / ownership unit
    Record,
}

impl Level {
    /// All levels, ordered from the root down
    pub const ALL: [Level; 5] = [
        Level::Region,
        Level::SubRegion,
        Level::Locality,
        Level::Parcel,
        Level::Record,
    ];

    /// Zero-based depth of this level (Region is 0)
    pub fn depth(&self) -> usize {
        match self {
            Self::Region => 0,
            Self::SubRegion => 1,
            Self::Locality => 2,
            Self::Parcel => 3,
            Self::Record => 4,
        }
    }

    /// Returns the level at the given depth, if any
    pub fn from_depth(depth: usize) -> Option<Self> {
        Self::ALL.get(depth).copied()
    }

    /// The level directly below this one
    pub fn child(&self) -> Option<Self> {
        Self::from_depth(self.depth() + 1)
    }

    /// The level directly above this one
    pub fn parent(&self) -> Option<Self> {
        self.depth().checked_sub(1).and_then(Self::from_depth)
    }

    /// Short machine name, used for file stems, config keys and URL templates
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::SubRegion => "subregion",
            Self::Locality => "locality",
            Self::Parcel => "parcel",
            Self::Record => "record",
        }
    }

    /// Fixed CSV header for rows of this level
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            Self::Region => &["id", "name"],
            Self::SubRegion => &["region_id", "id", "name"],
            Self::Locality => &["subregion_id", "id", "name"],
            Self::Parcel => &["locality_id", "code", "label"],
            Self::Record => &["locality_id", "parcel_code", "id", "label"],
        }
    }

    /// Name of the CSV file holding rows of this level
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }

    /// Placeholder that endpoint templates use to refer to this level's code
    pub fn placeholder(&self) -> String {
        format!("{{{}}}", self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Region => "Region",
            Self::SubRegion => "SubRegion",
            Self::Locality => "Locality",
            Self::Parcel => "Parcel",
            Self::Record => "Record",
        };
        write!(f, "{}", name)
    }
}
