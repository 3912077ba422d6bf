//! Catalog of OpenStreetMap features
//!
//! Each feature maps to an Overpass selector built from its OSM tags.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A searchable kind of map feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    // amenity
    Parking,
    Toilets,
    CommunityCentre,
    PostOffice,
    Cafe,
    FastFood,
    // emergency
    Defibrillator,
    // building
    School,
    Kindergarten,
    Retail,
    VacantBuilding,
    // leisure
    Pitch,
    FitnessCentre,
    // tourism
    Hotel,
    Museum,
    // thoroughfare
    IrishStreetName,
}

impl Feature {
    /// Every feature in the catalog
    pub const ALL: [Feature; 16] = [
        Feature::Parking,
        Feature::Toilets,
        Feature::CommunityCentre,
        Feature::PostOffice,
        Feature::Cafe,
        Feature::FastFood,
        Feature::Defibrillator,
        Feature::School,
        Feature::Kindergarten,
        Feature::Retail,
        Feature::VacantBuilding,
        Feature::Pitch,
        Feature::FitnessCentre,
        Feature::Hotel,
        Feature::Museum,
        Feature::IrishStreetName,
    ];

    /// Overpass selector (without bounding box)
    pub fn selector(&self) -> &'static str {
        match self {
            Feature::Parking => r#"nwr["amenity"="parking"]"#,
            Feature::Toilets => r#"nwr["amenity"="toilets"]"#,
            Feature::CommunityCentre => r#"nwr["amenity"="community_centre"]"#,
            Feature::PostOffice => r#"nwr["amenity"="post_office"]"#,
            Feature::Cafe => r#"nwr["amenity"="cafe"]"#,
            Feature::FastFood => r#"nwr["amenity"="fast_food"]"#,
            Feature::Defibrillator => r#"node["emergency"="defibrillator"]"#,
            Feature::School => r#"nwr["building"="school"]"#,
            Feature::Kindergarten => r#"nwr["building"="kindergarten"]"#,
            Feature::Retail => r#"nwr["building"="retail"]"#,
            Feature::VacantBuilding => r#"nwr["building"]["vacant"="yes"]"#,
            Feature::Pitch => r#"nwr["leisure"="pitch"]"#,
            Feature::FitnessCentre => r#"nwr["leisure"="fitness_centre"]"#,
            Feature::Hotel => r#"nwr["tourism"="hotel"]"#,
            Feature::Museum => r#"nwr["tourism"="museum"]"#,
            Feature::IrishStreetName => r#"way["name:ga"]"#,
        }
    }

    /// Identifier used in tool arguments
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Parking => "parking",
            Feature::Toilets => "toilets",
            Feature::CommunityCentre => "community_centre",
            Feature::PostOffice => "post_office",
            Feature::Cafe => "cafe",
            Feature::FastFood => "fast_food",
            Feature::Defibrillator => "defibrillator",
            Feature::School => "school",
            Feature::Kindergarten => "kindergarten",
            Feature::Retail => "retail",
            Feature::VacantBuilding => "vacant_building",
            Feature::Pitch => "pitch",
            Feature::FitnessCentre => "fitness_centre",
            Feature::Hotel => "hotel",
            Feature::Museum => "museum",
            Feature::IrishStreetName => "irish_street_name",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| ValidationError::UnknownFeature {
                name: s.to_string(),
            })
    }
}
