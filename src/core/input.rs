//! Destination input
//!
//! Destinations arrive as `{lat, long, weight, name}` records, either as a
//! flat JSON list folded by a single aggregation or as a nested tree:
//!
//! ```json
//! {"aggregate": "any", "weight": 2, "name": "shops", "destinations": [
//!     {"lat": 48.85, "long": 2.35, "weight": 3, "name": "bakery"},
//!     {"lat": 48.86, "long": 2.34}
//! ]}
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::destination::{Aggregation, Destination, DestinationSet, WeightedPlace};
use crate::core::error::{Error, Result};
use crate::core::place::Place;

fn default_weight() -> f64 {
    1.0
}

/// One destination as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationRecord {
    pub lat: f64,
    pub long: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub name: String,
}

impl DestinationRecord {
    pub fn new(lat: f64, long: f64, weight: f64, name: impl Into<String>) -> Self {
        Self { lat, long, weight, name: name.into() }
    }

    /// Validate coordinates and weight
    pub fn to_weighted_place(&self) -> Result<WeightedPlace> {
        WeightedPlace::new(Place::new(self.lat, self.long)?, self.weight, self.name.clone())
    }
}

/// Fold an ordered list of records into a single set
pub fn destinations_from_records(records: &[DestinationRecord], aggregation: Aggregation) -> Result<Destination> {
    let mut set = DestinationSet::new(aggregation);
    for record in records {
        set.add_destination(record.to_weighted_place()?);
    }
    Ok(set.into())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputNode {
    Set {
        aggregate: String,
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default)]
        name: String,
        destinations: Vec<InputNode>,
    },
    Place(DestinationRecord),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputDocument {
    List(Vec<DestinationRecord>),
    Tree(InputNode),
}

impl InputNode {
    fn into_destination(self) -> Result<Destination> {
        match self {
            InputNode::Place(record) => Ok(record.to_weighted_place()?.into()),
            InputNode::Set { aggregate, weight, name, destinations } => {
                let aggregation: Aggregation = aggregate.parse()?;
                let children = destinations
                    .into_iter()
                    .map(InputNode::into_destination)
                    .collect::<Result<Vec<_>>>()?;
                let set = DestinationSet::with_destinations(aggregation, children)
                    .with_weight(weight)?
                    .with_name(name);
                Ok(set.into())
            }
        }
    }
}

/// Parse a JSON destination document
///
/// Flat lists are folded with `list_aggregation`; trees carry their own.
pub fn parse_destinations(json: &str, list_aggregation: Aggregation) -> Result<Destination> {
    let document: InputDocument = serde_json::from_str(json).map_err(|e| {
        if e.is_data() && e.to_string().contains("did not match any variant") {
            Error::ParseError(
                "expected a list of {lat, long, weight, name} records or a {aggregate, destinations} tree".to_string(),
            )
        } else {
            e.into()
        }
    })?;
    match document {
        InputDocument::List(records) => destinations_from_records(&records, list_aggregation),
        InputDocument::Tree(node) => node.into_destination(),
    }
}

/// Read and parse a JSON destination file
pub fn load_destinations<P: AsRef<Path>>(path: P, list_aggregation: Aggregation) -> Result<Destination> {
    let json = std::fs::read_to_string(path)?;
    parse_destinations(&json, list_aggregation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flat_list_defaults() {
        let dest = parse_destinations(
            r#"[{"lat": 1, "long": 2}, {"lat": 3, "long": 4, "weight": 2.5, "name": "work"}]"#,
            Aggregation::TwoOfThem,
        )
        .unwrap();
        let Destination::Set(set) = &dest else { panic!("expected a set") };
        assert_eq!(set.aggregation(), Aggregation::TwoOfThem);
        let leaves = dest.leaves();
        assert_eq!(leaves[0].weight(), 1.0);
        assert_eq!(leaves[0].name(), "");
        assert_eq!(leaves[1].name(), "work");
        assert_eq!(leaves[1].weight(), 2.5);
    }

    #[test]
    fn test_nested_tree() {
        let json = r#"{
            "aggregate": "all",
            "destinations": [
                {"lat": 0, "long": 0, "name": "home"},
                {"aggregate": "any", "weight": 2, "name": "shops", "destinations": [
                    {"lat": 1, "long": 1},
                    {"lat": 2, "long": 2}
                ]}
            ]
        }"#;
        let dest = parse_destinations(json, Aggregation::All).unwrap();
        let Destination::Set(root) = &dest else { panic!("expected a set") };
        assert_eq!(root.destinations().len(), 2);
        let Destination::Set(shops) = &root.destinations()[1] else { panic!("expected a nested set") };
        assert_eq!(shops.aggregation(), Aggregation::Any);
        assert_eq!(shops.weight(), 2.0);
        assert_eq!(shops.name(), "shops");
        assert_eq!(dest.places().len(), 3);
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            parse_destinations(r#"[{"lat": 95, "long": 0}]"#, Aggregation::All),
            Err(Error::InvalidPlace { .. })
        ));
        assert!(matches!(
            parse_destinations(r#"[{"lat": 1, "long": 0, "weight": 0}]"#, Aggregation::All),
            Err(Error::InvalidWeight(_))
        ));
        assert!(matches!(
            parse_destinations(r#"{"aggregate": "anyy", "destinations": []}"#, Aggregation::All),
            Err(Error::UnknownVariant { .. })
        ));
        assert!(matches!(parse_destinations(r#"{"foo": 1}"#, Aggregation::All), Err(Error::ParseError(_))));
        assert!(matches!(parse_destinations("not json", Aggregation::All), Err(Error::ParseError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"lat": 10, "long": 20, "name": "x"}}]"#).unwrap();
        let dest = load_destinations(file.path(), Aggregation::Any).unwrap();
        assert_eq!(dest.leaves()[0].name(), "x");

        assert!(matches!(
            load_destinations("/definitely/not/here.json", Aggregation::Any),
            Err(Error::IoError(_))
        ));
    }

    #[test]
    fn test_records_to_tree() {
        let records = vec![DestinationRecord::new(1.0, 0.0, 1.0, "a"), DestinationRecord::new(0.0, 1.0, 2.0, "b")];
        let dest = destinations_from_records(&records, Aggregation::All).unwrap();
        assert_eq!(dest.leaves().len(), 2);
        assert_eq!(dest.centroid().unwrap(), Place::new(1.0 / 3.0, 2.0 / 3.0).unwrap());
    }
}
