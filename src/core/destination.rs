//! Destination trees
//!
//! A destination is either a single weighted place or a set of destinations
//! whose costs are folded by an [`Aggregation`]. Every node's weight is
//! applied exactly once: a leaf scales its raw cost by its own weight and a
//! nested set is scaled by its weight when its parent folds it. The root
//! set's own weight never scales the tree's cost.

use std::fmt;
use std::str::FromStr;

use log::{trace, warn};
use serde::Serialize;

use crate::core::cost::CostCalculator;
use crate::core::error::{Error, Result};
use crate::core::matrix::CostMatrix;
use crate::core::place::Place;

/// Sets larger than this make the exact traveling-salesman search noticeably slow
pub const TSP_SOFT_LIMIT: usize = 8;

/// A place with a visit weight and a display name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedPlace {
    #[serde(flatten)]
    place: Place,
    weight: f64,
    name: String,
}

impl WeightedPlace {
    /// Create a weighted place; the weight must be finite and positive
    pub fn new(place: Place, weight: f64, name: impl Into<String>) -> Result<Self> {
        validate_weight(weight)?;
        Ok(Self { place, weight, name: name.into() })
    }

    pub fn place(&self) -> Place {
        self.place
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn validate_weight(weight: f64) -> Result<()> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(Error::InvalidWeight(weight));
    }
    Ok(())
}

/// How a set folds the costs of its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Aggregation {
    /// Visit everything: sum of child costs
    All,
    /// Visit whichever is cheapest: minimum child cost
    Any,
    /// One round trip through the two cheapest: mean of the two lowest costs
    TwoOfThem,
    /// Cheapest path from the origin through every place of the set
    ///
    /// Exact search, exponential in the number of places. Only evaluated one
    /// origin at a time.
    TravelingSalesman,
}

impl Aggregation {
    pub const NAMES: &'static [&'static str] = &["all", "any", "two-of-them", "traveling-salesman"];

    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::All => "all",
            Aggregation::Any => "any",
            Aggregation::TwoOfThem => "two-of-them",
            Aggregation::TravelingSalesman => "traveling-salesman",
        }
    }

    /// Fold already-weighted child costs into one
    pub fn aggregate(&self, costs: &[f64]) -> Result<f64> {
        if costs.is_empty() {
            return Err(Error::EmptyDestinationSet(String::new()));
        }
        match self {
            Aggregation::All => Ok(costs.iter().sum()),
            Aggregation::Any => Ok(costs.iter().copied().fold(f64::INFINITY, f64::min)),
            Aggregation::TwoOfThem => {
                let mut lowest = f64::INFINITY;
                let mut second = f64::INFINITY;
                for &cost in costs {
                    if cost < lowest {
                        second = lowest;
                        lowest = cost;
                    } else if cost < second {
                        second = cost;
                    }
                }
                if costs.len() < 2 {
                    Ok(lowest)
                } else {
                    Ok((lowest + second) / 2.0)
                }
            }
            Aggregation::TravelingSalesman => Err(Error::Unsupported(
                "traveling-salesman costs depend on the whole path and cannot be folded from child costs".to_string(),
            )),
        }
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "all" => Ok(Aggregation::All),
            "any" => Ok(Aggregation::Any),
            "two-of-them" => Ok(Aggregation::TwoOfThem),
            "traveling-salesman" | "tsp" => Ok(Aggregation::TravelingSalesman),
            _ => Err(Error::unknown_variant("aggregation", s, Self::NAMES)),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of a destination tree
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Place(WeightedPlace),
    Set(DestinationSet),
}

/// An aggregating group of destinations
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationSet {
    aggregation: Aggregation,
    destinations: Vec<Destination>,
    weight: f64,
    name: String,
}

impl DestinationSet {
    /// An empty set with weight 1
    pub fn new(aggregation: Aggregation) -> Self {
        Self { aggregation, destinations: Vec::new(), weight: 1.0, name: String::new() }
    }

    pub fn with_destinations(aggregation: Aggregation, destinations: Vec<Destination>) -> Self {
        Self { destinations, ..Self::new(aggregation) }
    }

    pub fn with_weight(mut self, weight: f64) -> Result<Self> {
        validate_weight(weight)?;
        self.weight = weight;
        Ok(self)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn add_destination(&mut self, destination: impl Into<Destination>) {
        self.destinations.push(destination.into());
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn ensure_not_empty(&self) -> Result<()> {
        if self.destinations.is_empty() {
            return Err(Error::EmptyDestinationSet(self.name.clone()));
        }
        Ok(())
    }

    /// Distinct leaf places, in depth-first order
    fn distinct_places(&self) -> Vec<Place> {
        let mut places = Vec::new();
        for place in Destination::collect_places(&self.destinations) {
            if !places.contains(&place) {
                places.push(place);
            }
        }
        places
    }

    /// Cheapest Hamiltonian path from `origin` through every distinct place of the set
    ///
    /// Legs are looked up in `overlay` first, then in `matrix`, accepting
    /// either direction. The path does not return to the origin. Leaf
    /// weights play no part; the set weight is applied by the parent.
    ///
    /// Exact branch-and-bound search: worst case O(n!) for n places.
    pub fn tsp_cost(&self, origin: &Place, matrix: &CostMatrix, overlay: Option<&CostMatrix>) -> Result<f64> {
        self.ensure_not_empty()?;
        let places = self.distinct_places();
        let n = places.len();
        if n == 0 {
            return Err(Error::EmptyDestinationSet(self.name.clone()));
        }
        if n > TSP_SOFT_LIMIT {
            warn!(
                "Traveling-salesman set '{}' has {n} places, exact search may take a long time",
                self.name
            );
        }

        let leg = |a: &Place, b: &Place| -> Result<f64> {
            overlay
                .and_then(|m| m.get_either(a, b))
                .or_else(|| matrix.get_either(a, b))
                .ok_or(Error::MatrixIncomplete { origin: *a, destination: *b })
        };

        let first_legs = places.iter().map(|p| leg(origin, p)).collect::<Result<Vec<_>>>()?;
        let mut legs = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let cost = leg(&places[i], &places[j])?;
                legs[i][j] = cost;
                legs[j][i] = cost;
            }
        }

        let mut search = PathSearch { legs: &legs, visited: vec![false; n], best: f64::INFINITY };
        for (start, &cost) in first_legs.iter().enumerate() {
            search.visit(start, 1, cost);
        }
        trace!("Traveling-salesman path from {origin} through {n} places costs {}", search.best);
        Ok(search.best)
    }
}

/// Depth-first enumeration of visiting orders, pruned by the best total so far
struct PathSearch<'a> {
    legs: &'a [Vec<f64>],
    visited: Vec<bool>,
    best: f64,
}

impl PathSearch<'_> {
    fn visit(&mut self, current: usize, depth: usize, so_far: f64) {
        if so_far >= self.best {
            return;
        }
        if depth == self.legs.len() {
            self.best = so_far;
            return;
        }
        self.visited[current] = true;
        for next in 0..self.legs.len() {
            if !self.visited[next] {
                self.visit(next, depth + 1, so_far + self.legs[current][next]);
            }
        }
        self.visited[current] = false;
    }
}

impl From<WeightedPlace> for Destination {
    fn from(place: WeightedPlace) -> Self {
        Destination::Place(place)
    }
}

impl From<DestinationSet> for Destination {
    fn from(set: DestinationSet) -> Self {
        Destination::Set(set)
    }
}

impl Destination {
    pub fn weight(&self) -> f64 {
        match self {
            Destination::Place(p) => p.weight(),
            Destination::Set(s) => s.weight(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Destination::Place(p) => p.name(),
            Destination::Set(s) => s.name(),
        }
    }

    /// Scale this node's cost as its parent folds it
    ///
    /// Leaves already carry their weight; sets get theirs here.
    fn as_child(&self, cost: f64) -> f64 {
        match self {
            Destination::Place(_) => cost,
            Destination::Set(s) => cost * s.weight,
        }
    }

    /// Every leaf place, depth-first, duplicates kept
    pub fn places(&self) -> Vec<Place> {
        Self::collect_places(std::slice::from_ref(self))
    }

    fn collect_places(destinations: &[Destination]) -> Vec<Place> {
        destinations
            .iter()
            .flat_map(|d| d.leaves())
            .map(|leaf| leaf.place())
            .collect()
    }

    /// Every leaf, depth-first
    pub fn leaves(&self) -> Vec<&WeightedPlace> {
        match self {
            Destination::Place(p) => vec![p],
            Destination::Set(s) => s.destinations.iter().flat_map(|d| d.leaves()).collect(),
        }
    }

    /// Whether a traveling-salesman set appears anywhere in the tree
    pub fn has_traveling_salesman(&self) -> bool {
        match self {
            Destination::Place(_) => false,
            Destination::Set(s) => {
                s.aggregation == Aggregation::TravelingSalesman
                    || s.destinations.iter().any(|d| d.has_traveling_salesman())
            }
        }
    }

    /// Weight-averaged centroid of the child centroids
    pub fn centroid(&self) -> Result<Place> {
        match self {
            Destination::Place(p) => Ok(p.place()),
            Destination::Set(s) => {
                s.ensure_not_empty()?;
                let mut lat = 0.0;
                let mut long = 0.0;
                let mut weights = 0.0;
                for child in &s.destinations {
                    let centroid = child.centroid()?;
                    let weight = child.weight();
                    lat += centroid.lat() * weight;
                    long += centroid.long() * weight;
                    weights += weight;
                }
                Place::new(lat / weights, long / weights)
            }
        }
    }

    /// Cost from every origin, read from a filled matrix
    ///
    /// Fails with `MatrixIncomplete` when an (origin, leaf) entry is missing
    /// and with `Unsupported` when the tree holds a traveling-salesman set;
    /// use [`cost_from`](Self::cost_from) for those.
    pub fn costs(&self, origins: &[Place], matrix: &CostMatrix) -> Result<Vec<f64>> {
        match self {
            Destination::Place(p) => origins
                .iter()
                .map(|origin| {
                    matrix
                        .get(origin, &p.place)
                        .map(|cost| cost * p.weight)
                        .ok_or(Error::MatrixIncomplete { origin: *origin, destination: p.place })
                })
                .collect(),
            Destination::Set(s) => {
                s.ensure_not_empty()?;
                if s.aggregation == Aggregation::TravelingSalesman {
                    return Err(Error::Unsupported(format!(
                        "traveling-salesman set '{}' can only be queried one origin at a time",
                        s.name
                    )));
                }
                let children = s
                    .destinations
                    .iter()
                    .map(|d| d.costs(origins, matrix).map(|costs| costs.into_iter().map(|c| d.as_child(c)).collect::<Vec<f64>>()))
                    .collect::<Result<Vec<Vec<f64>>>>()?;

                let mut column = Vec::with_capacity(children.len());
                (0..origins.len())
                    .map(|i| {
                        column.clear();
                        column.extend(children.iter().map(|child| child[i]));
                        s.aggregation.aggregate(&column)
                    })
                    .collect()
            }
        }
    }

    /// Cost from a single origin, supporting traveling-salesman sets at any depth
    ///
    /// The matrix (or `overlay`) must hold the origin to every leaf and, for
    /// traveling-salesman sets, the legs between their places.
    pub fn cost_from(&self, origin: &Place, matrix: &CostMatrix, overlay: Option<&CostMatrix>) -> Result<f64> {
        match self {
            Destination::Place(p) => {
                let raw = overlay
                    .and_then(|m| m.get(origin, &p.place))
                    .or_else(|| matrix.get(origin, &p.place))
                    .ok_or(Error::MatrixIncomplete { origin: *origin, destination: p.place })?;
                Ok(raw * p.weight)
            }
            Destination::Set(s) if s.aggregation == Aggregation::TravelingSalesman => {
                s.tsp_cost(origin, matrix, overlay)
            }
            Destination::Set(s) => {
                s.ensure_not_empty()?;
                let costs = s
                    .destinations
                    .iter()
                    .map(|d| d.cost_from(origin, matrix, overlay).map(|c| d.as_child(c)))
                    .collect::<Result<Vec<_>>>()?;
                s.aggregation.aggregate(&costs)
            }
        }
    }

    /// Cost from `origin` computed straight from a calculator, without a matrix
    ///
    /// Leaf costs are doubled to account for the way back.
    pub fn direct_cost(&self, origin: &Place, calculator: &dyn CostCalculator) -> Result<f64> {
        match self {
            Destination::Place(p) => Ok(2.0 * calculator.cost(origin, &p.place) * p.weight),
            Destination::Set(s) if s.aggregation == Aggregation::TravelingSalesman => {
                let places = s.distinct_places();
                let mut legs = CostMatrix::new();
                for (i, a) in places.iter().enumerate() {
                    legs.insert(*origin, *a, calculator.cost(origin, a));
                    for b in &places[i + 1..] {
                        legs.insert(*a, *b, calculator.cost(a, b));
                    }
                }
                s.tsp_cost(origin, &legs, None)
            }
            Destination::Set(s) => {
                s.ensure_not_empty()?;
                let costs = s
                    .destinations
                    .iter()
                    .map(|d| d.direct_cost(origin, calculator).map(|c| d.as_child(c)))
                    .collect::<Result<Vec<_>>>()?;
                s.aggregation.aggregate(&costs)
            }
        }
    }
}
