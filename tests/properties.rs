//! Library-level properties of the cost model and contouring
//!
//! Randomised cases use a fixed seed so failures reproduce.

use std::sync::Arc;

use isocost::{
    Aggregation, BoundingBox, CellSample, CostCalculator, CostMatrix, CostMatrixProvider, DefaultCostMatrixProvider,
    DestinationRecord, Discretize, Discretizer, Euclidean, Haversine, LineDrawer, Place, Scale, Taxicab,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[ctor::ctor]
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_place(rng: &mut StdRng) -> Place {
    Place::new(rng.random_range(-90.0..=90.0), rng.random_range(-180.0..=180.0)).unwrap()
}

#[tokio::test]
async fn weighted_all_destinations_sum_unit_distances() {
    let records = [
        DestinationRecord::new(1.0, 0.0, 1.0, "w1"),
        DestinationRecord::new(0.0, 1.0, 2.0, "w2"),
        DestinationRecord::new(-1.0, 0.0, 3.0, "w3"),
        DestinationRecord::new(0.0, -1.0, 4.0, "w4"),
    ];
    let destination = isocost::destinations_from_records(&records, Aggregation::All).unwrap();
    let origin = [Place::new(0.0, 0.0).unwrap()];

    let provider = DefaultCostMatrixProvider::new(Arc::new(Euclidean));
    let matrix = provider.create_cost_matrix(&origin, &destination.places()).await.unwrap();

    assert_eq!(destination.costs(&origin, &matrix).unwrap(), vec![10.0]);
}

#[test]
fn haversine_self_distance_is_zero() {
    let mut rng = StdRng::seed_from_u64(0x150c05);
    let haversine = Haversine::new();
    for _ in 0..1000 {
        let place = random_place(&mut rng);
        assert_eq!(haversine.cost(&place, &place), 0.0, "non-zero self distance at {place}");
    }
}

#[test]
fn discretize_is_idempotent() {
    let discretizers = [
        Discretizer::linear(0.5, 0.0).unwrap(),
        Discretizer::linear(0.1, 0.0).unwrap(),
        Discretizer::linear(0.3, 1.7).unwrap(),
        Discretizer::new(Scale::Ln, 0.5, 0.0).unwrap(),
        Discretizer::new(Scale::Log2, 1.0, 0.0).unwrap(),
        Discretizer::new(Scale::Log10, 0.25, 0.0).unwrap(),
        Discretizer::new(Scale::Log(3.0), 1.0, 2.0).unwrap(),
        Discretizer::new(Scale::Sqrt, 2.0, 0.0).unwrap(),
    ];
    let mut rng = StdRng::seed_from_u64(7);
    for discretizer in &discretizers {
        for _ in 0..1000 {
            let v: f64 = rng.random_range(0.0..500.0);
            let once = discretizer.discretize(v);
            assert_eq!(discretizer.discretize(once), once, "{discretizer} is not idempotent at {v}");
        }
    }
}

#[test]
fn discretize_keeps_ceiling_for_large_values_on_fine_steps() {
    let mut rng = StdRng::seed_from_u64(11);
    for (step, offset) in [(1e-6, 0.0), (1e-3, 1e7), (1e-4, -250.0)] {
        let discretizer = Discretizer::linear(step, offset).unwrap();
        for _ in 0..1000 {
            let v: f64 = offset + rng.random_range(1e3..1e4);
            let once = discretizer.discretize(v);
            let noise = 1e-12 * v.abs();
            assert!(once >= v - noise, "{discretizer} dropped {v} to {once}");
            assert!(once - v <= step + noise, "{discretizer} raised {v} to {once}");
            assert_eq!(discretizer.discretize(once), once, "{discretizer} is not idempotent at {v}");
        }
    }
}

#[tokio::test]
async fn fill_missing_twice_matches_once() {
    let mut rng = StdRng::seed_from_u64(99);
    let origins: Vec<Place> = (0..20).map(|_| random_place(&mut rng)).collect();
    let destinations: Vec<Place> = (0..5).map(|_| random_place(&mut rng)).collect();
    let provider = DefaultCostMatrixProvider::new(Arc::new(Taxicab::new()));

    let mut once = CostMatrix::new();
    provider.fill_missing(&origins, &destinations, &mut once).await.unwrap();

    let mut twice = CostMatrix::new();
    provider.fill_missing(&origins, &destinations, &mut twice).await.unwrap();
    let added = provider.fill_missing(&origins, &destinations, &mut twice).await.unwrap();

    assert_eq!(added, 0);
    assert_eq!(once.len(), twice.len());
    for (origin, destination, cost) in once.iter() {
        assert_eq!(twice.get(&origin, &destination), Some(cost));
    }
}

#[test]
fn two_of_them_averages_two_lowest() {
    assert_eq!(Aggregation::TwoOfThem.aggregate(&[5.0, 3.0, 9.0]).unwrap(), 4.0);
    assert_eq!(Aggregation::TwoOfThem.aggregate(&[7.0]).unwrap(), 7.0);
}

#[test]
fn box_grid_partitions_exactly() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..50 {
        let min_lat = rng.random_range(-85.0..80.0);
        let min_long = rng.random_range(-175.0..170.0);
        let max_lat = min_lat + rng.random_range(0.001..5.0);
        let max_long = min_long + rng.random_range(0.001..10.0);
        let bbox = BoundingBox::new(Place::new(min_lat, min_long).unwrap(), Place::new(max_lat, max_long).unwrap())
            .unwrap();
        let rows = rng.random_range(1..=6);
        let cols = rng.random_range(1..=6);

        let grid = bbox.box_grid(rows, cols).unwrap();
        assert_eq!(grid.len(), rows * cols);
        assert_eq!(grid[0].min(), bbox.min());
        assert_eq!(grid[rows * cols - 1].max(), bbox.max());

        for i in 0..rows {
            for j in 0..cols {
                let cell = &grid[i * cols + j];
                if j + 1 < cols {
                    let east = &grid[i * cols + j + 1];
                    assert_eq!(cell.max().long(), east.min().long());
                    assert_eq!(cell.min().lat(), east.min().lat());
                    assert_eq!(cell.max().lat(), east.max().lat());
                } else {
                    assert_eq!(cell.max().long(), bbox.max().long());
                }
                if i + 1 < rows {
                    let north = &grid[(i + 1) * cols + j];
                    assert_eq!(cell.max().lat(), north.min().lat());
                    assert_eq!(cell.min().long(), north.min().long());
                } else {
                    assert_eq!(cell.max().lat(), bbox.max().lat());
                }
                if i == 0 {
                    assert_eq!(cell.min().lat(), bbox.min().lat());
                }
                if j == 0 {
                    assert_eq!(cell.min().long(), bbox.min().long());
                }
            }
        }
    }
}

/// Whether `p` lies on the segment `a`-`b`
fn on_edge(p: Place, a: Place, b: Place) -> bool {
    const EPS: f64 = 1e-12;
    let (dlat, dlong) = (b.lat() - a.lat(), b.long() - a.long());
    let t = if dlat.abs() > dlong.abs() { (p.lat() - a.lat()) / dlat } else { (p.long() - a.long()) / dlong };
    (-EPS..=1.0 + EPS).contains(&t)
        && (a.lat() + t * dlat - p.lat()).abs() < EPS
        && (a.long() + t * dlong - p.long()).abs() < EPS
}

#[test]
fn line_through_points_lie_on_separating_edges() {
    let bbox = BoundingBox::new(Place::new(10.0, 20.0).unwrap(), Place::new(10.5, 21.0).unwrap()).unwrap();
    let corners = bbox.corners();
    let drawer = LineDrawer::new();
    let discretizer = Discretizer::linear(1.0, 0.0).unwrap();
    let mut rng = StdRng::seed_from_u64(5);

    // Corner bands in [SW, SE, NE, NW] order, with the edges separating 1s from 2s
    let layouts: [([f64; 4], [(usize, usize); 2]); 2] = [
        ([1.0, 1.0, 2.0, 2.0], [(0, 3), (1, 2)]),
        ([1.0, 2.0, 2.0, 1.0], [(0, 1), (3, 2)]),
    ];
    for (bands, edges) in layouts {
        for _ in 0..20 {
            let costs = bands.map(|band| band - rng.random_range(0.05..0.95));
            let cell = CellSample {
                corners,
                costs,
                bands: costs.map(|cost| discretizer.discretize(cost)),
                center_cost: None,
            };
            assert_eq!(cell.bands, bands);

            let contours = drawer.find_lines(&cell).unwrap();
            assert_eq!(contours.segments.len(), 1);
            let segment = contours.segments[0];
            assert_eq!(segment.band, 1.0);

            let [(a1, b1), (a2, b2)] = edges;
            let from_first = on_edge(segment.from, corners[a1], corners[b1]) && on_edge(segment.to, corners[a2], corners[b2]);
            let to_first = on_edge(segment.to, corners[a1], corners[b1]) && on_edge(segment.from, corners[a2], corners[b2]);
            assert!(from_first || to_first, "{segment:?} is not on the separating edges");
        }
    }
}
