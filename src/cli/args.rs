//! Parsing of coordinate arguments

use isocost::{BoundingBox, Error, Place, Result};

fn parse_numbers<const N: usize>(text: &str, what: &str) -> Result<[f64; N]> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(Error::ParseError(format!(
            "expected {N} comma-separated numbers for {what}, got '{text}'"
        )));
    }
    let mut values = [0.0; N];
    for (value, part) in values.iter_mut().zip(parts) {
        *value = part
            .parse()
            .map_err(|_| Error::ParseError(format!("'{part}' is not a number in {what} '{text}'")))?;
    }
    Ok(values)
}

/// Parse `lat,long`
pub fn parse_place(text: &str) -> Result<Place> {
    let [lat, long] = parse_numbers::<2>(text, "a place")?;
    Place::new(lat, long)
}

/// Parse `min_lat,min_long,max_lat,max_long`
pub fn parse_bbox(text: &str) -> Result<BoundingBox> {
    let [min_lat, min_long, max_lat, max_long] = parse_numbers::<4>(text, "a bounding box")?;
    BoundingBox::new(Place::new(min_lat, min_long)?, Place::new(max_lat, max_long)?)
}
