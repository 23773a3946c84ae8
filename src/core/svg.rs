//! Standalone SVG output
//!
//! Longitude maps to x and latitude to -y, so north is up. Elements are kept
//! in four groups (markers, lines, flat cells, fine cells) and serialized on
//! demand.

use std::fmt::Write as _;
use std::io::Write;

use crate::core::bbox::BoundingBox;
use crate::core::destination::WeightedPlace;
use crate::core::error::Result;
use crate::core::place::Place;
use crate::core::sink::RenderSink;

/// Fraction of the view extent used as line width
const LINE_WIDTH_RATIO: f64 = 1.0 / 600.0;
/// Fraction of the view extent used as marker radius
const MARKER_RADIUS_RATIO: f64 = 1.0 / 150.0;

/// A [`RenderSink`] building an SVG document in memory
#[derive(Debug, Clone)]
pub struct SvgSink {
    view: BoundingBox,
    markers: Vec<String>,
    lines: Vec<String>,
    flat_cells: Vec<String>,
    fine_cells: Vec<String>,
}

impl SvgSink {
    pub fn new(view: BoundingBox) -> Self {
        Self {
            view,
            markers: Vec::new(),
            lines: Vec::new(),
            flat_cells: Vec::new(),
            fine_cells: Vec::new(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn extent(&self) -> f64 {
        let extent = self.view.size_lat().max(self.view.size_long());
        if extent > 0.0 {
            extent
        } else {
            1.0
        }
    }

    fn rect(bbox: &BoundingBox, fill: &str, title: Option<String>) -> String {
        let mut rect = format!(
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{fill}" opacity="0.3""#,
            bbox.min().long(),
            -bbox.max().lat(),
            bbox.size_long(),
            bbox.size_lat(),
        );
        match title {
            Some(title) => {
                let _ = write!(rect, "><title>{title}</title></rect>");
            }
            None => rect.push_str("/>"),
        }
        rect
    }

    /// The complete document
    pub fn to_svg(&self) -> String {
        let extent = self.extent();
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
            self.view.min().long(),
            -self.view.max().lat(),
            self.view.size_long(),
            self.view.size_lat(),
        );
        let groups = [
            ("flat-cells", &self.flat_cells, String::new()),
            ("fine-cells", &self.fine_cells, String::new()),
            (
                "lines",
                &self.lines,
                format!(
                    r#" stroke="black" stroke-width="{}" stroke-linecap="round""#,
                    extent * LINE_WIDTH_RATIO
                ),
            ),
            ("markers", &self.markers, r#" fill="red""#.to_string()),
        ];
        for (id, elements, attributes) in groups {
            let _ = writeln!(svg, r#"  <g id="{id}"{attributes}>"#);
            for element in elements {
                let _ = writeln!(svg, "    {element}");
            }
            let _ = writeln!(svg, "  </g>");
        }
        svg.push_str("</svg>\n");
        svg
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(self.to_svg().as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl RenderSink for SvgSink {
    fn add_marker(&mut self, place: &WeightedPlace) {
        let radius = self.extent() * MARKER_RADIUS_RATIO;
        self.markers.push(format!(
            r#"<circle cx="{}" cy="{}" r="{radius}"><title>{} ({})</title></circle>"#,
            place.place().long(),
            -place.place().lat(),
            escape(place.name()),
            place.weight(),
        ));
    }

    fn add_line(&mut self, from: &Place, to: &Place, band: f64) {
        self.lines.push(format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" data-band="{band}"/>"#,
            from.long(),
            -from.lat(),
            to.long(),
            -to.lat(),
        ));
    }

    fn clear_lines(&mut self) {
        self.lines.clear();
        self.flat_cells.clear();
        self.fine_cells.clear();
    }

    fn draw_flat_cell(&mut self, bbox: &BoundingBox, cost: f64) {
        self.flat_cells.push(Self::rect(bbox, "red", Some(format!("{cost}"))));
    }

    fn draw_fine_cell(&mut self, bbox: &BoundingBox) {
        self.fine_cells.push(Self::rect(bbox, "black", None));
    }

    fn view_boxes(&self) -> Vec<BoundingBox> {
        vec![self.view.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> BoundingBox {
        BoundingBox::new(Place::new(10.0, 20.0).unwrap(), Place::new(12.0, 24.0).unwrap()).unwrap()
    }

    #[test]
    fn test_svg_flips_latitude() {
        let mut sink = SvgSink::new(view());
        sink.add_line(&Place::new(11.0, 21.0).unwrap(), &Place::new(11.5, 22.0).unwrap(), 3.0);
        let svg = sink.to_svg();
        assert!(svg.contains(r#"viewBox="20 -12 4 2""#));
        assert!(svg.contains(r#"<line x1="21" y1="-11" x2="22" y2="-11.5" data-band="3"/>"#));
    }

    #[test]
    fn test_marker_name_is_escaped() {
        let mut sink = SvgSink::new(view());
        let place = WeightedPlace::new(Place::new(11.0, 21.0).unwrap(), 2.0, "<Fish & Chips>").unwrap();
        sink.add_marker(&place);
        assert!(sink.to_svg().contains("&lt;Fish &amp; Chips&gt; (2)"));
    }

    #[test]
    fn test_clear_lines_keeps_markers() {
        let mut sink = SvgSink::new(view());
        let p = Place::new(11.0, 21.0).unwrap();
        sink.add_marker(&WeightedPlace::new(p, 1.0, "a").unwrap());
        sink.add_line(&p, &p, 1.0);
        sink.draw_flat_cell(&view(), 0.5);
        sink.draw_fine_cell(&view());
        sink.clear_lines();
        assert_eq!(sink.line_count(), 0);
        let svg = sink.to_svg();
        assert!(svg.contains("<circle"));
        assert!(!svg.contains("<rect"));
    }

    #[test]
    fn test_write_to() {
        let mut out = Vec::new();
        SvgSink::new(view()).write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("<svg"));
        assert!(text.trim_end().ends_with("</svg>"));
    }
}
