use crate::C;
use geo::{
    geometry::{Coord, Polygon},
    polygon,
};

/// Georeferencing for a granule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Northwest corner of the northwest most pixel.
    pub nw_corner: Coord<C>,

    /// Degrees per pixel, both axes.
    pub pixel_deg: C,

    /// Number of (columns, rows).
    pub dimensions: (usize, usize),
}

impl Footprint {
    /// Returns the footprint of a one degree square tile whose
    /// southwest corner is `sw_corner`, with `side` pixels per edge.
    pub fn tile(sw_corner: Coord<i16>, side: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let pixel_deg = 1.0 / side as C;
        Self {
            nw_corner: Coord {
                x: C::from(sw_corner.x),
                y: C::from(sw_corner.y) + 1.0,
            },
            pixel_deg,
            dimensions: (side, side),
        }
    }

    /// Returns the number of pixels covered.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.dimensions.0 * self.dimensions.1
    }

    /// Returns the center of the pixel at linear `index`.
    pub fn pixel_center(&self, index: usize) -> Coord<C> {
        let (cols, _) = self.dimensions;
        let (x, y) = (index % cols, index / cols);
        #[allow(clippy::cast_precision_loss)]
        Coord {
            x: self.nw_corner.x + (x as C + 0.5) * self.pixel_deg,
            y: self.nw_corner.y - (y as C + 0.5) * self.pixel_deg,
        }
    }

    /// Returns the outline of the pixel at linear `index`.
    pub fn pixel_polygon(&self, index: usize) -> Polygon<C> {
        square(&self.pixel_center(index), self.pixel_deg / 2.0)
    }

    /// Returns the outline of the whole footprint.
    pub fn polygon(&self) -> Polygon<C> {
        #[allow(clippy::cast_precision_loss)]
        let (width, height) = (
            self.dimensions.0 as C * self.pixel_deg,
            self.dimensions.1 as C * self.pixel_deg,
        );
        let w = self.nw_corner.x;
        let n = self.nw_corner.y;
        let e = w + width;
        let s = n - height;
        polygon![
            (x: w, y: s),
            (x: e, y: s),
            (x: e, y: n),
            (x: w, y: n),
            (x: w, y: s),
        ]
    }
}

fn square(center: &Coord<C>, half: C) -> Polygon<C> {
    let n = center.y + half;
    let e = center.x + half;
    let s = center.y - half;
    let w = center.x - half;
    polygon![
        (x: w, y: s),
        (x: e, y: s),
        (x: e, y: n),
        (x: w, y: n),
        (x: w, y: s),
    ]
}

/// Parses a tile name such as `N44W072` into its southwest corner.
pub fn parse_tile(name: &str) -> Option<Coord<i16>> {
    if name.len() != 7 || !name.is_ascii() {
        return None;
    }
    let lat_sign = match &name[0..1] {
        "N" => 1,
        "S" => -1,
        _ => return None,
    };
    let lat = lat_sign * name[1..3].parse::<i16>().ok()?;
    let lon_sign = match &name[3..4] {
        "E" => 1,
        "W" => -1,
        _ => return None,
    };
    let lon = lon_sign * name[4..7].parse::<i16>().ok()?;
    Some(Coord { x: lon, y: lat })
}

/// Returns the tile name for a southwest corner.
pub fn tile_name(Coord { x, y }: Coord<i16>) -> String {
    let n_s = if y.is_negative() { 'S' } else { 'N' };
    let e_w = if x.is_negative() { 'W' } else { 'E' };
    format!("{n_s}{:02}{e_w}{:03}", y.abs(), x.abs())
}
