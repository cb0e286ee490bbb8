use serde::{Deserialize, Serialize};

/// User-configured rectangle of interest, given by its upper-left and
/// lower-right corners in lon/lat degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialWindow {
    pub ulx: f64,
    pub uly: f64,
    pub lrx: f64,
    pub lry: f64,
}

impl SpatialWindow {
    pub fn new(ulx: f64, uly: f64, lrx: f64, lry: f64) -> Self {
        Self { ulx, uly, lrx, lry }
    }

    pub fn upper_left(&self) -> (f64, f64) {
        (self.ulx, self.uly)
    }

    pub fn lower_right(&self) -> (f64, f64) {
        (self.lrx, self.lry)
    }

    /// The window normalized to `(min, max)` on both axes.
    pub fn bounds(&self) -> RasterExtent {
        RasterExtent {
            min_x: self.ulx.min(self.lrx),
            min_y: self.uly.min(self.lry),
            max_x: self.ulx.max(self.lrx),
            max_y: self.uly.max(self.lry),
        }
    }

    /// Intersect with a file's extent. `None` means the two do not overlap,
    /// which excludes the file rather than failing it.
    pub fn clip(&self, extent: &RasterExtent) -> Option<ClippedWindow> {
        let window = self.bounds();
        let clipped = ClippedWindow {
            lower_left_x: window.min_x.max(extent.min_x),
            lower_left_y: window.min_y.max(extent.min_y),
            upper_right_x: window.max_x.min(extent.max_x),
            upper_right_y: window.max_y.min(extent.max_y),
        };
        clipped.is_valid().then_some(clipped)
    }
}

/// Coverage actually present in one input file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterExtent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl RasterExtent {
    /// Bounding box of a coordinate ring; non-finite vertices are ignored.
    pub fn from_ring(ring: &[[f64; 2]]) -> Option<Self> {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

        for &[x, y] in ring {
            if x.is_finite() && y.is_finite() {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }

        min_x.is_finite().then_some(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

/// Intersection of a [`SpatialWindow`] with a [`RasterExtent`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedWindow {
    pub lower_left_x: f64,
    pub lower_left_y: f64,
    pub upper_right_x: f64,
    pub upper_right_y: f64,
}

impl ClippedWindow {
    pub fn is_valid(&self) -> bool {
        self.lower_left_x < self.upper_right_x && self.lower_left_y < self.upper_right_y
    }

    /// `xmin ymin xmax ymax`, the order `gdalwarp -te` expects.
    pub fn te_args(&self) -> [String; 4] {
        [
            self.lower_left_x.to_string(),
            self.lower_left_y.to_string(),
            self.upper_right_x.to_string(),
            self.upper_right_y.to_string(),
        ]
    }
}
