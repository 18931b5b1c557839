/// Position on the ellipsoid in degrees and meters above it.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Cartographic {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub height_m: f64,
}

impl Cartographic {
    pub fn new(lon_deg: f64, lat_deg: f64, height_m: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            height_m,
        }
    }

    /// `[lon, lat, height]`, the CZML `cartographicDegrees` order.
    pub fn to_array(self) -> [f64; 3] {
        [self.lon_deg, self.lat_deg, self.height_m]
    }

    pub fn is_valid(&self) -> bool {
        self.lon_deg.is_finite()
            && self.height_m.is_finite()
            && (-90.0..=90.0).contains(&self.lat_deg)
    }
}
