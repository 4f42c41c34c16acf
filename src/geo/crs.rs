use crate::foundation::error::{MapflowError, MapflowResult};

/// EPSG code of WGS84 longitude/latitude.
pub const EPSG_WGS84: u32 = 4326;
/// EPSG code of spherical (web) Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// Half the circumference of the web-Mercator sphere, in meters.
pub const WEB_MERCATOR_HALF_WORLD: f64 = 20_037_508.342_789_244;

/// Coordinate reference system identifier.
///
/// Two values are the same CRS exactly when they compare equal; no attempt is made to detect
/// equivalent definitions spelled differently.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Authority code from the EPSG registry.
    Epsg(u32),
    /// Raw proj4 definition string.
    Proj4(String),
}

impl Crs {
    /// WGS84 longitude/latitude in degrees.
    pub fn wgs84() -> Self {
        Self::Epsg(EPSG_WGS84)
    }

    /// Spherical Mercator in meters.
    pub fn web_mercator() -> Self {
        Self::Epsg(EPSG_WEB_MERCATOR)
    }

    /// proj4 definition for this CRS, when known.
    pub fn proj_string(&self) -> Option<&str> {
        match self {
            Self::Epsg(code) => epsg_proj_string(*code),
            Self::Proj4(s) => Some(s.as_str()),
        }
    }

    /// `true` when coordinates are angular (degrees on input/output).
    pub fn is_geographic(&self) -> bool {
        match self {
            Self::Epsg(code) => matches!(*code, 4326 | 4269 | 4258),
            Self::Proj4(s) => s.contains("+proj=longlat") || s.contains("+proj=latlong"),
        }
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Epsg(code) => write!(f, "EPSG:{code}"),
            Self::Proj4(s) => f.write_str(s),
        }
    }
}

impl std::str::FromStr for Crs {
    type Err = MapflowError;

    fn from_str(s: &str) -> MapflowResult<Self> {
        let s = s.trim();
        if s.starts_with('+') {
            return Ok(Self::Proj4(s.to_string()));
        }
        let code = s
            .strip_prefix("EPSG:")
            .or_else(|| s.strip_prefix("epsg:"))
            .unwrap_or(s);
        code.parse::<u32>()
            .map(Self::Epsg)
            .map_err(|_| MapflowError::validation(format!("unrecognized CRS '{s}'")))
    }
}

impl serde::Serialize for Crs {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Crs {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(u32),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(code) => Ok(Self::Epsg(code)),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

fn epsg_proj_string(code: u32) -> Option<&'static str> {
    Some(match code {
        4326 => "+proj=longlat +datum=WGS84 +no_defs",
        4269 => "+proj=longlat +datum=NAD83 +no_defs",
        4258 => "+proj=longlat +ellps=GRS80 +no_defs",
        3857 | 900913 => {
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs"
        }
        3395 => "+proj=merc +lon_0=0 +k=1 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs",
        3413 => {
            "+proj=stere +lat_0=90 +lat_ts=70 +lon_0=-45 +k=1 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs"
        }
        3031 => {
            "+proj=stere +lat_0=-90 +lat_ts=-71 +lon_0=0 +k=1 +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs"
        }
        32601..=32660 => return utm_north(code - 32600),
        32701..=32760 => return utm_south(code - 32700),
        _ => return None,
    })
}

fn utm_north(zone: u32) -> Option<&'static str> {
    UTM_NORTH.get(zone as usize - 1).copied()
}

fn utm_south(zone: u32) -> Option<&'static str> {
    UTM_SOUTH.get(zone as usize - 1).copied()
}

macro_rules! utm_table {
    ($name:ident, $extra:literal; $($zone:literal),*) => {
        static $name: &[&str] = &[
            $(concat!("+proj=utm +zone=", $zone, $extra, " +datum=WGS84 +units=m +no_defs")),*
        ];
    };
}

utm_table!(UTM_NORTH, ""; 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20,
    21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44,
    45, 46, 47, 48, 49, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60);
utm_table!(UTM_SOUTH, " +south"; 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19,
    20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43,
    44, 45, 46, 47, 48, 49, 50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60);

#[cfg(test)]
#[path = "../../tests/unit/geo/crs.rs"]
mod tests;
