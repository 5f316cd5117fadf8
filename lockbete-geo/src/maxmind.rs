//! MaxMind City database backend.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

use maxminddb::{geoip2, MaxMindDBError, Reader};
use tracing::info;

use lockbete_core::events::GeoAnnotation;

use crate::{GeoBackend, GeoError};

/// Reader over an on-disk `GeoLite2-City.mmdb` (or compatible) database.
pub struct MaxmindBackend {
    reader: Reader<Vec<u8>>,
}

impl MaxmindBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GeoError> {
        let reader = Reader::open_readfile(path.as_ref()).map_err(GeoError::Open)?;
        info!(path = %path.as_ref().display(), "loaded geo database");
        Ok(Self { reader })
    }
}

fn english_name(names: Option<BTreeMap<&str, &str>>) -> Option<String> {
    names.and_then(|n| n.get("en").map(|s| s.to_string()))
}

impl GeoBackend for MaxmindBackend {
    fn query(&self, ip: IpAddr) -> Result<Option<GeoAnnotation>, GeoError> {
        let city: geoip2::City = match self.reader.lookup(ip) {
            Ok(city) => city,
            // Not an error: the database simply has no record for this IP.
            Err(MaxMindDBError::AddressNotFoundError(_)) => return Ok(None),
            Err(err) => return Err(GeoError::Lookup(err)),
        };

        let location = match city.location {
            Some(location) => location,
            None => return Ok(None),
        };
        let (lat, lon) = match (location.latitude, location.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Ok(None),
        };

        Ok(Some(GeoAnnotation {
            lat,
            lon,
            country: city.country.and_then(|c| english_name(c.names)),
            region: city
                .subdivisions
                .and_then(|s| s.into_iter().next())
                .and_then(|s| english_name(s.names)),
            city: city.city.and_then(|c| english_name(c.names)),
        }))
    }
}
