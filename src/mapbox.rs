/// Base URL for Mapbox static style images.
const BASE_URL: &str = "https://api.mapbox.com/styles/v1/mapbox";

const DEFAULT_STYLE: &str = "satellite-v9";
const DEFAULT_ZOOM: u8 = 17;
const DEFAULT_IMAGE_SIZE: &str = "400x400";

/// Fixed parameters for the Mapbox Static Images API.
///
/// The URL pattern is `{base}/{style}/static/{lon},{lat},{zoom}/{size}`,
/// with longitude before latitude.
#[derive(Debug, Clone)]
pub struct MapboxStatic {
    access_token: String,
    style: String,
    zoom: u8,
    size: String,
}

impl MapboxStatic {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            style: DEFAULT_STYLE.to_string(),
            zoom: DEFAULT_ZOOM,
            size: DEFAULT_IMAGE_SIZE.to_string(),
        }
    }

    /// Builds the image URL for the given WGS84 coordinates.
    ///
    /// Pure string formatting. Coordinates are not validated; out-of-range
    /// values produce a well-formed URL the API will reject.
    pub fn image_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}/{}/static/{},{},{}/{}?access_token={}",
            BASE_URL, self.style, lon, lat, self.zoom, self.size, self.access_token
        )
    }
}
