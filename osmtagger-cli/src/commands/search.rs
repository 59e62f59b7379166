//! Overpass tag search command.

use console::style;
use osmtagger::config::ConfigFile;
use osmtagger::coord::GeoPoint;
use osmtagger::remote::{OverpassQuery, SearchArea, TagFilter};

use super::common::{format_tags, start_app};
use crate::error::CliError;

/// Where the search runs, as given on the command line.
pub struct SearchScope {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub half_extent: f64,
    pub area: Option<String>,
}

/// Find features carrying a tag and list them.
pub fn run(filter: &str, scope: SearchScope) -> Result<(), CliError> {
    let query = build_query(filter, scope)?;

    let config = ConfigFile::load()?;
    let app = start_app(&config)?;

    println!("Searching {} for {}...", app.overpass().url(), query.filter);
    let results = app.runtime_handle().block_on(app.search(&query))?;

    if results.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    println!("{} ({})", style("Matches").bold(), results.len());
    for object in &results {
        println!(
            "  {} {}: {}",
            object.object_type(),
            object.id,
            format_tags(&object.tags)
        );
    }
    Ok(())
}

fn build_query(filter: &str, scope: SearchScope) -> Result<OverpassQuery, CliError> {
    let input = |e: osmtagger::remote::QueryError| CliError::Input(e.to_string());
    let filter: TagFilter = filter.parse().map_err(input)?;

    let area = match (scope.area, scope.lat, scope.lon) {
        (Some(name), None, None) => SearchArea::named(&name).map_err(input)?,
        (None, Some(lat), Some(lon)) => {
            let center = GeoPoint::checked(lat, lon).map_err(|e| CliError::Input(e.to_string()))?;
            SearchArea::around(center, scope.half_extent).map_err(input)?
        }
        _ => {
            return Err(CliError::Input(
                "Give either --area or both --lat and --lon".to_string(),
            ))
        }
    };
    Ok(OverpassQuery::new(filter, area))
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmtagger::remote::DEFAULT_SEARCH_HALF_EXTENT;

    fn scope(lat: Option<f64>, lon: Option<f64>, area: Option<&str>) -> SearchScope {
        SearchScope {
            lat,
            lon,
            half_extent: DEFAULT_SEARCH_HALF_EXTENT,
            area: area.map(str::to_string),
        }
    }

    #[test]
    fn test_build_query_around_point() {
        let query = build_query("amenity=cafe", scope(Some(50.0), Some(7.0), None)).unwrap();
        assert!(matches!(query.area, SearchArea::Bbox(_)));
        assert_eq!(query.filter, TagFilter::KeyValue("amenity".into(), "cafe".into()));
    }

    #[test]
    fn test_build_query_named_area() {
        let query = build_query("shop", scope(None, None, Some("Köln"))).unwrap();
        assert_eq!(query.area, SearchArea::Named("Köln".into()));
    }

    #[test]
    fn test_build_query_needs_one_scope() {
        assert!(matches!(
            build_query("shop", scope(None, None, None)),
            Err(CliError::Input(_))
        ));
        assert!(matches!(
            build_query("shop", scope(Some(1.0), Some(1.0), Some("Köln"))),
            Err(CliError::Input(_))
        ));
        assert!(matches!(
            build_query("=x", scope(Some(1.0), Some(1.0), None)),
            Err(CliError::Input(_))
        ));
    }
}
