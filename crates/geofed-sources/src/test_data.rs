//! Small, deterministic sample datasets.
//!
//! Used by the unit and integration tests of both workspace crates and by the
//! demo in `crates/geofed/examples`.

use serde_json::json;

use crate::{Feature, Geometry, MemoryFetcher, Source, SourceRegistry};

pub fn addresses_source() -> Source {
    Source::new("addresses", "Addresses")
        .with_search_fields(["street", "number", "city"])
        .with_display_fields(["street", "number", "city"])
        .with_short_display_fields(["street", "number"])
}

pub fn parks_source() -> Source {
    Source::new("parks", "Parks")
        .with_search_fields(["name", "district"])
        .with_display_fields(["name"])
        .with_secondary_label_fields(["district"])
}

pub fn schools_source() -> Source {
    Source::new("schools", "Schools")
        .with_search_fields(["name", "aliases"])
        .with_display_fields(["\"School\"", "name"])
}

pub fn sample_sources() -> Vec<Source> {
    vec![addresses_source(), parks_source(), schools_source()]
}

pub fn sample_registry() -> SourceRegistry {
    SourceRegistry::new(sample_sources()).expect("sample sources are valid")
}

pub fn sample_addresses() -> Vec<Feature> {
    [
        ("Main Street", 9, [2.0, 2.0]),
        ("Main Street", 10, [2.5, 2.0]),
        ("Main Street", 1, [3.0, 2.0]),
        ("Elm Road", 4, [12.0, 12.0]),
        ("Market Square", 2, [4.0, 4.0]),
    ]
    .into_iter()
    .enumerate()
    .map(|(idx, (street, number, point))| {
        Feature::from_json(json!({"street": street, "number": number, "city": "Springfield"}))
            .with_id(format!("addresses.{idx}"))
            .with_geometry(Geometry::Point(point))
    })
    .collect()
}

pub fn sample_parks() -> Vec<Feature> {
    vec![
        Feature::from_json(json!({"name": "Central Park", "district": "Manhattan"}))
            .with_id("parks.0")
            .with_geometry(Geometry::Polygon(vec![vec![
                [1.0, 1.0],
                [3.0, 1.0],
                [3.0, 3.0],
                [1.0, 3.0],
                [1.0, 1.0],
            ]])),
        Feature::from_json(json!({"name": "Riverside Gardens", "district": null}))
            .with_id("parks.1")
            .with_geometry(Geometry::Point([20.0, 20.0])),
    ]
}

pub fn sample_schools() -> Vec<Feature> {
    vec![
        Feature::from_json(json!({"name": "Maple Elementary", "aliases": ["Maple", "ME, North"]}))
            .with_id("schools.0")
            .with_geometry(Geometry::Point([2.2, 2.2])),
        // No geometry: still searchable, never highlighted.
        Feature::from_json(json!({"name": "Main Street Academy"})).with_id("schools.1"),
    ]
}

pub fn sample_fetcher() -> MemoryFetcher {
    MemoryFetcher::new()
        .with_dataset("addresses", sample_addresses())
        .with_dataset("parks", sample_parks())
        .with_dataset("schools", sample_schools())
}
