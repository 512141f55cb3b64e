//! Earth Engine expression graphs.
//!
//! The REST `value:compute` endpoint takes a serialized expression: a map
//! of named value nodes plus the key of the result node. Function bodies
//! (for `Collection.map`) must live in that map and be referenced by key.

use crate::imagery::RegionQuery;
use crate::models::BoundingBox;
use serde_json::{json, Map, Value};

/// Name of the single argument of the per-image mapping function.
const MAPPING_VAR: &str = "_MAPPING_VAR_0_0";

/// Image property holding the acquisition timestamp.
const TIME_START_PROPERTY: &str = "system:time_start";

/// Key of the result node.
const RESULT_KEY: &str = "0";

/// Key of the mapping function body.
const MAP_BODY_KEY: &str = "1";

fn constant(value: impl Into<Value>) -> Value {
    json!({ "constantValue": value.into() })
}

fn invoke(function: &str, arguments: Value) -> Value {
    json!({
        "functionInvocationValue": {
            "functionName": function,
            "arguments": arguments,
        }
    })
}

fn argument(name: &str) -> Value {
    json!({ "argumentReference": name })
}

/// `ee.Geometry.BBox(west, south, east, north)`.
pub fn bbox_geometry(bbox: &BoundingBox) -> Value {
    invoke(
        "GeometryConstructors.BBox",
        json!({
            "west": constant(bbox.min_lon),
            "south": constant(bbox.min_lat),
            "east": constant(bbox.max_lon),
            "north": constant(bbox.max_lat),
        }),
    )
}

/// Images acquired in `[start-01, end-01)`.
fn date_filter(query: &RegionQuery) -> Value {
    invoke(
        "Filter.dateRangeContains",
        json!({
            "leftValue": invoke(
                "DateRange",
                json!({
                    "start": constant(query.start.first_day()),
                    "end": constant(query.end.first_day()),
                }),
            ),
            "rightField": constant(TIME_START_PROPERTY),
        }),
    )
}

/// Images whose footprint intersects the query box.
fn bounds_filter(query: &RegionQuery) -> Value {
    invoke(
        "Filter.intersects",
        json!({
            "leftField": constant(".all"),
            "rightValue": bbox_geometry(&query.bbox),
        }),
    )
}

/// Body of the per-image function: sum the band over the box and store
/// the result as an image property named after the band.
fn region_sum_body(query: &RegionQuery) -> Value {
    let image = argument(MAPPING_VAR);
    let selected = invoke(
        "Image.select",
        json!({
            "input": image.clone(),
            "bandSelectors": constant(vec![query.band.clone()]),
        }),
    );
    let reduced = invoke(
        "Image.reduceRegion",
        json!({
            "image": selected,
            "reducer": invoke("Reducer.sum", json!({})),
            "geometry": bbox_geometry(&query.bbox),
        }),
    );

    invoke(
        "Element.setMulti",
        json!({
            "object": image,
            "properties": reduced,
        }),
    )
}

/// Build the expression returning the array of per-image region sums.
pub fn region_sum_expression(query: &RegionQuery) -> Value {
    let collection = invoke(
        "ImageCollection.load",
        json!({ "id": constant(query.collection.clone()) }),
    );
    let dated = invoke(
        "Collection.filter",
        json!({ "collection": collection, "filter": date_filter(query) }),
    );
    let bounded = invoke(
        "Collection.filter",
        json!({ "collection": dated, "filter": bounds_filter(query) }),
    );
    let mapped = invoke(
        "Collection.map",
        json!({
            "collection": bounded,
            "baseAlgorithm": {
                "functionDefinitionValue": {
                    "argumentNames": [MAPPING_VAR],
                    "body": MAP_BODY_KEY,
                }
            },
        }),
    );
    let aggregated = invoke(
        "AggregateFeatureCollection.array",
        json!({
            "collection": mapped,
            "property": constant(query.band.clone()),
        }),
    );

    let mut values = Map::new();
    values.insert(RESULT_KEY.to_string(), aggregated);
    values.insert(MAP_BODY_KEY.to_string(), region_sum_body(query));

    json!({
        "result": RESULT_KEY,
        "values": values,
    })
}

/// Returns the top-level result node of an expression.
pub fn result_node(expression: &Value) -> &Value {
    let key = expression["result"].as_str().unwrap_or(RESULT_KEY);
    &expression["values"][key]
}
