use anyhow::Result;
use brickgraph::timeseries::{
    episodes, parse_interval, parse_timestamp, simultaneous_heating_cooling, stuck_damper,
    TimeSeries, TimeseriesStore,
};
use brickgraph::BrickGraph;
use tempdir::TempDir;

fn store() -> TimeseriesStore {
    TimeseriesStore::new("tests/data/timeseries")
}

/// Looks up the uuid of the single point of `class` attached to `equipment`.
fn point_uuid(graph: &BrickGraph, equipment: &str, class: &str) -> Result<String> {
    let query = format!(
        "SELECT ?uuid WHERE {{ {} bf:hasPoint ?p . ?p rdf:type {} . ?p bf:uuid ?uuid }}",
        equipment, class
    );
    let table = graph.query(&query, false)?;
    assert_eq!(table.len(), 1, "{}", query);
    Ok(table.rows()[0]
        .require("uuid")?
        .as_literal()
        .expect("uuid is a literal")
        .to_string())
}

#[test]
fn test_load_from_store() -> Result<()> {
    let store = store();
    let id = "3f1e6c1a-0b7c-4e55-9d0e-7a3a2c0f5a11";
    assert!(store.contains(id));
    let series = store.load(id)?;
    assert_eq!(series.name(), id);
    assert_eq!(series.len(), 12);

    // the trailing row without a value is skipped
    let cooling = store.load("9a4c3b1d-7e6f-4a2b-b8d9-3f5e1c7a2d44")?;
    assert_eq!(cooling.len(), 12);

    assert!(store.load("00000000-0000-0000-0000-000000000000").is_err());
    Ok(())
}

#[test]
fn test_stuck_damper_from_graph() -> Result<()> {
    let graph = BrickGraph::load("tests/data/building.ttl")?;
    let store = store();
    let position = store.load(&point_uuid(&graph, "ex:VAV1", "brick:Damper_Position_Sensor")?)?;
    let command = store.load(&point_uuid(&graph, "ex:VAV1", "brick:Damper_Position_Command")?)?;
    let interval = parse_interval("15min")?;

    let flagged = stuck_damper(&position, &command, interval, 10.0)?;
    assert_eq!(flagged.len(), 2);
    assert_eq!(flagged[0].first, 20.0);
    assert_eq!(flagged[0].second, 80.0);

    let found = episodes(&flagged, interval);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].start, parse_timestamp("2018-01-01 00:30:00").unwrap());
    assert_eq!(found[0].end, parse_timestamp("2018-01-01 01:00:00").unwrap());
    assert_eq!(found[0].buckets, 2);
    Ok(())
}

#[test]
fn test_simultaneous_heating_cooling_from_graph() -> Result<()> {
    let graph = BrickGraph::load("tests/data/building.ttl")?;
    let store = store();
    let heating = store.load(&point_uuid(&graph, "ex:AHU1", "brick:Heating_Valve_Command")?)?;
    let cooling = store.load(&point_uuid(&graph, "ex:AHU1", "brick:Cooling_Valve_Command")?)?;
    let interval = parse_interval("15min")?;

    let flagged = simultaneous_heating_cooling(&heating, &cooling, interval, 5.0)?;
    assert_eq!(flagged.len(), 1);
    assert_eq!(
        flagged[0].timestamp,
        parse_timestamp("2018-01-01 00:15:00").unwrap()
    );
    assert_eq!(flagged[0].first, 50.0);
    assert_eq!(flagged[0].second, 20.0);

    // a higher threshold clears the overlap
    assert!(simultaneous_heating_cooling(&heating, &cooling, interval, 25.0)?.is_empty());
    Ok(())
}

#[test]
fn test_resample_hourly() -> Result<()> {
    let series = store().load("b6a2d0a4-52f8-4d4b-8f0e-1c9d7e3a6b22")?;
    let hourly = series.resample(parse_interval("1h")?)?;
    assert_eq!(hourly.len(), 1);
    assert_eq!(hourly.points()[0].1, 50.0);
    Ok(())
}

#[test]
fn test_bad_csv_reports_file() -> Result<()> {
    let dir = TempDir::new("brickgraph-ts")?;
    std::fs::write(
        dir.path().join("broken.csv"),
        "timestamp,value\n2018-01-01 00:00:00,1\nsometime,2\n",
    )?;
    let err = TimeseriesStore::new(dir.path()).load("broken").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("broken.csv"), "{}", message);
    assert!(message.contains("line 3"), "{}", message);

    let empty = TimeSeries::from_reader("empty", "timestamp,value\n".as_bytes())?;
    assert!(empty.is_empty());
    Ok(())
}
