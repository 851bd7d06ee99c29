use crimemap_core::{ChartDefinition, ChartError, ChartKind, ChartService};
use serde_json::json;
use std::fs;

fn trend_chart() -> ChartDefinition {
    ChartDefinition {
        key: "Major_Crimes_Trend".to_string(),
        file_name: "Major_Crimes_Trend.csv".to_string(),
        x: "Year".to_string(),
        y: "Count".to_string(),
        label: "Crime Type".to_string(),
        chart: ChartKind::Line,
        title: "Major crimes over time".to_string(),
    }
}

#[test]
fn titles_are_keyed_by_dataset() {
    let service = ChartService::new("/unused", ChartDefinition::defaults());
    let titles = service.chart_titles();

    assert_eq!(titles.len(), 2);
    assert!(titles.contains_key("Major_Crimes_Trend"));
    assert!(titles.contains_key("Crime_Lockdown_Patterns"));
}

#[test]
fn csv_dataset_is_projected_onto_mapped_columns() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("Major_Crimes_Trend.csv"),
        "Year,Crime Type,Count,Notes\n\
         2019,Burglary,120,first\n\
         2020,Burglary,,gap\n\
         2021,Burglary,NaN,marker\n\
         2021,N/A,7,marker\n\
         2020,Theft,98.5,second\n",
    )
    .unwrap();
    let service = ChartService::new(dir.path(), vec![trend_chart()]);

    let chart = service.chart_data("Major_Crimes_Trend").unwrap();
    assert_eq!(
        chart.data,
        json!([
            {"x": 2019, "y": 120, "label": "Burglary"},
            {"x": 2020, "y": 98.5, "label": "Theft"}
        ])
    );
    assert_eq!(chart.columns.x, "Year");
    assert_eq!(chart.columns.chart, ChartKind::Line);
}

#[test]
fn json_dataset_is_returned_as_is() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("trend.json"),
        r#"[{"Year": 2021, "Count": 3, "Crime Type": "Theft"}]"#,
    )
    .unwrap();
    let chart = ChartDefinition {
        file_name: "trend.json".to_string(),
        ..trend_chart()
    };
    let service = ChartService::new(dir.path(), vec![chart]);

    let data = service.chart_data("Major_Crimes_Trend").unwrap().data;
    assert_eq!(data[0]["Count"], 3);
}

#[test]
fn missing_columns_are_reported_by_name() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Major_Crimes_Trend.csv"), "Year,Total\n2019,1\n").unwrap();
    let service = ChartService::new(dir.path(), vec![trend_chart()]);

    match service.chart_data("Major_Crimes_Trend").unwrap_err() {
        ChartError::MissingColumns(columns) => {
            assert_eq!(columns, vec!["Count".to_string(), "Crime Type".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_dataset_and_missing_file_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let service = ChartService::new(dir.path(), vec![trend_chart()]);

    let unknown = service.chart_data("Nope").unwrap_err();
    assert!(matches!(unknown, ChartError::UnknownDataset(_)));
    assert!(unknown.is_not_found());

    let missing = service.chart_data("Major_Crimes_Trend").unwrap_err();
    assert!(matches!(missing, ChartError::SourceMissing(_)));
    assert!(missing.is_not_found());
}
