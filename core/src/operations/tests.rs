use super::*;
use crate::types::ParamKind;
use indexmap::indexmap;

/* ===================== Helpers ===================== */

fn urls() -> Table {
    Table::from_columns(vec![
        (
            "url",
            vec![
                Value::from("a/video/1"),
                Value::from("a/video/2"),
                Value::from("a/video/3"),
            ],
        ),
        ("rank", vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
    ])
    .unwrap()
}

fn config(pairs: Vec<(&str, Value)>) -> Record {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn record(pairs: Vec<(&str, Value)>) -> Record {
    config(pairs)
}

/* ===================== Source ===================== */

#[test]
fn test_source_list_of_scalars_becomes_output_column() {
    let entry = StepBuilder::new("yt_fetch_videos")
        .param("channel_url", ParamKind::String, "Channel URL")
        .source(|args| {
            let url = args.str("channel_url")?;
            Ok(vec![format!("{url}/1"), format!("{url}/2"), format!("{url}/3")].into())
        });

    let table = entry
        .transform(None, &config(vec![("channel_url", "a".into())]))
        .unwrap();

    assert_eq!(table.column_names(), vec!["output"]);
    assert_eq!(
        table.column("output").unwrap(),
        &[Value::from("a/1"), Value::from("a/2"), Value::from("a/3")]
    );
}

#[test]
fn test_source_ignores_input_table_and_unknown_keys() {
    let entry = StepBuilder::new("count_args")
        .param("known", ParamKind::Number, "")
        .source(|args| Ok(StepOutput::from(args.len() as i64)));

    let table = entry
        .transform(
            Some(&urls()),
            &config(vec![("known", Value::Int(1)), ("unknown", Value::Int(2))]),
        )
        .unwrap();

    assert_eq!(table.column("output").unwrap(), &[Value::Int(1)]);
}

#[test]
fn test_source_default_parameter_is_applied() {
    let entry = StepBuilder::new("greet")
        .param_with_default("name", ParamKind::String, "", "world")
        .source(|args| Ok(format!("hello {}", args.str("name")?).into()));

    let table = entry.transform(None, &Record::new()).unwrap();
    assert_eq!(table.column("output").unwrap(), &[Value::from("hello world")]);
}

#[test]
fn test_source_error_is_operation_failed() {
    let entry = StepBuilder::new("broken").source(|_| anyhow::bail!("upstream unavailable"));
    match entry.transform(None, &Record::new()) {
        Err(StepError::OperationFailed(msg)) => assert_eq!(msg, "upstream unavailable"),
        other => panic!("Expected OperationFailed, got {:?}", other),
    }
}

/* ===================== Dataframe ===================== */

#[test]
fn test_dataframe_receives_whole_table() {
    let entry = StepBuilder::new("summary").dataframe(|table, _| {
        Ok(Table::from_records(&[record(vec![(
            "total_rows",
            Value::from(table.row_count()),
        )])]))
    });

    let table = entry.transform(Some(&urls()), &Record::new()).unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.column("total_rows").unwrap(), &[Value::Int(3)]);
}

#[test]
fn test_dataframe_requires_input() {
    let entry = StepBuilder::new("summary").dataframe(|table, _| Ok(table.clone()));
    assert!(matches!(
        entry.transform(None, &Record::new()),
        Err(StepError::OperationFailed(_))
    ));
}

/* ===================== Map ===================== */

#[test]
fn test_map_scalar_appends_one_column() {
    let entry = StepBuilder::new("yt_transcribe")
        .label("Transcribe Videos")
        .map(|url, _| Ok(format!("transcript of {}", url.display_string()).into()));

    let input = urls();
    let table = entry.transform(Some(&input), &Record::new()).unwrap();

    assert_eq!(table.row_count(), input.row_count());
    assert_eq!(table.column_names(), vec!["url", "rank", "Transcribe Videos_output"]);
    assert_eq!(
        table.cell(1, "Transcribe Videos_output"),
        Some(&Value::from("transcript of a/video/2"))
    );
}

#[test]
fn test_map_records_flatten_into_columns() {
    let entry = StepBuilder::new("yt_extract_metadata").map(|url, _| {
        let url = url.display_string();
        Ok(record(vec![
            ("title", Value::from(format!("Title {}", url))),
            ("views", Value::from(url.len() * 100)),
        ])
        .into())
    });

    let table = entry.transform(Some(&urls()), &Record::new()).unwrap();
    assert_eq!(table.column_names(), vec!["url", "rank", "title", "views"]);
    assert_eq!(table.cell(0, "title"), Some(&Value::from("Title a/video/1")));
    assert_eq!(table.cell(2, "views"), Some(&Value::Int(900)));
}

#[test]
fn test_map_uses_target_column_and_extra_args() {
    let entry = StepBuilder::new("scale")
        .param("factor", ParamKind::Number, "")
        .map(|cell, args| {
            let n = cell.as_f64().unwrap_or_default();
            Ok((n * args.f64("factor")?).into())
        });

    let table = entry
        .transform(
            Some(&urls()),
            &config(vec![("_target_column", "rank".into()), ("factor", Value::Int(10))]),
        )
        .unwrap();

    assert_eq!(
        table.column("Scale_output").unwrap(),
        &[Value::Float(10.0), Value::Float(20.0), Value::Float(30.0)]
    );
}

#[test]
fn test_map_failing_row_becomes_null() {
    let entry = StepBuilder::new("picky").map(|cell, _| match cell.as_str() {
        Some("a/video/2") => anyhow::bail!("cannot handle this one"),
        Some(s) => Ok(StepOutput::Scalar(Value::from(s.len()))),
        None => Ok(StepOutput::Scalar(Value::Null)),
    });

    let table = entry.transform(Some(&urls()), &Record::new()).unwrap();
    assert_eq!(
        table.column("Picky_output").unwrap(),
        &[Value::Int(9), Value::Null, Value::Int(9)]
    );
}

#[test]
fn test_map_panicking_row_becomes_null() {
    let entry = StepBuilder::new("lookup").map(|cell, _| {
        let data = [10i64, 20];
        let index = cell.as_i64().unwrap_or_default() as usize;
        Ok(StepOutput::from(data[index]))
    });
    let input = Table::single_column("n", vec![Value::Int(0), Value::Int(5), Value::Int(1)]);

    let table = entry.transform(Some(&input), &Record::new()).unwrap();
    assert_eq!(
        table.column("Lookup_output").unwrap(),
        &[Value::Int(10), Value::Null, Value::Int(20)]
    );
}

#[test]
fn test_map_nested_records_flatten_with_dotted_names() {
    let entry = StepBuilder::new("metadata").map(|cell, _| {
        let stats = record(vec![("views", Value::Int(1))]);
        Ok(record(vec![
            ("url", Value::from(cell.display_string())),
            ("stats", Value::Record(stats)),
        ])
        .into())
    });
    let input = Table::single_column("u", vec![Value::from("a"), Value::from("b")]);

    let table = entry.transform(Some(&input), &Record::new()).unwrap();
    assert_eq!(table.column_names(), vec!["u", "url", "stats.views"]);
    assert_eq!(table.cell(1, "url"), Some(&Value::from("b")));
    assert_eq!(table.cell(1, "stats.views"), Some(&Value::Int(1)));
}

#[test]
fn test_map_all_rows_failing_still_adds_column() {
    let entry = StepBuilder::new("always_fails").map(|_, _| anyhow::bail!("nope"));
    let table = entry.transform(Some(&urls()), &Record::new()).unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.column_count(), 3);
    assert!(table.column("Always Fails_output").unwrap().iter().all(Value::is_null));
}

#[test]
fn test_map_unknown_target_column_is_invalid_configuration() {
    let entry = StepBuilder::new("echo").map(|cell, _| Ok(StepOutput::Scalar(cell.clone())));
    let result = entry.transform(
        Some(&urls()),
        &config(vec![("_target_column", "nope".into())]),
    );
    assert!(matches!(result, Err(StepError::InvalidConfiguration(_))));
}

#[test]
fn test_map_over_column_less_table_is_invalid_configuration() {
    let entry = StepBuilder::new("echo").map(|cell, _| Ok(StepOutput::Scalar(cell.clone())));
    let result = entry.transform(Some(&Table::empty()), &Record::new());
    assert!(matches!(result, Err(StepError::InvalidConfiguration(_))));
}

#[test]
fn test_map_does_not_mutate_input() {
    let entry = StepBuilder::new("echo").map(|cell, _| Ok(StepOutput::Scalar(cell.clone())));
    let input = urls();
    let before = input.clone();
    entry.transform(Some(&input), &Record::new()).unwrap();
    assert_eq!(input, before);
}

/* ===================== Expand ===================== */

#[test]
fn test_expand_row_count_is_sum_of_list_lengths() {
    let entry = StepBuilder::new("repeat").expand(|cell, _| {
        let n = cell.as_i64().unwrap_or_default();
        Ok(StepOutput::List((0..n).map(|i| Value::from(format!("r{n}-{i}"))).collect()))
    });

    let table = entry
        .transform(Some(&urls()), &config(vec![("_target_column", "rank".into())]))
        .unwrap();

    assert_eq!(table.row_count(), 1 + 2 + 3);
    assert_eq!(
        table.column("rank").unwrap(),
        &[
            Value::Int(1),
            Value::Int(2),
            Value::Int(2),
            Value::Int(3),
            Value::Int(3),
            Value::Int(3)
        ]
    );
    assert_eq!(
        table.column("Repeat_output").unwrap(),
        &[
            Value::from("r1-0"),
            Value::from("r2-0"),
            Value::from("r2-1"),
            Value::from("r3-0"),
            Value::from("r3-1"),
            Value::from("r3-2")
        ]
    );
}

#[test]
fn test_expand_records_flatten_on_exploded_rows() {
    let entry = StepBuilder::new("yt_segment").expand(|_, _| {
        Ok(vec![
            record(vec![("segment_id", Value::Int(1)), ("text", "Hello world".into())]),
            record(vec![("segment_id", Value::Int(2)), ("text", "Goodbye".into())]),
        ]
        .into())
    });

    let table = entry.transform(Some(&urls()), &Record::new()).unwrap();
    assert_eq!(table.row_count(), 6);
    assert_eq!(table.column_names(), vec!["url", "rank", "segment_id", "text"]);
    assert_eq!(table.cell(0, "url"), Some(&Value::from("a/video/1")));
    assert_eq!(table.cell(1, "url"), Some(&Value::from("a/video/1")));
    assert_eq!(table.cell(1, "text"), Some(&Value::from("Goodbye")));
    assert_eq!(table.cell(2, "url"), Some(&Value::from("a/video/2")));
}

#[test]
fn test_expand_empty_list_drops_row_and_failure_keeps_it() {
    let entry = StepBuilder::new("sometimes").expand(|cell, _| match cell.as_i64() {
        Some(1) => Ok(StepOutput::List(vec![])),
        Some(2) => anyhow::bail!("row two fails"),
        _ => Ok(StepOutput::List(vec![Value::from("x"), Value::from("y")])),
    });

    let table = entry
        .transform(Some(&urls()), &config(vec![("_target_column", "rank".into())]))
        .unwrap();

    assert_eq!(
        table.column("rank").unwrap(),
        &[Value::Int(2), Value::Int(3), Value::Int(3)]
    );
    assert_eq!(
        table.column("Sometimes_output").unwrap(),
        &[Value::Null, Value::from("x"), Value::from("y")]
    );
}

#[test]
fn test_expand_panicking_row_is_kept_with_null() {
    let entry = StepBuilder::new("fragile").expand(|cell, _| match cell.as_i64() {
        Some(2) => panic!("row two blew up"),
        _ => Ok(StepOutput::List(vec![Value::from("x")])),
    });

    let table = entry
        .transform(Some(&urls()), &config(vec![("_target_column", "rank".into())]))
        .unwrap();

    assert_eq!(
        table.column("rank").unwrap(),
        &[Value::Int(1), Value::Int(2), Value::Int(3)]
    );
    assert_eq!(
        table.column("Fragile_output").unwrap(),
        &[Value::from("x"), Value::Null, Value::from("x")]
    );
}

#[test]
fn test_expand_nested_records_flatten_with_dotted_names() {
    let entry = StepBuilder::new("segments").expand(|_, _| {
        let timing = |start: i64| Value::Record(record(vec![("start", Value::Int(start))]));
        Ok(vec![
            record(vec![("text", "Hello".into()), ("timing", timing(0))]),
            record(vec![("text", "Bye".into()), ("timing", timing(5))]),
        ]
        .into())
    });

    let table = entry.transform(Some(&urls()), &Record::new()).unwrap();
    assert_eq!(table.row_count(), 6);
    assert_eq!(table.column_names(), vec!["url", "rank", "text", "timing.start"]);
    assert_eq!(table.cell(1, "timing.start"), Some(&Value::Int(5)));
}

/* ===================== Explicit Transforms ===================== */

#[test]
fn test_explicit_transform_sees_raw_config() {
    let mut registry = OperationRegistry::new();
    registry.register_transform(
        OperationDefinition {
            id: "youtube_fetch_gen".to_string(),
            label: "Fetch Videos (Generic)".to_string(),
            description: "Retrieve video links from channel".to_string(),
            parameters: vec![],
        },
        "YouTube",
        OperationType::Source,
        |input, args| {
            assert!(input.is_none());
            let url = args.str("channel_url")?;
            Ok(Table::single_column("video_url", vec![Value::from(format!("{url}/1"))]))
        },
    );

    let entry = registry.get("youtube_fetch_gen").unwrap();
    assert_eq!(entry.operation_type(), OperationType::Source);
    let table = entry
        .transform(None, &config(vec![("channel_url", "c".into())]))
        .unwrap();
    assert_eq!(table.column("video_url").unwrap(), &[Value::from("c/1")]);
}

/* ===================== Registry ===================== */

#[test]
fn test_registry_reregistration_replaces_in_place() {
    let mut registry = OperationRegistry::new();
    registry.register(StepBuilder::new("a").source(|_| Ok(1i64.into())));
    registry.register(StepBuilder::new("b").source(|_| Ok(2i64.into())));
    let previous = registry.register(
        StepBuilder::new("a")
            .label("Replaced")
            .source(|_| Ok(3i64.into())),
    );

    assert!(previous.is_some());
    assert_eq!(registry.len(), 2);
    let labels: Vec<String> = registry.definitions().into_iter().map(|d| d.label).collect();
    assert_eq!(labels, vec!["Replaced", "B"]);

    let table = registry.get("a").unwrap().transform(None, &Record::new()).unwrap();
    assert_eq!(table.column("output").unwrap(), &[Value::Int(3)]);
}

#[test]
fn test_stdlib_registry_lists_operations() {
    let registry = OperationRegistry::with_stdlib();
    let ids: Vec<String> = registry.definitions().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["load_csv", "filter_rows", "drop_na"]);
    assert_eq!(
        registry.get("load_csv").unwrap().operation_type(),
        OperationType::Source
    );
}

#[test]
fn test_record_helper_is_insertion_ordered() {
    let r = indexmap! { "b".to_string() => Value::Int(1), "a".to_string() => Value::Int(2) };
    assert_eq!(Table::from_records([&r]).column_names(), vec!["b", "a"]);
}
