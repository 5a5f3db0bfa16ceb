use super::*;
use crate::store::MemoryStore;
use crate::table::Table;
use indexmap::indexmap;
use maplit::hashmap;

fn stored_step(store: &MemoryStore) -> DatasetRef {
    store.save(
        Table::from_columns(vec![(
            "COLA",
            vec![Value::Int(10), Value::Int(20), Value::Int(30)],
        )])
        .unwrap(),
    )
}

#[test]
fn test_parse_formula_trims_label_and_column() {
    let formula = parse_formula("= Step 1 ! COLA ").unwrap();
    assert_eq!(formula.label, "Step 1");
    assert_eq!(formula.column, "COLA");
    assert_eq!(formula.raw(), "= Step 1 ! COLA ");
}

#[test]
fn test_parse_formula_rejects_malformed_input() {
    assert!(matches!(parse_formula("Step 1!COLA"), Err(FormulaError::Syntax(_))));
    assert!(matches!(parse_formula("=Step 1"), Err(FormulaError::Syntax(_))));
    assert!(matches!(parse_formula("=a!b!c"), Err(FormulaError::Syntax(_))));
    assert_eq!(parse_formula("= !COLA"), Err(FormulaError::Empty("label")));
    assert_eq!(parse_formula("=Step 1! "), Err(FormulaError::Empty("column")));
}

#[test]
fn test_malformed_formulas_stay_literal() {
    for raw in ["=", "=!", "=Step 1", "=a!b!c", "=!COLA", "plain text"] {
        assert_eq!(
            ConfigValue::parse(Value::from(raw)),
            ConfigValue::Literal(Value::from(raw)),
            "{} should be literal",
            raw
        );
    }
    assert_eq!(
        ConfigValue::parse(Value::Int(3)),
        ConfigValue::Literal(Value::Int(3))
    );
}

#[test]
fn test_step_config_finds_references() {
    let config = StepConfig::parse(&indexmap! {
        "text".to_string() => Value::from("=Step 1!COLA"),
        "count".to_string() => Value::Int(2),
    });
    assert_eq!(config.len(), 2);
    let refs: Vec<(&str, &FormulaRef)> = config.references().collect();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].0, "text");
    assert_eq!(refs[0].1.label, "Step 1");
    assert_eq!(config.get("count"), Some(&ConfigValue::Literal(Value::Int(2))));
}

#[test]
fn test_resolve_substitutes_full_column() {
    let store = MemoryStore::new();
    let step = stored_step(&store);
    let labels = hashmap! { "Step 1".to_string() => step };

    let resolved = ReferenceResolver::new(&labels, &store)
        .resolve(StepConfig::parse(&indexmap! {
            "text".to_string() => Value::from("=Step 1!COLA"),
            "suffix".to_string() => Value::from("!"),
        }))
        .unwrap();

    assert_eq!(
        resolved.get("text"),
        Some(&Value::List(vec![Value::Int(10), Value::Int(20), Value::Int(30)]))
    );
    assert_eq!(resolved.get("suffix"), Some(&Value::from("!")));
}

#[test]
fn test_unresolved_references_pass_through() {
    let store = MemoryStore::new();
    let step = stored_step(&store);
    let labels = hashmap! {
        "Step 1".to_string() => step,
        "Gone".to_string() => DatasetRef::new(),
    };
    let resolver = ReferenceResolver::new(&labels, &store);

    for raw in ["=Nope!COLA", "=Step 1!MISSING", "=Gone!COLA"] {
        assert_eq!(resolver.resolve_value(Value::from(raw)).unwrap(), Value::from(raw));
    }
}

#[test]
fn test_strict_resolver_rejects_unresolved_references() {
    let store = MemoryStore::new();
    let labels = HashMap::new();
    let err = ReferenceResolver::new(&labels, &store)
        .strict(true)
        .resolve_value(Value::from("=Nope!COLA"))
        .unwrap_err();
    assert_eq!(
        err,
        StepError::UnresolvedReference {
            label: "Nope".to_string(),
            column: "COLA".to_string(),
        }
    );
}

#[test]
fn test_strict_resolver_keeps_malformed_literals() {
    let store = MemoryStore::new();
    let labels = HashMap::new();
    let value = ReferenceResolver::new(&labels, &store)
        .strict(true)
        .resolve_value(Value::from("=just text"))
        .unwrap();
    assert_eq!(value, Value::from("=just text"));
}
