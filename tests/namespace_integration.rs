//! Namespace resolution and parsing through the public API

use app_harness::options::{
    EX_USAGE, HarnessError, NamespaceRegistry, OptionKind, OptionValue, Owner, ParserAssembler,
    ValueSource,
};
use pretty_assertions::assert_eq;

fn argv(args: &[&str]) -> Vec<String> {
    std::iter::once("prog")
        .chain(args.iter().copied())
        .map(str::to_string)
        .collect()
}

fn mapping_for(order: &[&str]) -> Vec<(String, String, String)> {
    let registry = NamespaceRegistry::new();
    for label in order {
        registry
            .registrar(Owner::new(*label))
            .declare("retries", OptionKind::int(), 1, "Attempts", None)
            .unwrap();
    }
    registry.public_mapping()
}

#[test]
fn test_collision_outcome_independent_of_order() {
    let forward = mapping_for(&["A", "B"]);
    let backward = mapping_for(&["B", "A"]);

    assert_eq!(forward, backward);
    assert_eq!(
        forward,
        vec![
            ("A.retries".to_string(), "A".to_string(), "retries".to_string()),
            ("B.retries".to_string(), "B".to_string(), "retries".to_string()),
        ]
    );
}

#[test]
fn test_retries_scenario() {
    let build = || {
        let registry = NamespaceRegistry::new();
        let a = registry
            .registrar(Owner::new("A"))
            .declare("retries", OptionKind::int(), 3, "", None)
            .unwrap();
        let b = registry
            .registrar(Owner::new("B"))
            .declare("retries", OptionKind::int(), 5, "", None)
            .unwrap();
        (registry, a, b)
    };

    let (registry, a, b) = build();
    let config = ParserAssembler::new(registry, "prog")
        .assemble(argv(&["--A.retries", "10"]))
        .unwrap();
    assert_eq!(config.get_int(&a).unwrap(), 10);
    assert_eq!(config.get_int(&b).unwrap(), 5);
    assert_eq!(config.source(&a).unwrap(), ValueSource::CommandLine);
    assert_eq!(config.source(&b).unwrap(), ValueSource::Default);

    let (registry, a, b) = build();
    let config = ParserAssembler::new(registry, "prog")
        .assemble(argv(&[]))
        .unwrap();
    assert_eq!(config.get_int(&a).unwrap(), 3);
    assert_eq!(config.get_int(&b).unwrap(), 5);
}

#[test]
fn test_bare_retries_is_not_accepted_after_collision() {
    let registry = NamespaceRegistry::new();
    for label in ["A", "B"] {
        registry
            .registrar(Owner::new(label))
            .declare("retries", OptionKind::int(), 0, "", None)
            .unwrap();
    }

    let err = ParserAssembler::new(registry, "prog")
        .assemble(argv(&["--retries", "1"]))
        .unwrap_err();
    assert!(matches!(err, HarnessError::Cli(_)));
    assert_ne!(err.exit_code(), 0);
}

#[test]
fn test_verbose_scenario() {
    let registry = NamespaceRegistry::new();
    let registrar = registry.registrar(Owner::new("A"));
    let verbose = registrar
        .declare("verbose", OptionKind::Flag, false, "Talk more", None)
        .unwrap();
    assert_eq!(registrar.public_id(&verbose).as_deref(), Some("verbose"));

    let config = ParserAssembler::new(registry, "prog")
        .assemble(argv(&["--verbose"]))
        .unwrap();
    assert!(config.get_bool(&verbose).unwrap());
    assert_eq!(config.get_public("verbose"), Some(&OptionValue::Bool(true)));
}

#[test]
fn test_contested_name_namespaces_later_owners() {
    let registry = NamespaceRegistry::new();
    for label in ["A", "B", "C"] {
        registry
            .registrar(Owner::new(label))
            .declare("depth", OptionKind::int(), 0, "", None)
            .unwrap();
    }

    assert!(registry.is_contested("depth"));
    assert!(registry.get("depth").is_none());
    assert!(registry.get("C.depth").is_some());
}

#[test]
fn test_duplicate_after_other_owners() {
    let registry = NamespaceRegistry::new();
    let a = registry.registrar(Owner::new("A"));
    a.declare("depth", OptionKind::int(), 0, "", None).unwrap();
    for label in ["B", "C", "D"] {
        registry
            .registrar(Owner::new(label))
            .declare("depth", OptionKind::int(), 0, "", None)
            .unwrap();
    }

    assert!(matches!(
        a.declare("depth", OptionKind::int(), 0, "", None),
        Err(HarnessError::DuplicateOption { .. })
    ));
}

#[test]
fn test_bad_int_names_option_and_input() {
    let registry = NamespaceRegistry::new();
    for label in ["A", "B"] {
        registry
            .registrar(Owner::new(label))
            .declare("retries", OptionKind::int(), 0, "", None)
            .unwrap();
    }

    let err = ParserAssembler::new(registry, "prog")
        .assemble(argv(&["--B.retries=lots"]))
        .unwrap_err();

    match &err {
        HarnessError::InvalidOptionValue {
            public_id,
            owner,
            raw,
            ..
        } => {
            assert_eq!(public_id, "B.retries");
            assert_eq!(owner, "B");
            assert_eq!(raw, "lots");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), EX_USAGE);
    assert!(err.to_string().contains("lots"));
}

#[test]
fn test_validator_rejects_value() {
    fn even(value: &OptionValue) -> Result<(), String> {
        match value.as_int() {
            Some(n) if n % 2 == 0 => Ok(()),
            _ => Err("must be even".to_string()),
        }
    }

    let registry = NamespaceRegistry::new();
    registry
        .registrar(Owner::new("A"))
        .declare("pairs", OptionKind::int(), 2, "", Some(even))
        .unwrap();

    let err = ParserAssembler::new(registry, "prog")
        .assemble(argv(&["--pairs", "3"]))
        .unwrap_err();
    assert!(err.to_string().contains("must be even"));
}

#[test]
fn test_assembly_happens_once_and_reads_are_stable() {
    let registry = NamespaceRegistry::new();
    let registrar = registry.registrar(Owner::new("A"));
    let include = registrar
        .declare("include", OptionKind::Repeated, Vec::<String>::new(), "", None)
        .unwrap();

    let config = ParserAssembler::new(registry.clone(), "prog")
        .assemble(argv(&["--include", "x", "--include", "y"]))
        .unwrap();

    let first = config.get(&include).unwrap().clone();
    assert_eq!(config.get(&include).unwrap(), &first);
    assert_eq!(config.get_list(&include).unwrap(), ["x".to_string(), "y".to_string()]);

    assert!(matches!(
        ParserAssembler::new(registry.clone(), "prog").assemble(argv(&[])),
        Err(HarnessError::AlreadyAssembled)
    ));
    assert!(matches!(
        registrar.declare("late", OptionKind::Flag, false, "", None),
        Err(HarnessError::AlreadyAssembled)
    ));
}
