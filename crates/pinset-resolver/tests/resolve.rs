use pinset_core::constraint::Constraint;
use pinset_core::marker::MarkerEnvironment;
use pinset_core::name::PackageName;
use pinset_core::requirement::Requirement;
use pinset_resolver::conflict::ConflictReason;
use pinset_resolver::provider::MemoryProvider;
use pinset_resolver::{
    resolve, resolve_with_report, ConstraintTable, MetadataProvider, PackageMetadata,
    ProviderError, ResolveError, ResolveOptions, VersionRequest,
};

fn reqs(lines: &[&str]) -> Vec<Requirement> {
    lines.iter().map(|l| Requirement::parse(l).unwrap()).collect()
}

fn table(lines: &[&str]) -> ConstraintTable {
    let constraints = lines.iter().map(|l| Constraint::parse(l).unwrap());
    ConstraintTable::load(constraints, false).unwrap()
}

fn strict() -> ResolveOptions {
    ResolveOptions {
        strict_coverage: true,
        ..Default::default()
    }
}

/// A small slice of the Flask ecosystem, several versions each.
fn flask_index() -> MemoryProvider {
    MemoryProvider::new()
        .with_package(
            "Flask",
            "0.11.1",
            &["Werkzeug (>=0.7)", "Jinja2 (>=2.4)", "itsdangerous (>=0.21)", "click (>=2.0)"],
        )
        .unwrap()
        .with_package("Flask", "0.12", &["Werkzeug (>=0.7)", "Jinja2 (>=2.4)", "click (>=2.0)"])
        .unwrap()
        .with_package("Jinja2", "2.8", &["MarkupSafe"])
        .unwrap()
        .with_package("Jinja2", "2.9", &["MarkupSafe (>=0.23)"])
        .unwrap()
        .with_package("MarkupSafe", "0.23", &[])
        .unwrap()
        .with_package("MarkupSafe", "1.0", &[])
        .unwrap()
        .with_package("Werkzeug", "0.11.11", &[])
        .unwrap()
        .with_package("Werkzeug", "0.12", &[])
        .unwrap()
        .with_package("itsdangerous", "0.24", &[])
        .unwrap()
        .with_package("click", "6.6", &[])
        .unwrap()
}

#[test]
fn test_jinja2_end_to_end() {
    let constraints = table(&[
        "werkzeug==0.11.11",
        "MarkupSafe==0.23",
        "Jinja2==2.8",
        "Flask==0.11.1",
    ]);
    let graph = resolve(&reqs(&["Jinja2"]), &constraints, &flask_index(), &strict()).unwrap();

    assert_eq!(graph.to_flat_list(), ["Jinja2==2.8", "MarkupSafe==0.23"]);
    let adjacency = graph.to_adjacency();
    assert_eq!(adjacency.len(), 2);
    assert_eq!(adjacency["Jinja2==2.8"], ["MarkupSafe==0.23"]);
    assert!(adjacency["MarkupSafe==0.23"].is_empty());
}

#[test]
fn test_flask_full_tree_with_pins() {
    let constraints = table(&[
        "Flask==0.11.1",
        "werkzeug==0.11.11",
        "Jinja2==2.8",
        "MarkupSafe==0.23",
        "itsdangerous==0.24",
        "click==6.6",
    ]);
    let graph = resolve(&reqs(&["Flask"]), &constraints, &flask_index(), &strict()).unwrap();
    assert_eq!(
        graph.to_flat_list(),
        [
            "Flask==0.11.1",
            "Werkzeug==0.11.11",
            "Jinja2==2.8",
            "itsdangerous==0.24",
            "click==6.6",
            "MarkupSafe==0.23",
        ]
    );
    let flask = graph.find("flask").unwrap();
    assert_eq!(graph.dependencies_of(flask).len(), 4);
    assert_eq!(graph.roots(), &[flask]);
}

#[test]
fn test_resolution_is_deterministic() {
    let provider = flask_index();
    let run = || {
        let graph = resolve(
            &reqs(&["Flask", "Jinja2"]),
            &ConstraintTable::new(),
            &provider,
            &ResolveOptions::default(),
        )
        .unwrap();
        (graph.to_flat_list(), graph.to_adjacency())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_constraint_beats_requirement_specifier() {
    let provider = MemoryProvider::new()
        .with_package("pkg", "1.0", &[])
        .unwrap()
        .with_package("pkg", "1.1", &[])
        .unwrap();
    let resolution = resolve_with_report(
        &reqs(&["pkg>=1.1"]),
        &table(&["pkg==1.0"]),
        &provider,
        &ResolveOptions::default(),
    )
    .unwrap();
    assert_eq!(resolution.graph.to_flat_list(), ["pkg==1.0"]);
    let conflict = &resolution.conflicts.conflicts[0];
    assert_eq!(conflict.reason, ConflictReason::ConstraintOverride);
    assert_eq!(conflict.requested, ">=1.1");
    assert_eq!(conflict.resolved, "1.0");
}

#[test]
fn test_flat_mode_gives_roots_only() {
    let provider = MemoryProvider::new()
        .with_package("A", "1.0", &["B"])
        .unwrap()
        .with_package("B", "1.0", &[])
        .unwrap();
    let options = ResolveOptions {
        flat: true,
        ..Default::default()
    };
    let graph = resolve(&reqs(&["A"]), &ConstraintTable::new(), &provider, &options).unwrap();
    assert_eq!(graph.to_flat_list(), ["A==1.0"]);
    assert!(graph.to_adjacency()["A==1.0"].is_empty());
}

#[test]
fn test_strict_coverage_names_uncovered_root() {
    let provider = MemoryProvider::new()
        .with_package("A", "1.0", &[])
        .unwrap()
        .with_package("B", "1.0", &[])
        .unwrap();
    let err = resolve(&reqs(&["A"]), &table(&["B==1.0"]), &provider, &strict()).unwrap_err();
    match err {
        ResolveError::UncoveredRequirement { names } => assert_eq!(names, ["A"]),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_strict_coverage_lists_every_uncovered_name_once() {
    let graph_err = resolve(
        &reqs(&["Flask"]),
        &table(&["Flask==0.11.1", "Jinja2==2.8"]),
        &flask_index(),
        &strict(),
    )
    .unwrap_err();
    match graph_err {
        ResolveError::UncoveredRequirement { names } => {
            assert_eq!(names, ["Werkzeug", "itsdangerous", "click", "MarkupSafe"]);
        }
        other => panic!("unexpected error {other}"),
    }
    let message = resolve(&reqs(&["Flask"]), &table(&["Flask==0.11.1"]), &flask_index(), &strict())
        .unwrap_err()
        .to_string();
    assert!(
        message.contains("Werkzeug, Jinja2, itsdangerous, click, MarkupSafe"),
        "{message}"
    );
}

#[test]
fn test_strict_coverage_reports_transitive_uncovered_names() {
    let provider = MemoryProvider::new()
        .with_package("A", "1.0", &["B"])
        .unwrap()
        .with_package("B", "1.0", &["C"])
        .unwrap()
        .with_package("C", "1.0", &[])
        .unwrap();
    let err = resolve(&reqs(&["A"]), &table(&["A==1.0"]), &provider, &strict()).unwrap_err();
    match err {
        ResolveError::UncoveredRequirement { names } => assert_eq!(names, ["B", "C"]),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_strict_coverage_names_each_package_once_across_spellings() {
    let provider = MemoryProvider::new()
        .with_package("A", "1.0", &["foo_bar"])
        .unwrap()
        .with_package("Foo-Bar", "1.0", &[])
        .unwrap();
    let err = resolve(&reqs(&["A", "Foo-Bar"]), &table(&["A==1.0"]), &provider, &strict())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "packages not covered by the constraints: Foo-Bar"
    );
}

#[test]
fn test_strict_coverage_prefers_uncovered_over_not_found() {
    let provider = MemoryProvider::new()
        .with_package("A", "1.0", &["missing"])
        .unwrap();
    let err = resolve(&reqs(&["A"]), &table(&["A==1.0"]), &provider, &strict()).unwrap_err();
    match err {
        ResolveError::UncoveredRequirement { names } => assert_eq!(names, ["missing"]),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_bare_constraint_counts_as_coverage() {
    let graph = resolve(
        &reqs(&["Jinja2"]),
        &table(&["Jinja2", "MarkupSafe"]),
        &flask_index(),
        &strict(),
    )
    .unwrap();
    assert_eq!(graph.to_flat_list(), ["Jinja2==2.9", "MarkupSafe==1.0"]);
}

#[test]
fn test_shared_dependency_is_resolved_once() {
    let provider = MemoryProvider::new()
        .with_package("A", "1.0", &["B"])
        .unwrap()
        .with_package("C", "1.0", &["B"])
        .unwrap()
        .with_package("B", "1.0", &[])
        .unwrap();
    let graph = resolve(
        &reqs(&["A", "C"]),
        &ConstraintTable::new(),
        &provider,
        &ResolveOptions::default(),
    )
    .unwrap();
    assert_eq!(graph.len(), 3);
    let b = graph.find("B").unwrap();
    let dependents: Vec<String> = graph
        .dependents_of(b)
        .into_iter()
        .map(|idx| graph.node(idx).to_string())
        .collect();
    assert_eq!(dependents, ["A==1.0", "C==1.0"]);
}

#[test]
fn test_dependency_cycles_are_tolerated() {
    let provider = MemoryProvider::new()
        .with_package("A", "1.0", &["B"])
        .unwrap()
        .with_package("B", "1.0", &["A"])
        .unwrap();
    let graph = resolve(
        &reqs(&["A"]),
        &ConstraintTable::new(),
        &provider,
        &ResolveOptions::default(),
    )
    .unwrap();
    let adjacency = graph.to_adjacency();
    assert_eq!(adjacency["A==1.0"], ["B==1.0"]);
    assert_eq!(adjacency["B==1.0"], ["A==1.0"]);
}

#[test]
fn test_allow_double_same_pinned_version_succeeds() {
    let constraints = ConstraintTable::load(
        [Constraint::parse("B==1.0").unwrap(), Constraint::parse("B==1.0").unwrap()],
        true,
    )
    .unwrap();
    let provider = MemoryProvider::new()
        .with_package("B", "1.0", &[])
        .unwrap()
        .with_package("B", "2.0", &[])
        .unwrap();
    let options = ResolveOptions {
        allow_double: true,
        strict_coverage: true,
        ..Default::default()
    };
    let graph = resolve(&reqs(&["B", "B>=1.0"]), &constraints, &provider, &options).unwrap();
    assert_eq!(graph.to_flat_list(), ["B==1.0"]);
}

#[test]
fn test_allow_double_differing_versions_conflict() {
    let provider = MemoryProvider::new()
        .with_package("B", "1.0", &[])
        .unwrap()
        .with_package("B", "2.0", &[])
        .unwrap();
    let options = ResolveOptions {
        allow_double: true,
        ..Default::default()
    };
    let err = resolve(
        &reqs(&["B<2", "B>=2"]),
        &ConstraintTable::new(),
        &provider,
        &options,
    )
    .unwrap_err();
    match err {
        ResolveError::VersionConflict {
            name,
            existing,
            requested,
        } => {
            assert_eq!(name, "B");
            assert_eq!(existing, "1.0");
            assert_eq!(requested, "2.0");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_default_mode_keeps_first_resolution() {
    let provider = MemoryProvider::new()
        .with_package("B", "1.0", &[])
        .unwrap()
        .with_package("B", "2.0", &[])
        .unwrap();
    let resolution = resolve_with_report(
        &reqs(&["B<2", "B>=2"]),
        &ConstraintTable::new(),
        &provider,
        &ResolveOptions::default(),
    )
    .unwrap();
    assert_eq!(resolution.graph.to_flat_list(), ["B==1.0"]);
    assert_eq!(resolution.conflicts.len(), 1);
    assert_eq!(
        resolution.conflicts.conflicts[0].reason,
        ConflictReason::AlreadyResolved
    );
}

#[test]
fn test_markers_filter_roots_and_dependencies() {
    let provider = MemoryProvider::new()
        .with_package(
            "app",
            "1.0",
            &[
                "colorama; sys_platform == 'win32'",
                "typing-extensions; python_version < '3.8'",
                "attrs",
            ],
        )
        .unwrap()
        .with_package("colorama", "0.4", &[])
        .unwrap()
        .with_package("typing-extensions", "4.0", &[])
        .unwrap()
        .with_package("attrs", "23.1", &[])
        .unwrap()
        .with_package("pywin32", "306", &[])
        .unwrap();

    let mut environment = MarkerEnvironment::default().with_python_version("3.7");
    environment.sys_platform = "linux".to_string();
    let options = ResolveOptions {
        environment,
        ..Default::default()
    };
    let graph = resolve(
        &reqs(&["app", "pywin32; sys_platform == 'win32'"]),
        &ConstraintTable::new(),
        &provider,
        &options,
    )
    .unwrap();
    assert_eq!(
        graph.to_flat_list(),
        ["app==1.0", "typing-extensions==4.0", "attrs==23.1"]
    );
}

#[test]
fn test_extras_pull_in_optional_dependencies() {
    let provider = MemoryProvider::new()
        .with_package("requests", "2.31", &["idna", "PySocks (!=1.5.7) ; extra == 'socks'"])
        .unwrap()
        .with_package("idna", "3.4", &[])
        .unwrap()
        .with_package("PySocks", "1.7.1", &[])
        .unwrap()
        .with_package("client", "1.0", &["requests[socks]"])
        .unwrap();

    let plain = resolve(
        &reqs(&["requests"]),
        &ConstraintTable::new(),
        &provider,
        &ResolveOptions::default(),
    )
    .unwrap();
    assert_eq!(plain.to_flat_list(), ["requests==2.31", "idna==3.4"]);

    let with_extra = resolve(
        &reqs(&["requests[socks]"]),
        &ConstraintTable::new(),
        &provider,
        &ResolveOptions::default(),
    )
    .unwrap();
    assert_eq!(
        with_extra.to_flat_list(),
        ["requests==2.31", "idna==3.4", "PySocks==1.7.1"]
    );

    // requests is first reached without extras, then again through client.
    let revisited = resolve(
        &reqs(&["requests", "client"]),
        &ConstraintTable::new(),
        &provider,
        &ResolveOptions::default(),
    )
    .unwrap();
    assert_eq!(
        revisited.to_flat_list(),
        ["requests==2.31", "client==1.0", "idna==3.4", "PySocks==1.7.1"]
    );
    let requests = revisited.find("requests").unwrap();
    let socks = revisited.find("pysocks").unwrap();
    assert!(revisited.dependencies_of(requests).contains(&socks));
}

struct Unreachable;

impl MetadataProvider for Unreachable {
    fn fetch(
        &self,
        _name: &PackageName,
        _request: &VersionRequest,
    ) -> Result<PackageMetadata, ProviderError> {
        Err(ProviderError::Network {
            message: "connection refused".to_string(),
        })
    }
}

#[test]
fn test_provider_failures_abort() {
    let provider: Box<dyn MetadataProvider> = Box::new(Unreachable);
    let err = resolve(
        &reqs(&["Flask"]),
        &ConstraintTable::new(),
        &provider,
        &ResolveOptions::default(),
    )
    .unwrap_err();
    match err {
        ResolveError::Provider { name, message } => {
            assert_eq!(name, "Flask");
            assert!(message.contains("connection refused"));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_missing_root_has_no_parent() {
    let err = resolve(
        &reqs(&["Django>=5"]),
        &ConstraintTable::new(),
        &flask_index(),
        &ResolveOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "no version of Django matches >=5");
}
