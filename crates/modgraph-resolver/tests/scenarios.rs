use std::path::Path;

use modgraph_core::inventory::{InstalledModule, Inventory};
use modgraph_core::release::{install_dir_name, Origin, Release};
use modgraph_core::version::{parse_range, parse_version};
use modgraph_resolver::error::{Request, ResolveError};
use modgraph_resolver::graph::{Graph, GraphConstraint};
use modgraph_resolver::plan::{plan, ActionKind, PlanOptions};
use modgraph_resolver::resolution::Resolution;
use modgraph_resolver::resolver::{ResolveOptions, Resolver};
use modgraph_resolver::source::{InstalledSource, Sources, StaticSource, REGISTRY_PRIORITY};
use modgraph_resolver::tree;

fn release(name: &str, version: &str, deps: &[(&str, &str)]) -> Release {
    let mut r = Release::new(
        name,
        parse_version(version).unwrap(),
        Origin::Registry {
            file_uri: format!("/v3/files/{name}-{version}.tar.gz"),
        },
    );
    for (dep, range) in deps {
        r = r.with_requirement(dep, parse_range(range).unwrap());
    }
    r
}

fn installed(
    name: &str,
    version: &str,
    deps: &[(&str, &str)],
    modulepath: &Path,
) -> InstalledModule {
    let path = modulepath.join(install_dir_name(name));
    let mut r = Release::new(
        name,
        parse_version(version).unwrap(),
        Origin::Installed { path: path.clone() },
    );
    for (dep, range) in deps {
        r = r.with_requirement(dep, parse_range(range).unwrap());
    }
    InstalledModule {
        release: r,
        path,
        modulepath: modulepath.to_path_buf(),
        has_local_changes: false,
    }
}

fn registry(releases: Vec<Release>) -> StaticSource {
    releases
        .into_iter()
        .fold(StaticSource::new("registry", REGISTRY_PRIORITY), StaticSource::with)
}

fn selected(resolution: &Resolution) -> Vec<String> {
    resolution
        .selection()
        .iter()
        .map(|id| resolution.release(*id).to_string())
        .collect()
}

async fn resolve(sources: Sources, graph: Graph, request: &Request) -> Result<Resolution, ResolveError> {
    Resolver::new(sources, ResolveOptions::default())
        .resolve(graph, request)
        .await
}

#[tokio::test]
async fn mutual_dependency_resolves_once_each() {
    let sources = Sources::new().with(registry(vec![
        release("alice-php", "0.0.1", &[("alice-apache", "0.0.1")]),
        release("alice-apache", "0.0.1", &[("alice-php", "0.0.1")]),
    ]));
    let request = Request::install("alice-php", None);

    let resolution = resolve(sources, Graph::for_request(&request), &request).await.unwrap();
    assert_eq!(selected(&resolution), vec!["alice-apache (v0.0.1)", "alice-php (v0.0.1)"]);

    let tmp = tempfile::tempdir().unwrap();
    let opts = PlanOptions {
        request: request.clone(),
        force: false,
        ignore_changes: false,
        target_dir: None,
        search_paths: vec![tmp.path().to_path_buf()],
    };
    let plan = plan(&resolution, &Inventory::default(), &opts).unwrap();
    assert_eq!(plan.actions.len(), 2);
    assert_eq!(
        tree::render(&plan, &request.name),
        format!(
            "{}\n└─┬ alice-php (v0.0.1)\n  └── alice-apache (v0.0.1)",
            tmp.path().display()
        )
    );
}

#[tokio::test]
async fn unsatisfiable_chain_is_reported() {
    let sources = Sources::new().with(registry(vec![
        release(
            "alice-apollo",
            "0.0.1",
            &[("alice-java", "1.7.1"), ("alice-stdlib", "0.0.1")],
        ),
        release("alice-java", "1.7.1", &[("alice-stdlib", "1.0.0")]),
        release("alice-stdlib", "0.0.1", &[]),
        release("alice-stdlib", "1.0.0", &[]),
    ]));
    let request = Request::install("alice-apollo", Some(parse_range("0.0.1").unwrap()));

    let err = resolve(sources, Graph::for_request(&request), &request)
        .await
        .err()
        .unwrap();
    assert_eq!(
        err.oneline(),
        "Could not install 'alice-apollo' (v0.0.1); no version satisfies all dependencies"
    );
    assert_eq!(
        err.multiline(),
        "Could not install module 'alice-apollo' (v0.0.1)\n\
         \x20 No version of 'alice-stdlib' will satisfy dependencies\n\
         \x20   You specified 'alice-apollo' (v0.0.1),\n\
         \x20   which depends on 'alice-java' (v1.7.1),\n\
         \x20   which depends on 'alice-stdlib' (v1.0.0)\n\
         \x20   Constraints on 'alice-stdlib':\n\
         \x20     'alice-apollo' (v0.0.1) requires 'alice-stdlib' (0.0.1)\n\
         \x20     'alice-java' (v1.7.1) requires 'alice-stdlib' (1.0.0)\n\
         \x20   Use `modgraph install --force` to install this module anyway"
    );
}

#[tokio::test]
async fn self_requirement_on_other_version_is_a_cycle() {
    let sources = Sources::new().with(registry(vec![
        release("alice-foo", "1.1.0", &[("alice-foo", "1.0.0")]),
        release("alice-foo", "1.0.0", &[("alice-foo", "1.1.0")]),
    ]));
    let request = Request::install("alice-foo", None);

    let err = resolve(sources, Graph::for_request(&request), &request)
        .await
        .err()
        .unwrap();
    assert!(
        matches!(err, ResolveError::InvalidDependencyCycle { ref module, .. } if module == "alice-foo"),
        "{err:?}"
    );
    assert_eq!(
        err.oneline(),
        "'alice-foo' (latest) requested; Invalid dependency cycle"
    );
}

#[tokio::test]
async fn self_requirement_it_satisfies_resolves() {
    let sources = Sources::new().with(registry(vec![
        release("alice-foo", "1.0.0", &[("alice-foo", "1.x")]),
    ]));
    let request = Request::install("alice-foo", None);

    let resolution = resolve(sources, Graph::for_request(&request), &request).await.unwrap();
    assert_eq!(selected(&resolution), vec!["alice-foo (v1.0.0)"]);
}

#[tokio::test]
async fn stable_preferred_over_newer_prerelease() {
    let sources = Sources::new().with(registry(vec![
        release("alice-lib", "1.0.0", &[]),
        release("alice-lib", "1.1.0-rc1", &[]),
    ]));
    let request = Request::install("alice-lib", None);

    let resolution = resolve(sources, Graph::for_request(&request), &request).await.unwrap();
    assert_eq!(selected(&resolution), vec!["alice-lib (v1.0.0)"]);
}

#[tokio::test]
async fn prerelease_chosen_when_nothing_stable_exists() {
    let sources = Sources::new().with(registry(vec![
        release("alice-apache", "0.0.3-rc0", &[]),
        release("alice-apache", "0.0.3-rc1", &[]),
    ]));
    let request = Request::install("alice-apache", None);

    let resolution = resolve(sources, Graph::for_request(&request), &request).await.unwrap();
    assert_eq!(selected(&resolution), vec!["alice-apache (v0.0.3-rc1)"]);
}

#[tokio::test]
async fn distinct_install_names_change_selection() {
    let sources = Sources::new().with(registry(vec![
        release(
            "alice-app",
            "2.0.0",
            &[("alice-util", ">= 1.0.0"), ("bob-util", ">= 1.0.0")],
        ),
        release("alice-app", "1.0.0", &[("alice-util", ">= 1.0.0")]),
        release("alice-util", "1.0.0", &[]),
        release("bob-util", "1.0.0", &[]),
    ]));
    let request = Request::install("alice-app", None);

    let graph = Graph::for_request(&request);
    let resolution = resolve(sources.clone(), graph.clone(), &request).await.unwrap();
    assert!(selected(&resolution).contains(&"alice-app (v2.0.0)".to_string()));

    let mut graph = graph;
    graph.add_graph_constraint(GraphConstraint::DistinctInstallNames);
    let resolution = resolve(sources, graph, &request).await.unwrap();
    assert_eq!(
        selected(&resolution),
        vec!["alice-app (v1.0.0)", "alice-util (v1.0.0)"]
    );
}

#[tokio::test]
async fn installed_dependency_is_preferred() {
    let tmp = tempfile::tempdir().unwrap();
    let inventory = Inventory {
        search_paths: vec![tmp.path().to_path_buf()],
        modules: vec![installed("alice-lib", "1.0.0", &[], tmp.path())],
        unmanaged: vec![],
    };
    let registry_source = registry(vec![
        release("alice-app", "1.0.0", &[("alice-lib", "1.x")]),
        release("alice-lib", "1.0.0", &[]),
        release("alice-lib", "1.2.0", &[]),
    ]);
    let sources = Sources::new()
        .with(InstalledSource::new(&inventory))
        .with(registry_source);
    let request = Request::install("alice-app", None);

    let resolution = resolve(sources.clone(), Graph::for_request(&request), &request).await.unwrap();
    let lib = resolution.find("alice-lib").unwrap();
    assert_eq!(resolution.release(lib).version.to_string(), "1.0.0");
    assert!(resolution.release(lib).is_installed());

    let options = ResolveOptions {
        prefer_installed: false,
        ..ResolveOptions::default()
    };
    let resolution = Resolver::new(sources, options)
        .resolve(Graph::for_request(&request), &request)
        .await
        .unwrap();
    let lib = resolution.find("alice-lib").unwrap();
    assert_eq!(resolution.release(lib).version.to_string(), "1.2.0");
}

#[tokio::test]
async fn cascading_upgrades_stay_in_place() {
    let tmp = tempfile::tempdir().unwrap();
    let primary = tmp.path().join("primary");
    let secondary = tmp.path().join("secondary");
    std::fs::create_dir_all(&primary).unwrap();
    std::fs::create_dir_all(&secondary).unwrap();

    let inventory = Inventory {
        search_paths: vec![primary.clone(), secondary.clone()],
        modules: vec![
            installed("alice-java", "1.6.0", &[("alice-stdlib", ">= 1.0.0")], &primary),
            installed("alice-stdlib", "1.0.0", &[], &secondary),
        ],
        unmanaged: vec![],
    };
    let sources = Sources::new()
        .with(InstalledSource::new(&inventory))
        .with(registry(vec![
            release(
                "alice-apollo",
                "0.0.2",
                &[("alice-java", ">= 1.7.0"), ("alice-stdlib", ">= 1.2.0")],
            ),
            release("alice-java", "1.6.0", &[("alice-stdlib", ">= 1.0.0")]),
            release("alice-java", "1.7.1", &[("alice-stdlib", ">= 1.0.0")]),
            release("alice-stdlib", "1.0.0", &[]),
            release("alice-stdlib", "1.5.0", &[]),
            release("alice-stdlib", "2.6.0", &[]),
        ]));
    let request = Request::install("alice-apollo", None);
    let mut graph = Graph::for_request(&request);
    graph.constrain_installed(&inventory, &request.name);
    graph.add_graph_constraint(GraphConstraint::DistinctInstallNames);

    let resolution = resolve(sources, graph, &request).await.unwrap();
    assert_eq!(
        selected(&resolution),
        vec![
            "alice-apollo (v0.0.2)",
            "alice-java (v1.7.1)",
            "alice-stdlib (v1.5.0)"
        ]
    );

    let opts = PlanOptions {
        request: request.clone(),
        force: false,
        ignore_changes: false,
        target_dir: None,
        search_paths: inventory.search_paths.clone(),
    };
    let plan = plan(&resolution, &inventory, &opts).unwrap();
    let stdlib = plan.action_for("alice-stdlib").unwrap();
    assert_eq!(stdlib.kind, ActionKind::Upgrade);
    assert_eq!(stdlib.target_path, secondary);
    assert_eq!(plan.action_for("alice-java").unwrap().target_path, primary);

    assert_eq!(
        tree::render(&plan, &request.name),
        format!(
            "{}\n└─┬ alice-apollo (v0.0.2)\n  ├── alice-java (v1.6.0 -> v1.7.1)\n  └── alice-stdlib (v1.0.0 -> v1.5.0) [{}]",
            primary.display(),
            secondary.display()
        )
    );
}

#[tokio::test]
async fn force_resolves_only_the_requested_module() {
    let sources = Sources::new().with(registry(vec![
        release("alice-bacula", "0.0.2", &[("alice-mysql", ">= 1.0.0")]),
        release("alice-bacula", "0.0.3", &[("alice-ghost", "9.x")]),
    ]));
    let request = Request::install("alice-bacula", None);

    let err = resolve(sources.clone(), Graph::for_request(&request), &request)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ResolveError::NoCandidateReleases { .. }), "{err:?}");

    let options = ResolveOptions {
        force: true,
        ..ResolveOptions::default()
    };
    let resolution = Resolver::new(sources, options)
        .resolve(Graph::for_request(&request), &request)
        .await
        .unwrap();
    assert_eq!(selected(&resolution), vec!["alice-bacula (v0.0.3)"]);
}

#[tokio::test]
async fn installed_constraint_blocks_upgrade() {
    let tmp = tempfile::tempdir().unwrap();
    let inventory = Inventory {
        search_paths: vec![tmp.path().to_path_buf()],
        modules: vec![
            installed("alice-keystone", "1.0.0", &[("alice-mysql", ">= 0.6.1 < 1.0.0")], tmp.path()),
            installed("alice-mysql", "0.9.0", &[], tmp.path()),
        ],
        unmanaged: vec![],
    };
    let sources = Sources::new().with(registry(vec![
        release("alice-mysql", "0.9.0", &[]),
        release("alice-mysql", "2.1.0", &[]),
    ]));
    let request = Request::upgrade(
        "alice-mysql",
        Some(parse_range("2.1.0").unwrap()),
        parse_version("0.9.0").unwrap(),
    );
    let mut graph = Graph::for_request(&request);
    graph.constrain_installed(&inventory, &request.name);

    let err = resolve(sources, graph, &request).await.err().unwrap();
    assert_eq!(
        err.oneline(),
        "Could not upgrade 'alice-mysql' (v0.9.0 -> v2.1.0); no version satisfies all dependencies"
    );
    if let ResolveError::UnsatisfiableConstraints { constraints, .. } = &err {
        assert!(constraints.iter().any(|c| c.contains("alice-keystone constraint")));
    } else {
        panic!("unexpected error: {err:?}");
    }
}

#[tokio::test]
async fn missing_dependency_names_the_module() {
    let sources = Sources::new().with(registry(vec![release(
        "alice-app",
        "1.0.0",
        &[("alice-ghost", ">= 1.0.0")],
    )]));
    let request = Request::install("alice-app", None);

    let err = resolve(sources, Graph::for_request(&request), &request)
        .await
        .err()
        .unwrap();
    assert_eq!(
        err.oneline(),
        "Could not install 'alice-app' (latest); no releases of 'alice-ghost' are available"
    );
}
