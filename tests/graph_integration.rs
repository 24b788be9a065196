//! Integration tests for dependency graph resolution.
//!
//! A second cache directory serves as a file remote, so these tests run the
//! whole lookup path: range candidates from the remote, recipe retrieval
//! into the local cache, metadata recording and graph construction.

use std::fs;

use tempfile::TempDir;

use stowage::core::cache::PackageCache;
use stowage::core::graph::DepsGraph;
use stowage::core::ops::set_dirty;
use stowage::core::reference::Reference;
use stowage::engine::{export_recipe, resolve, Decision, GraphBuilder, GraphError, Session};
use stowage::range::{ResolveError, UpdatePolicy};
use stowage::recipe::{Requirement, TomlRecipeLoader};
use stowage::remote::mock::{FailOn, MockRemote};
use stowage::remote::{FileRemoteManager, Remote, RemoteError, Remotes};

// =============================================================================
// Test Fixtures
// =============================================================================

/// A local cache plus a directory remote named `origin`.
struct World {
    dir: TempDir,
    cache: PackageCache,
    remote_cache: PackageCache,
    remotes: Remotes,
    manager: FileRemoteManager,
    loader: TomlRecipeLoader,
}

impl World {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let remote_root = dir.path().join("remote");
        Self {
            cache: PackageCache::new(dir.path().join("local")),
            remote_cache: PackageCache::new(&remote_root),
            remotes: Remotes::new(vec![Remote::new(
                "origin",
                remote_root.to_string_lossy().into_owned(),
            )]),
            manager: FileRemoteManager::new(),
            loader: TomlRecipeLoader::new(),
            dir,
        }
    }

    fn session(&self) -> Session<'_> {
        Session::new(&self.cache, &self.remotes, &self.manager, &self.loader)
    }

    /// Export a recipe into `cache` with the given requirement entries.
    fn export_into(&self, cache: &PackageCache, reference: &str, requires: &[&str]) -> Reference {
        let work = self.dir.path().join("work").join(reference.replace(['/', '@'], "_"));
        fs::create_dir_all(&work).unwrap();
        let entries: Vec<String> = requires.iter().map(|r| format!("  {},", r)).collect();
        fs::write(
            work.join("recipe.toml"),
            format!("[recipe]\nrequires = [\n{}\n]\n", entries.join("\n")),
        )
        .unwrap();

        let empty = Remotes::default();
        let session = Session::new(cache, &empty, &self.manager, &self.loader);
        export_recipe(&session, &work, &Reference::parse(reference).unwrap(), None)
            .unwrap()
            .reference
    }

    fn publish(&self, reference: &str, requires: &[&str]) -> Reference {
        self.export_into(&self.remote_cache, reference, requires)
    }

    fn export_local(&self, reference: &str, requires: &[&str]) -> Reference {
        self.export_into(&self.cache, reference, requires)
    }
}

fn req(text: &str) -> Requirement {
    Requirement::parse(text).unwrap()
}

fn version_of(graph: &DepsGraph, name: &str) -> Vec<String> {
    graph
        .nodes_named(name)
        .into_iter()
        .filter_map(|id| graph.node(id)?.reference().map(|r| r.version().to_string()))
        .collect()
}

// =============================================================================
// Remote retrieval
// =============================================================================

#[tokio::test]
async fn ranges_use_remote_candidates_and_record_origin() {
    let world = World::new();
    for version in ["0.1", "0.2", "0.3", "1.1"] {
        world.publish(&format!("say/{}@myuser/testing", version), &[]);
    }
    world.publish("hello/1.2@myuser/testing", &["\"say/[>0.1,<1]@myuser/testing\""]);

    let resolution = resolve(
        world.session(),
        &[req("hello/1.2@myuser/testing")],
        UpdatePolicy::check_remote(None),
    )
    .await
    .unwrap();

    assert_eq!(version_of(&resolution.graph, "say"), vec!["0.3"]);
    let say = resolution.graph.nodes_named("say")[0];
    let node = resolution.graph.node(say).unwrap();
    assert_eq!(node.remote(), Some("origin"));
    assert!(node.reference().unwrap().revision().is_some());

    let say_ref = Reference::parse("say/0.3@myuser/testing").unwrap();
    assert!(world.cache.layout_for(&say_ref).has_recipe());
    let meta = world.cache.metadata(&say_ref).load().unwrap();
    assert_eq!(meta.recipe.remote.as_deref(), Some("origin"));
    assert_eq!(meta.recipe.revision.as_deref(), node.reference().unwrap().revision());
}

#[tokio::test]
async fn local_policy_sticks_to_cached_versions() {
    let world = World::new();
    world.export_local("say/0.1@myuser/testing", &[]);
    world.publish("say/0.3@myuser/testing", &[]);
    let wanted = [req("say/[>0.0]@myuser/testing")];

    let local = resolve(world.session(), &wanted, UpdatePolicy::local())
        .await
        .unwrap();
    assert_eq!(version_of(&local.graph, "say"), vec!["0.1"]);

    let updated = resolve(world.session(), &wanted, UpdatePolicy::check_remote(None))
        .await
        .unwrap();
    assert_eq!(version_of(&updated.graph, "say"), vec!["0.3"]);
}

#[tokio::test]
async fn unknown_selected_remote_is_an_error() {
    let world = World::new();
    let err = resolve(
        world.session(),
        &[req("say/[>0.0]@myuser/testing")],
        UpdatePolicy::check_remote(Some("nowhere".into())),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Resolve(ResolveError::Remote(RemoteError::UnknownRemote(_)))
    ));
}

#[tokio::test]
async fn unsatisfiable_range_names_the_expression() {
    let world = World::new();
    world.export_local("say/0.1@myuser/testing", &[]);

    let err = resolve(
        world.session(),
        &[req("say/[>1.0]@myuser/testing")],
        UpdatePolicy::local(),
    )
    .await
    .unwrap_err();
    match err {
        GraphError::Resolve(ResolveError::Unsatisfiable { expression, name }) => {
            assert_eq!(expression, ">1.0");
            assert_eq!(name, "say");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Revisions and dirty entries
// =============================================================================

#[tokio::test]
async fn pinned_revision_missing_everywhere_is_not_found() {
    let world = World::new();
    world.export_local("say/0.1@myuser/testing", &[]);
    world.publish("say/0.1@myuser/testing", &[]);

    let err = resolve(
        world.session(),
        &[req("say/0.1@myuser/testing#deadbeef")],
        UpdatePolicy::local(),
    )
    .await
    .unwrap_err();
    match err {
        GraphError::RecipeNotFound { reference, requirer } => {
            assert_eq!(reference.revision(), Some("deadbeef"));
            assert_eq!(requirer, "root");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn dirty_export_is_retrieved_again() {
    let world = World::new();
    world.publish("say/0.1@myuser/testing", &[]);
    let say = Reference::parse("say/0.1@myuser/testing").unwrap();
    let wanted = [req("say/0.1@myuser/testing")];

    resolve(world.session(), &wanted, UpdatePolicy::local())
        .await
        .unwrap();
    let export = world.cache.layout_for(&say).export();
    fs::write(export.join("junk.txt"), "left by a crash").unwrap();
    set_dirty(&export).unwrap();

    let resolution = resolve(world.session(), &wanted, UpdatePolicy::local())
        .await
        .unwrap();
    assert_eq!(version_of(&resolution.graph, "say"), vec!["0.1"]);
    assert!(!export.join("junk.txt").exists());
    assert!(world.cache.layout_for(&say).has_recipe());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn transport_failure_aborts_the_build() {
    let dir = TempDir::new().unwrap();
    let cache = PackageCache::new(dir.path());
    let remotes = Remotes::new(vec![Remote::new("origin", "mock://")]);
    let say = Reference::parse("say/0.1@myuser/testing").unwrap();
    let mock = MockRemote::new().fail_on(FailOn::GetRecipe(RemoteError::Network("timeout".into())));
    mock.add_recipe("origin", &say, "[recipe]\n");
    let loader = TomlRecipeLoader::new();
    let session = Session::new(&cache, &remotes, &mock, &loader);

    let err = resolve(session, &[Requirement::pinned(say.clone())], UpdatePolicy::local())
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Lookup(_)));
    assert!(!cache.layout_for(&say).export().exists());
}

#[tokio::test]
async fn decision_log_survives_a_conflict() {
    let world = World::new();
    world.export_local("zlib/1.2@conan/stable", &[]);
    world.export_local("zlib/1.3@conan/stable", &[]);
    world.export_local("png/1.0@conan/stable", &["\"zlib/1.2@conan/stable\""]);
    world.export_local("ssl/1.0@conan/stable", &["\"zlib/[>=1.3]@conan/stable\""]);

    let mut builder = GraphBuilder::new(world.session(), UpdatePolicy::local());
    let err = builder
        .build(&[req("png/1.0@conan/stable"), req("ssl/1.0@conan/stable")])
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::VersionConflict { .. }));

    let log = builder.decisions();
    assert!(log.iter().any(|d| matches!(d, Decision::RangeInvalid { .. })));
    assert!(matches!(log.last(), Some(Decision::ConflictRejected { .. })));
    assert!(log.iter().all(|d| !d.requirer().is_empty()));
}

#[tokio::test]
async fn override_resolves_the_same_conflict() {
    let world = World::new();
    world.export_local("zlib/1.2@conan/stable", &[]);
    world.export_local("zlib/1.3@conan/stable", &[]);
    world.export_local("png/1.0@conan/stable", &["\"zlib/1.2@conan/stable\""]);
    world.export_local("ssl/1.0@conan/stable", &["\"zlib/[>=1.3]@conan/stable\""]);

    let resolution = resolve(
        world.session(),
        &[
            req("png/1.0@conan/stable"),
            req("ssl/1.0@conan/stable"),
            req("zlib/1.3@conan/stable").with_override(true),
        ],
        UpdatePolicy::local(),
    )
    .await
    .unwrap();

    assert_eq!(version_of(&resolution.graph, "zlib"), vec!["1.3"]);
    let zlib = resolution.graph.nodes_named("zlib")[0];
    assert_eq!(resolution.graph.dependents(zlib).len(), 3);

    let levels = resolution.graph.by_levels();
    assert!(levels[0].contains(&zlib));
}
