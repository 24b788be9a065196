//! Integration tests for the package cache lifecycle.
//!
//! Export a recipe, register binaries, promote it to another channel, and
//! download it into a second cache that uses the first as a file remote.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use stowage::core::cache::PackageCache;
use stowage::core::metadata::schema::PackageStatus;
use stowage::core::metadata::store::StoreError;
use stowage::core::ops::{is_dirty, set_dirty};
use stowage::core::reference::Reference;
use stowage::engine::{
    complete_sources, config_source, copy_package, download, export_recipe, register_package,
    PackageSelection, Session, SourceConfig, SourceError, SourcesOutcome,
};
use stowage::recipe::TomlRecipeLoader;
use stowage::remote::{FileRemoteManager, Remote, Remotes};

// =============================================================================
// Test Fixtures
// =============================================================================

struct Fixture {
    dir: TempDir,
    manager: FileRemoteManager,
    loader: TomlRecipeLoader,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            manager: FileRemoteManager::new(),
            loader: TomlRecipeLoader::new(),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// A recipe folder with one exported file and bundled sources.
    fn recipe_folder(&self) -> PathBuf {
        let work = self.path("work");
        write(
            &work,
            "recipe.toml",
            "[recipe]\nexports = [\"LICENSE\"]\nexports_sources = [\"src/*\"]\n",
        );
        write(&work, "LICENSE", "MIT");
        write(&work, "src/say.c", "void say() {}");
        write(&work, "src/say.h", "void say();");
        work
    }

    fn built_folder(&self, name: &str) -> PathBuf {
        let built = self.path(name);
        write(&built, "lib/libsay.a", name);
        write(&built, "include/say.h", "void say();");
        built
    }
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn say() -> Reference {
    Reference::parse("say/0.1@lasote/testing").unwrap()
}

fn stable() -> Reference {
    Reference::parse("say/0.1@lasote/stable").unwrap()
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn export_register_promote_download() {
    let fx = Fixture::new();
    let origin = PackageCache::new(fx.path("origin"));
    let no_remotes = Remotes::default();
    let session = Session::new(&origin, &no_remotes, &fx.manager, &fx.loader);

    let exported = export_recipe(&session, &fx.recipe_folder(), &say(), None).unwrap();
    let p1 = register_package(&session, &say(), "p1", &fx.built_folder("build1")).unwrap();
    register_package(&session, &say(), "p2", &fx.built_folder("build2")).unwrap();

    let yes = |_: &str| true;
    let copied = copy_package(
        &session,
        &say(),
        "lasote",
        "stable",
        &PackageSelection::All,
        false,
        &yes,
    )
    .await
    .unwrap();
    assert_eq!(copied.packages_copied, vec!["p1", "p2"]);

    let promoted = origin.metadata(&stable()).load().unwrap();
    assert_eq!(promoted.recipe.revision.as_deref(), exported.reference.revision());
    assert_eq!(promoted.packages["p1"].revision.as_deref(), p1.revision());
    assert_eq!(promoted.package_status("p1"), PackageStatus::Current);

    // A second cache downloads the promoted reference from the first one.
    let consumer = PackageCache::new(fx.path("consumer"));
    let remotes = Remotes::new(vec![Remote::new(
        "origin",
        fx.path("origin").to_string_lossy().into_owned(),
    )]);
    let session = Session::new(&consumer, &remotes, &fx.manager, &fx.loader);
    let report = download(&session, &stable(), "origin", Some(vec!["p2".into()]), false)
        .await
        .unwrap();

    assert_eq!(report.reference.revision(), exported.reference.revision());
    assert_eq!(
        report.sources,
        SourcesOutcome::Fetched {
            remote: "origin".into()
        }
    );
    assert_eq!(report.packages.len(), 1);

    let paths = consumer.layout_for(&stable());
    assert!(paths.export().join("LICENSE").exists());
    assert!(paths.export_sources().join("src/say.c").exists());
    assert!(paths.package("p2").join("lib/libsay.a").exists());
    assert!(!paths.package("p1").exists());
    let meta = consumer.metadata(&stable()).load().unwrap();
    assert_eq!(meta.recipe.remote.as_deref(), Some("origin"));
    assert_eq!(meta.package_status("p2"), PackageStatus::Current);
}

#[tokio::test]
async fn sources_come_back_after_removal() {
    let fx = Fixture::new();
    let origin = PackageCache::new(fx.path("origin"));
    let no_remotes = Remotes::default();
    let publisher = Session::new(&origin, &no_remotes, &fx.manager, &fx.loader);
    export_recipe(&publisher, &fx.recipe_folder(), &say(), None).unwrap();

    let consumer = PackageCache::new(fx.path("consumer"));
    let remotes = Remotes::new(vec![Remote::new(
        "origin",
        fx.path("origin").to_string_lossy().into_owned(),
    )]);
    let session = Session::new(&consumer, &remotes, &fx.manager, &fx.loader);
    download(&session, &say(), "origin", None, true).await.unwrap();

    let sources = consumer.layout_for(&say()).export_sources();
    fs::remove_dir_all(&sources).unwrap();
    let outcome = complete_sources(&session, &say()).await.unwrap();
    assert!(matches!(outcome, SourcesOutcome::Fetched { .. }));
    assert!(sources.join("src/say.h").exists());

    let again = complete_sources(&session, &say()).await.unwrap();
    assert_eq!(again, SourcesOutcome::AlreadyPresent);

    // Without the remote the sources cannot be recovered.
    fs::remove_dir_all(&sources).unwrap();
    let orphaned = Session::new(&consumer, &no_remotes, &fx.manager, &fx.loader);
    let err = complete_sources(&orphaned, &say()).await.unwrap_err();
    assert!(matches!(err, SourceError::SourceUnavailable(_)));
    assert!(!sources.exists());
}

#[tokio::test]
async fn working_folder_is_rebuilt_when_dirty() {
    let fx = Fixture::new();
    let cache = PackageCache::new(fx.path("cache"));
    let remotes = Remotes::default();
    let session = Session::new(&cache, &remotes, &fx.manager, &fx.loader);
    export_recipe(&session, &fx.recipe_folder(), &say(), None).unwrap();

    let built = config_source(&session, &say()).await.unwrap();
    assert!(matches!(built, SourceConfig::Built(_)));
    assert!(built.path().join("src/say.c").exists());
    assert!(built.path().join("LICENSE").exists());

    let reused = config_source(&session, &say()).await.unwrap();
    assert!(matches!(reused, SourceConfig::Reused(_)));

    write(built.path(), "stale.o", "junk");
    set_dirty(built.path()).unwrap();
    let rebuilt = config_source(&session, &say()).await.unwrap();
    assert!(matches!(rebuilt, SourceConfig::Built(_)));
    assert!(!rebuilt.path().join("stale.o").exists());
    assert!(!is_dirty(rebuilt.path()));
}

// =============================================================================
// Metadata
// =============================================================================

#[test]
fn failed_metadata_update_keeps_previous_bytes() {
    let fx = Fixture::new();
    let cache = PackageCache::new(fx.path("cache"));
    let store = cache.metadata(&say());
    store
        .update(|meta| -> Result<(), StoreError> {
            meta.recipe.revision = Some("r1".into());
            meta.record_package("p1", "b1", "r1");
            Ok(())
        })
        .unwrap();
    let before = fs::read(store.path()).unwrap();

    #[derive(Debug)]
    enum Aborted {
        Store,
        Halfway,
    }
    impl From<StoreError> for Aborted {
        fn from(_: StoreError) -> Self {
            Aborted::Store
        }
    }

    let result = store.update(|meta| -> Result<(), Aborted> {
        meta.recipe.revision = Some("r2".into());
        meta.packages.clear();
        Err(Aborted::Halfway)
    });
    assert!(matches!(result, Err(Aborted::Halfway)));
    assert_eq!(fs::read(store.path()).unwrap(), before);

    let meta = store.load().unwrap();
    assert_eq!(meta.recipe.revision.as_deref(), Some("r1"));
    assert_eq!(meta.package_status("p1"), PackageStatus::Current);
}

#[test]
fn staging_folders_are_invisible_to_searches() {
    let fx = Fixture::new();
    let cache = PackageCache::new(fx.path("cache"));
    let remotes = Remotes::default();
    let session = Session::new(&cache, &remotes, &fx.manager, &fx.loader);
    export_recipe(&session, &fx.recipe_folder(), &say(), None).unwrap();
    fs::create_dir_all(fx.path("cache/say/.0.2.tmp-1/lasote/testing/export")).unwrap();

    let found = cache.search_references("say", None, None).unwrap();
    assert_eq!(found, vec![say()]);
    assert_eq!(cache.list_packages(&say()).unwrap(), Vec::<String>::new());
}
