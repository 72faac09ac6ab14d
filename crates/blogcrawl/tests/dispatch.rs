mod common;

use std::sync::Arc;

use blogcrawl_engine::{
    ConfigurationError, CrawlError, FsIndexStore, IndexLoadError, IndexStore, Target,
    TargetConfig, TargetVariant,
};
use pipeline_common::{CancellationToken, RuntimeControls};

use common::{CountingStore, FakeFactory, FakeSite, config, dispatcher};

fn controls() -> RuntimeControls {
    RuntimeControls::detached(CancellationToken::new())
}

#[test]
fn test_queue_count_per_variant() {
    let dir = tempfile::tempdir().unwrap();
    let factory = FakeFactory::new(FakeSite::new());
    let dispatcher = dispatcher(
        config(dir.path()),
        Arc::new(CountingStore::default()),
        factory.clone(),
    );

    for (variant, name, queues) in [
        ("public-blog", "staff", 2),
        ("private-blog", "hidden", 2),
        ("liked-feed", "staff", 1),
        ("search-results", "cats", 1),
        ("tag-search-results", "cats", 1),
    ] {
        let pipeline = dispatcher
            .assemble_config(&TargetConfig::new(name, variant), &controls())
            .unwrap();
        assert_eq!(pipeline.queue_count(), queues, "{variant}");
        assert_eq!(pipeline.variant().queue_count(), queues);
        assert_eq!(pipeline.variant().as_str(), variant);
    }
    assert_eq!(factory.created(), 5);
    // Assembly never issues requests.
    assert!(factory.site.requests().is_empty());
}

#[test]
fn test_unknown_variant_fails_before_any_io() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CountingStore::default());
    let factory = FakeFactory::new(FakeSite::new());
    let dispatcher = dispatcher(config(dir.path()), store.clone(), factory.clone());

    let err = dispatcher
        .assemble_config(&TargetConfig::new("staff", "tumblr-archive"), &controls())
        .unwrap_err();
    assert!(matches!(
        err,
        CrawlError::Configuration(ConfigurationError::UnsupportedTarget(ref v)) if v == "tumblr-archive"
    ));

    let err = dispatcher
        .assemble_config(
            &TargetConfig::new("staff", "public-blog").with_metadata_format("xml"),
            &controls(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CrawlError::Configuration(ConfigurationError::UnsupportedFormat(_))
    ));

    assert_eq!(store.reads(), 0);
    assert_eq!(factory.created(), 0);
}

#[test]
fn test_corrupt_index_fails_before_transport() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = dir.path().join("indices");
    let store = Arc::new(FsIndexStore::new(&index_dir));
    std::fs::create_dir_all(&index_dir).unwrap();
    std::fs::write(
        store.path_for("staff", TargetVariant::PublicBlog),
        "{ not json",
    )
    .unwrap();

    let factory = FakeFactory::new(FakeSite::new());
    let dispatcher = dispatcher(config(dir.path()), store, factory.clone());
    let err = dispatcher
        .assemble_config(&TargetConfig::new("staff", "public-blog"), &controls())
        .unwrap_err();
    assert!(matches!(
        err,
        CrawlError::IndexLoad(IndexLoadError::Corrupt { .. })
    ));
    assert_eq!(factory.created(), 0);
}

#[test]
fn test_load_all_uses_registry_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CountingStore::default());
    let target = Target::from_config(&TargetConfig::new("staff", "liked-feed")).unwrap();
    let mut index = blogcrawl_engine::Index::for_target(&target);
    index.insert(
        "a.jpg",
        blogcrawl_engine::IndexEntry {
            file_name: "a.jpg".into(),
            kind: blogcrawl_engine::ContentKind::Photo,
        },
    );
    store.write_index(&index).unwrap();

    let factory = FakeFactory::new(FakeSite::new());
    let dispatcher = dispatcher(
        config(dir.path()).with_load_all_indices(true),
        store.clone(),
        factory,
    );
    let reads_after_registry = store.reads();

    dispatcher.assemble(&target, &controls()).unwrap();
    dispatcher
        .assemble_config(&TargetConfig::new("unseen", "liked-feed"), &controls())
        .unwrap();
    assert_eq!(store.reads(), reads_after_registry);
}

#[test]
fn test_invalid_crawler_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = blogcrawl_engine::Dispatcher::new(
        config(dir.path()).with_page_size(0),
        blogcrawl_engine::IndexLoader::per_target(Arc::new(CountingStore::default())),
        FakeFactory::new(FakeSite::new()),
    );
    assert!(matches!(
        result,
        Err(CrawlError::Configuration(ConfigurationError::InvalidSetting { key: "page_size", .. }))
    ));
}

#[test]
fn test_target_is_claimed_until_pipeline_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CountingStore::default());
    let factory = FakeFactory::new(FakeSite::new());
    let dispatcher = dispatcher(config(dir.path()), store.clone(), factory.clone());
    let staff_likes = TargetConfig::new("staff", "liked-feed");

    let first = dispatcher.assemble_config(&staff_likes, &controls()).unwrap();
    let err = dispatcher.assemble_config(&staff_likes, &controls()).unwrap_err();
    assert!(matches!(
        err,
        CrawlError::TargetBusy { ref name, variant: TargetVariant::LikedFeed } if name == "staff"
    ));
    // A refused claim does no index or transport work.
    assert_eq!(store.reads(), 1);
    assert_eq!(factory.created(), 1);

    // Another variant of the same name is a different target.
    dispatcher
        .assemble_config(&TargetConfig::new("staff", "public-blog"), &controls())
        .unwrap();

    drop(first);
    dispatcher.assemble_config(&staff_likes, &controls()).unwrap();
}
