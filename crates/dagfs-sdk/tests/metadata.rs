//! Metadata edits rebuild ancestors and are reversible.

mod common;

use dagfs_sdk::{
    AddMetaOptions, AddOptions, Context, FileTree, GetError, MetaError, RemoveMetaOptions,
    SdkError,
};

#[tokio::test]
async fn add_then_remove_restores_root() {
    let node = common::setup();
    let ctx = Context::background();
    let tree = FileTree::directory([
        (
            "photos",
            FileTree::directory([("cat.jpg", FileTree::file(common::random_bytes(400_000, 9)))]),
        ),
        ("notes.txt", FileTree::file("notes")),
    ]);
    let added = node
        .api
        .unixfs()
        .add(&ctx, tree, &AddOptions::default())
        .await
        .unwrap();
    let path = added.content().join_all(["photos", "cat.jpg"]).unwrap();
    let before = node.store.len();

    let blob = serde_json::to_vec(&serde_json::json!({ "camera": "pinhole" })).unwrap();
    let edited = node
        .api
        .unixfs()
        .add_metadata(
            &ctx,
            &path,
            blob.clone(),
            AddMetaOptions {
                pin: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_ne!(edited.root(), added.cid());
    // New file root, new "photos" directory, new root directory.
    assert_eq!(node.store.len(), before + 3);
    assert_eq!(
        node.api.unixfs().get_metadata(&ctx, edited.content()).await.unwrap(),
        blob
    );

    // The file bytes are shared with the original.
    let old_bytes = common::read_file(
        node.api
            .unixfs()
            .get(&ctx, &path, Default::default())
            .await
            .unwrap(),
    )
    .await;
    let new_bytes = common::read_file(
        node.api
            .unixfs()
            .get(&ctx, edited.content(), Default::default())
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(old_bytes, new_bytes);

    let restored = node
        .api
        .unixfs()
        .remove_metadata(&ctx, edited.content(), RemoveMetaOptions::default())
        .await
        .unwrap();
    assert_eq!(restored.root(), added.cid());
    assert_eq!(node.store.len(), before + 3);
}

#[tokio::test]
async fn edits_surface_typed_errors() {
    let node = common::setup();
    let ctx = Context::background();
    let added = node
        .api
        .unixfs()
        .add(
            &ctx,
            FileTree::directory([("f", FileTree::file("body"))]),
            &AddOptions::default(),
        )
        .await
        .unwrap();
    let path = added.content().join("f").unwrap();
    let unixfs = node.api.unixfs();

    let missing = unixfs.get_metadata(&ctx, &path).await.map_err(SdkError::from);
    assert!(matches!(missing, Err(SdkError::Get(GetError::NoMetadata { .. }))));

    let removed = unixfs
        .remove_metadata(&ctx, &path, RemoveMetaOptions::default())
        .await;
    assert!(matches!(removed, Err(MetaError::NoMetadata { .. })));

    let first = unixfs
        .add_metadata(&ctx, &path, b"1".to_vec(), AddMetaOptions::default())
        .await
        .unwrap();
    let again = unixfs
        .add_metadata(&ctx, first.content(), b"2".to_vec(), AddMetaOptions::default())
        .await;
    assert!(matches!(again, Err(MetaError::MetadataExists { .. })));

    let dir = unixfs
        .add_metadata(&ctx, added.content(), b"x".to_vec(), AddMetaOptions::default())
        .await;
    assert!(matches!(dir, Err(MetaError::Resolve(_))));
}
