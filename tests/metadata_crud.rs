mod support;

use colmeta::{
    config::TableNames, MemoryStore, MetadataError, MetadataStores, TaskDef, WorkflowDef,
};
use std::{collections::BTreeSet, sync::Arc};
use support::{memory_stores, workflow_def_crud_scenario};

#[tokio::test]
async fn workflow_def_crud() {
    workflow_def_crud_scenario(&memory_stores()).await;
}

#[tokio::test]
async fn workflow_def_crud_without_conditional_writes() {
    let stores = MetadataStores::new(
        Arc::new(MemoryStore::without_conditional_writes()),
        &TableNames::default(),
    );
    workflow_def_crud_scenario(&stores).await;
}

#[tokio::test]
async fn latest_version_tracks_removals_down_to_empty() {
    let stores = memory_stores();
    let defs = &stores.workflow_defs;
    defs.create(&WorkflowDef::new("wf", 1)).await.unwrap();
    defs.create(&WorkflowDef::new("wf", 2)).await.unwrap();
    assert_eq!(defs.get_latest("wf").await.unwrap().map(|d| d.version), Some(2));

    defs.remove("wf", 2).await.unwrap();
    assert_eq!(defs.get_latest("wf").await.unwrap().map(|d| d.version), Some(1));

    defs.remove("wf", 1).await.unwrap();
    assert_eq!(defs.get_latest("wf").await.unwrap(), None);
    assert!(defs.versions("wf").await.unwrap().is_empty());
}

#[tokio::test]
async fn get_all_returns_exactly_the_live_keys() {
    let stores = memory_stores();
    let defs = &stores.workflow_defs;
    for (name, version) in [("a", 1), ("a", 2), ("a", 3), ("b", 1), ("c", 7)] {
        defs.create(&WorkflowDef::new(name, version)).await.unwrap();
    }
    defs.remove("a", 2).await.unwrap();
    defs.remove("c", 7).await.unwrap();
    // removing twice is a no-op
    assert!(!defs.remove("c", 7).await.unwrap());

    let keys: BTreeSet<(String, u32)> = defs
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|d| (d.name, d.version))
        .collect();
    let expected: BTreeSet<(String, u32)> = [("a", 1), ("a", 3), ("b", 1)]
        .into_iter()
        .map(|(n, v)| (n.to_string(), v))
        .collect();
    assert_eq!(keys, expected);
    assert_eq!(defs.get_latest("c").await.unwrap(), None);
}

#[tokio::test]
async fn versions_are_independent_per_name() {
    let stores = memory_stores();
    let defs = &stores.workflow_defs;
    defs.create(&WorkflowDef::new("a", 4)).await.unwrap();
    defs.create(&WorkflowDef::new("b", 9)).await.unwrap();

    assert_eq!(defs.get_latest("a").await.unwrap().map(|d| d.version), Some(4));
    assert_eq!(defs.versions("b").await.unwrap(), vec![9]);
    assert_eq!(defs.get("a", 9).await.unwrap(), None);
}

#[tokio::test]
async fn update_upserts_missing_version() {
    let stores = memory_stores();
    let defs = &stores.workflow_defs;
    defs.create(&WorkflowDef::new("wf", 1)).await.unwrap();
    defs.update(&WorkflowDef::new("wf", 3)).await.unwrap();

    assert_eq!(defs.versions("wf").await.unwrap(), vec![1, 3]);
    assert_eq!(defs.get_latest("wf").await.unwrap().map(|d| d.version), Some(3));
}

#[tokio::test]
async fn create_validates_before_writing() {
    let stores = memory_stores();
    let err = stores
        .workflow_defs
        .create(&WorkflowDef::new("wf", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, MetadataError::Validation(_)));
    assert!(stores.workflow_defs.get_all().await.unwrap().is_empty());
    assert!(stores.workflow_defs.versions("wf").await.unwrap().is_empty());
}

#[tokio::test]
async fn task_def_crud() {
    let stores = memory_stores();
    let tasks = &stores.task_defs;

    assert!(tasks.get_all().await.unwrap().is_empty());

    let mut task1 = TaskDef::new("task1");
    tasks.create(&task1).await.unwrap();
    assert_eq!(tasks.get_all().await.unwrap().len(), 1);
    assert_eq!(tasks.get("task1").await.unwrap(), Some(task1.clone()));

    tasks.create(&TaskDef::new("task2")).await.unwrap();
    assert_eq!(tasks.get_all().await.unwrap().len(), 2);

    task1.owner_email = Some("juni@test.com".to_string());
    tasks.update(&task1).await.unwrap();
    assert_eq!(tasks.get("task1").await.unwrap(), Some(task1));

    assert!(tasks.remove("task2").await.unwrap());
    assert_eq!(tasks.get_all().await.unwrap().len(), 1);
    assert_eq!(tasks.get("task2").await.unwrap(), None);
}

#[tokio::test]
async fn concurrent_creates_of_one_version_admit_a_single_winner() {
    let stores = memory_stores();
    let mut tasks = Vec::new();
    for i in 0..8 {
        let defs = stores.workflow_defs.clone();
        tasks.push(tokio::spawn(async move {
            let mut def = WorkflowDef::new("race", 1);
            def.description = Some(format!("writer {}", i));
            defs.create(&def).await
        }));
    }

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => winners += 1,
            Err(MetadataError::AlreadyExists { name, version }) => {
                assert_eq!((name.as_str(), version), ("race", 1));
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(stores.workflow_defs.versions("race").await.unwrap(), vec![1]);
}
