mod common;

use common::{memory_planner, planners, status_names};
use sokoke_core::{BackendFamily, ConfigError, SokokeConfig};
use sokoke_data::{DataError, Ref, SearchSpec, TextSearch};
use sokoke_planner::{
    FeatureChanges, NewFeature, NewStatus, NewTask, Planner, StartupError, StatusChanges, Task,
};

#[tokio::test]
async fn create_then_read_round_trips() {
    for (backend, planner) in planners().await {
        let status = planner
            .statuses()
            .create(NewStatus::new("In progress", "Being worked on"))
            .await;
        assert!(status.is_success(), "{backend}: {}", status.message());
        assert_eq!(status.message(), "Status created");
        let status = status.into_result().unwrap();

        let created = planner
            .features()
            .create(NewFeature::new("Dark mode", "Theme switch").with_status(&status.id))
            .await
            .into_result()
            .unwrap();
        assert_eq!(
            created.status.as_ref().and_then(|s| s.populated()),
            Some(&status),
            "{backend}"
        );

        let read = planner.features().read(&created.id).await;
        assert_eq!(read.message(), "Feature found");
        assert_eq!(read.data(), Some(&created), "{backend}");
    }
}

#[tokio::test]
async fn update_and_delete_report_the_changed_record() {
    for (backend, planner) in planners().await {
        let created = planner
            .features()
            .create(NewFeature::new("Search", "Full text"))
            .await
            .into_result()
            .unwrap();

        let updated = planner
            .features()
            .update(
                &created.id,
                FeatureChanges {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(updated.message(), "Feature updated");
        let updated = updated.into_result().unwrap();
        assert!(updated.completed, "{backend}");
        assert_eq!(updated.name, "Search");
        assert_eq!(updated.created_at, created.created_at);

        let deleted = planner.features().delete(&created.id).await;
        assert_eq!(deleted.message(), "Feature deleted");
        assert_eq!(deleted.data().map(|f| f.id.as_str()), Some(created.id.as_str()));

        let missing = planner.features().read(&created.id).await;
        assert!(missing.is_error(), "{backend}");
        assert!(matches!(missing.error(), Some(DataError::NotFound(_))), "{backend}");
    }
}

#[tokio::test]
async fn missing_ids_are_wrapped_not_raised() {
    for (backend, planner) in planners().await {
        let result = planner
            .statuses()
            .update("does-not-exist", StatusChanges::default())
            .await;
        assert!(result.is_error(), "{backend}");
        assert!(result.message().contains("Status"), "{backend}");
        assert!(result.data().is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("data").is_none());
    }
}

#[tokio::test]
async fn empty_search_is_a_success() {
    for (backend, planner) in planners().await {
        let spec = SearchSpec::new().search(TextSearch::new("nothing").in_fields(&["name"]));
        let result = planner.statuses().read_all(Some(&spec)).await;
        assert!(result.is_success(), "{backend}");
        assert_eq!(result.message(), "Statuses found");
        assert!(result.data().unwrap().is_empty());
        assert_eq!(result.metadata().unwrap().total, 0);
    }
}

#[tokio::test]
async fn searches_default_to_text_fields() {
    let planner = common::sqlite_planner().await;
    for (name, description) in [("Todo", "Not started"), ("Doing", "Started"), ("Done", "Shipped")] {
        planner
            .statuses()
            .create(NewStatus::new(name, description))
            .await
            .into_result()
            .unwrap();
    }
    let spec = SearchSpec::new()
        .search(TextSearch::new("START"))
        .sort_by("name", sokoke_data::SortOrder::Asc);
    let result = planner.statuses().read_all(Some(&spec)).await;
    assert_eq!(status_names(result.data().unwrap()), vec!["Doing", "Todo"]);
}

#[tokio::test]
async fn relations_populate_on_request_in_document_searches() {
    let planner = memory_planner();
    let status = planner
        .statuses()
        .create(NewStatus::new("Blocked", "Waiting"))
        .await
        .into_result()
        .unwrap();
    planner
        .features()
        .create(NewFeature::new("Billing", "Invoices").with_status(&status.id))
        .await
        .into_result()
        .unwrap();

    let plain = planner.features().read_all(None).await.into_result().unwrap();
    assert_eq!(plain[0].status, Some(Ref::Id(status.id.clone())));

    let spec = SearchSpec::new().populate(&["status"]);
    let populated = planner.features().read_all(Some(&spec)).await.into_result().unwrap();
    assert_eq!(populated[0].status.as_ref().and_then(|s| s.populated()), Some(&status));
}

#[tokio::test]
async fn joined_statuses_are_always_populated_in_relational_searches() {
    let planner = common::sqlite_planner().await;
    let status = planner
        .statuses()
        .create(NewStatus::new("Review", "Awaiting review"))
        .await
        .into_result()
        .unwrap();
    planner
        .features()
        .create(NewFeature::new("Audit log", "History").with_status(&status.id))
        .await
        .into_result()
        .unwrap();
    planner
        .features()
        .create(NewFeature::new("Orphan", "No status"))
        .await
        .into_result()
        .unwrap();

    let items = planner.features().read_all(None).await.into_result().unwrap();
    let audit = items.iter().find(|f| f.name == "Audit log").unwrap();
    assert_eq!(audit.status.as_ref().and_then(|s| s.populated()), Some(&status));
    let orphan = items.iter().find(|f| f.name == "Orphan").unwrap();
    assert_eq!(orphan.status, None);
}

#[tokio::test]
async fn feature_tasks_load_through_the_to_many_relation() {
    for (backend, planner) in planners().await {
        let features = planner.features();
        let billing = features
            .create(NewFeature::new("Billing", "Invoices"))
            .await
            .into_result()
            .unwrap();
        assert_eq!(billing.tasks, Some(Vec::new()), "{backend}");

        let search = features
            .create(NewFeature::new("Search", "Full text"))
            .await
            .into_result()
            .unwrap();
        let mut billing_tasks: Vec<Task> = Vec::new();
        for name in ["Draft invoice", "Send reminder"] {
            let task = planner
                .tasks()
                .create(NewTask::new(name, "").for_feature(&billing.id))
                .await
                .into_result()
                .unwrap();
            billing_tasks.push(task);
        }
        planner
            .tasks()
            .create(NewTask::new("Index docs", "").for_feature(&search.id))
            .await
            .into_result()
            .unwrap();
        billing_tasks.sort_by(|a, b| a.id.cmp(&b.id));

        let read = features.read(&billing.id).await.into_result().unwrap();
        assert_eq!(read.tasks.as_ref(), Some(&billing_tasks), "{backend}");

        let plain = features.read_all(None).await.into_result().unwrap();
        assert!(plain.iter().all(|f| f.tasks.is_none()), "{backend}");

        // One feature per page: children never inflate the owner count.
        let spec = SearchSpec::new()
            .populate(&["tasks"])
            .sort_by("name", sokoke_data::SortOrder::Asc)
            .paginate(1, 1);
        let page = features.read_all(Some(&spec)).await;
        assert_eq!(page.metadata().unwrap().total, 2, "{backend}");
        let items = page.data().unwrap();
        assert_eq!(items.len(), 1, "{backend}");
        assert_eq!(items[0].name, "Billing");
        assert_eq!(items[0].tasks.as_ref(), Some(&billing_tasks), "{backend}");

        let spec = SearchSpec::new().populate(&["tasks"]).filter("name", "Search");
        let items = features.read_all(Some(&spec)).await.into_result().unwrap();
        let names: Vec<&str> = items[0]
            .tasks
            .iter()
            .flatten()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["Index docs"], "{backend}");
    }
}

#[tokio::test]
async fn unknown_persistence_is_fatal_at_startup() {
    let config = SokokeConfig::from_yaml_str("persistence: cassandra\n", "test").unwrap();
    let err = Planner::start(&config).await.unwrap_err();
    assert!(matches!(err, StartupError::Config(ConfigError::Invalid { .. })));
}

#[tokio::test]
async fn sqlite_persistence_starts_from_configuration() {
    let config = SokokeConfig::from_yaml_str(
        "persistence: sqlite\nsqlite:\n  path: \":memory:\"\nsql:\n  pool:\n    size: 1\n",
        "test",
    )
    .unwrap();
    let planner = Planner::start(&config).await.unwrap();
    assert_eq!(planner.backend().family(), BackendFamily::Relational);
    assert!(planner.bindings().contains("Status"));
    assert!(planner.bindings().contains("Feature"));
    assert!(planner.bindings().contains("Task"));
    assert!(planner.bindings().repository::<sokoke_planner::Feature>().is_some());
    planner.shutdown().await;
}
