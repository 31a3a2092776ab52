//! Task service and stats aggregator, including owner isolation.

mod common;

use rstest::rstest;

use common::{create_test_app_state, register_user};
use task_manager_api::{
    error::AppError,
    model::{Task, TaskSummary},
    schema::{CreateTaskSchema, TaskFilterParams, UpdateTaskSchema},
    AppState,
};

fn new_task(title: &str) -> CreateTaskSchema {
    CreateTaskSchema {
        title: title.to_string(),
        ..Default::default()
    }
}

async fn create(state: &AppState, owner: &str, title: &str) -> Task {
    state.tasks.create(owner, new_task(title)).await.unwrap()
}

fn titles(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.title.as_str()).collect()
}

#[tokio::test]
async fn create_sets_owner_and_defaults() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;

    let task = create(&state, &bob.id, "Buy milk").await;

    assert_eq!(task.user_id, bob.id);
    assert!(!task.completed);
    assert!(!task.id.is_empty());
    assert_eq!(task.created_at, task.updated_at);
}

#[rstest]
#[case("")]
#[case("   ")]
#[tokio::test]
async fn create_with_empty_title_persists_nothing(#[case] title: &str) {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;

    let err = state.tasks.create(&bob.id, new_task(title)).await.unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    let tasks = state
        .tasks
        .list(&bob.id, &TaskFilterParams::default())
        .await
        .unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn create_with_bad_due_date_is_rejected() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;

    let err = state
        .tasks
        .create(
            &bob.id,
            CreateTaskSchema {
                title: "Pay rent".into(),
                due_date: Some("someday".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidParameter("dueDate")));
}

#[tokio::test]
async fn list_is_newest_first_and_empty_is_ok() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;

    let empty = state
        .tasks
        .list(&bob.id, &TaskFilterParams::default())
        .await
        .unwrap();
    assert!(empty.is_empty());

    create(&state, &bob.id, "first").await;
    create(&state, &bob.id, "second").await;
    create(&state, &bob.id, "third").await;

    let tasks = state
        .tasks
        .list(&bob.id, &TaskFilterParams::default())
        .await
        .unwrap();
    assert_eq!(titles(&tasks), vec!["third", "second", "first"]);
}

#[tokio::test]
async fn list_filters_by_status() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;
    let done = create(&state, &bob.id, "done").await;
    create(&state, &bob.id, "open").await;
    state
        .tasks
        .set_completion(&bob.id, &done.id, true)
        .await
        .unwrap();

    let status = |value: &str| TaskFilterParams {
        status: Some(value.to_string()),
        ..Default::default()
    };
    let completed = state.tasks.list(&bob.id, &status("completed")).await.unwrap();
    let pending = state.tasks.list(&bob.id, &status("pending")).await.unwrap();
    let other = state.tasks.list(&bob.id, &status("whatever")).await.unwrap();

    assert_eq!(titles(&completed), vec!["done"]);
    assert_eq!(titles(&pending), vec!["open"]);
    assert_eq!(other.len(), 2);
}

#[tokio::test]
async fn list_filters_by_priority_search_and_due_date() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;
    state
        .tasks
        .create(
            &bob.id,
            CreateTaskSchema {
                title: "Buy MILK".into(),
                priority: Some("high".into()),
                due_date: Some("2024-05-01".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    state
        .tasks
        .create(
            &bob.id,
            CreateTaskSchema {
                title: "100% done report".into(),
                priority: Some("low".into()),
                due_date: Some("2024-05-02".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let by_priority = state
        .tasks
        .list(
            &bob.id,
            &TaskFilterParams {
                priority: Some("high".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(titles(&by_priority), vec!["Buy MILK"]);

    let by_search = state
        .tasks
        .list(
            &bob.id,
            &TaskFilterParams {
                search: Some("milk".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(titles(&by_search), vec!["Buy MILK"]);

    // Wildcard characters are matched literally
    let by_percent = state
        .tasks
        .list(
            &bob.id,
            &TaskFilterParams {
                search: Some("%".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(titles(&by_percent), vec!["100% done report"]);

    let by_due = state
        .tasks
        .list(
            &bob.id,
            &TaskFilterParams {
                due_date: Some("2024-05-02T00:00:00Z".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(titles(&by_due), vec!["100% done report"]);
}

#[tokio::test]
async fn list_with_unparseable_due_date_fails() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;

    let err = state
        .tasks
        .list(
            &bob.id,
            &TaskFilterParams {
                due_date: Some("31/12/2024".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidParameter("dueDate")));
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;
    let task = state
        .tasks
        .create(
            &bob.id,
            CreateTaskSchema {
                title: "Buy milk".into(),
                description: Some("2 litres".into()),
                priority: Some("low".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let updated = state
        .tasks
        .update(
            &bob.id,
            &task.id,
            UpdateTaskSchema {
                priority: Some("high".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.id, task.id);
    assert_eq!(updated.title, "Buy milk");
    assert_eq!(updated.description.as_deref(), Some("2 litres"));
    assert_eq!(updated.priority.as_deref(), Some("high"));
    assert!(!updated.completed);
    assert!(updated.updated_at >= task.updated_at);
}

#[tokio::test]
async fn update_rejects_blank_title() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;
    let task = create(&state, &bob.id, "Buy milk").await;

    let err = state
        .tasks
        .update(
            &bob.id,
            &task.id,
            UpdateTaskSchema {
                title: Some(" ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    let unchanged = state.tasks.get(&bob.id, &task.id).await.unwrap();
    assert_eq!(unchanged.title, "Buy milk");
}

#[tokio::test]
async fn delete_twice_reports_not_found() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;
    let task = create(&state, &bob.id, "Buy milk").await;

    state.tasks.delete(&bob.id, &task.id).await.unwrap();
    let second = state.tasks.delete(&bob.id, &task.id).await;
    let fetch = state.tasks.get(&bob.id, &task.id).await;

    assert!(matches!(second, Err(AppError::NotFound("task"))));
    assert!(matches!(fetch, Err(AppError::NotFound("task"))));
}

#[tokio::test]
async fn other_users_tasks_are_indistinguishable_from_missing_ones() {
    let state = create_test_app_state().await;
    let alice = register_user(&state, "alice").await;
    let mallory = register_user(&state, "mallory").await;
    let task = create(&state, &alice.id, "alice's secret").await;

    let get = state.tasks.get(&mallory.id, &task.id).await;
    let update = state
        .tasks
        .update(
            &mallory.id,
            &task.id,
            UpdateTaskSchema {
                title: Some("pwned".into()),
                ..Default::default()
            },
        )
        .await;
    let toggle = state.tasks.set_completion(&mallory.id, &task.id, true).await;
    let delete = state.tasks.delete(&mallory.id, &task.id).await;
    let listed = state
        .tasks
        .list(&mallory.id, &TaskFilterParams::default())
        .await
        .unwrap();

    assert!(matches!(get, Err(AppError::NotFound("task"))));
    assert!(matches!(update, Err(AppError::NotFound("task"))));
    assert!(matches!(toggle, Err(AppError::NotFound("task"))));
    assert!(matches!(delete, Err(AppError::NotFound("task"))));
    assert!(listed.is_empty());

    let untouched = state.tasks.get(&alice.id, &task.id).await.unwrap();
    assert_eq!(untouched.title, "alice's secret");
    assert!(!untouched.completed);
}

#[rstest]
#[case(0, 0)]
#[case(3, 0)]
#[case(3, 2)]
#[case(5, 5)]
#[tokio::test]
async fn summary_partitions_total(#[case] created: usize, #[case] finished: usize) {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;
    let other = register_user(&state, "carol").await;
    create(&state, &other.id, "not bob's").await;

    for index in 0..created {
        let task = create(&state, &bob.id, &format!("task {index}")).await;
        if index < finished {
            state
                .tasks
                .set_completion(&bob.id, &task.id, true)
                .await
                .unwrap();
        }
    }

    let summary = state.stats.summary(&bob.id).await.unwrap();

    assert_eq!(
        summary,
        TaskSummary {
            total: created as i64,
            completed: finished as i64,
            pending: (created - finished) as i64,
        }
    );
    assert_eq!(summary.completed + summary.pending, summary.total);
}

#[tokio::test]
async fn search_ignores_case_beyond_ascii() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;
    create(&state, &bob.id, "ÄPFEL kaufen").await;
    create(&state, &bob.id, "Birnen kaufen").await;

    let found = state
        .tasks
        .list(
            &bob.id,
            &TaskFilterParams {
                search: Some("äpfel".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(titles(&found), vec!["ÄPFEL kaufen"]);
}

#[tokio::test]
async fn summary_stays_consistent_under_concurrent_writes() {
    let state = create_test_app_state().await;
    let bob = register_user(&state, "bob").await;
    let seed = create(&state, &bob.id, "seed").await;

    let writer = async {
        for index in 0..20 {
            let task = create(&state, &bob.id, &format!("task {index}")).await;
            state
                .tasks
                .set_completion(&bob.id, &task.id, index % 2 == 0)
                .await
                .unwrap();
            state
                .tasks
                .set_completion(&bob.id, &seed.id, index % 3 == 0)
                .await
                .unwrap();
            tokio::task::yield_now().await;
        }
    };
    let reader = async {
        let mut summaries = Vec::new();
        for _ in 0..40 {
            summaries.push(state.stats.summary(&bob.id).await.unwrap());
            tokio::task::yield_now().await;
        }
        summaries
    };

    let ((), summaries) = tokio::join!(writer, reader);

    for summary in summaries {
        assert_eq!(summary.completed + summary.pending, summary.total);
    }
    let last = state.stats.summary(&bob.id).await.unwrap();
    assert_eq!(last.total, 21);
}
