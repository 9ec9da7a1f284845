// ABOUTME: Integration tests verifying modules work together.
// ABOUTME: Exercises agents, tools, runs and multi-agent messaging through the prelude.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use relay::prelude::*;
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn agents() -> AgentRegistry {
    let registry = AgentRegistry::new(ToolRegistry::with_builtin_tools().await);
    registry
        .register(
            AgentDefinition::new("calculator", "Adds and multiplies")
                .tools(["safe_math", "environment_summary"])
                .system_prompt("You do arithmetic."),
        )
        .await;
    registry
        .register(AgentDefinition::new("inspector", "Reports state").tool("environment_summary"))
        .await;
    registry
        .register(
            AgentDefinition::new("keeper", "Guards a secret")
                .tools(["hidden_store_reader", "hidden_store_writer"]),
        )
        .await;
    registry
}

#[tokio::test]
async fn test_calculator_run_end_to_end() {
    init_tracing();
    let executor = AgentExecutor::new(agents().await, RuntimeConfig::default());

    let task = Task::new("sum").with_inputs(json!({"operation": "sum", "numbers": "1, 2, 3"}));
    let outcome = executor.run_task("calculator", task).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.result.as_ref().unwrap()["value"], 6.0);

    let history = executor.history(10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].agent, "calculator");
}

#[tokio::test]
async fn test_unsupported_operation_falls_through() {
    init_tracing();
    let executor = AgentExecutor::new(agents().await, RuntimeConfig::default());

    let task = Task::new("bad").with_inputs(json!({"operation": "median", "numbers": [1, 2]}));
    let outcome = executor.run_task("calculator", task).await.unwrap();

    // safe_math fails, so environment_summary answers instead.
    assert_eq!(outcome.result, Some(json!({"message": "Environment empty"})));
    let record = executor.history_record(&outcome.execution_id).unwrap();
    assert!(record.steps.kinds().contains(&StepKind::ToolError));
}

#[tokio::test]
async fn test_summary_never_lists_self_info() {
    init_tracing();
    let executor = AgentExecutor::new(agents().await, RuntimeConfig::default());

    let mut env = Environment::new();
    env.append(SELF_INFO_KEY, "profile", ResultBatch::new(vec![json!({"name": "inspector"})]));
    env.append("safe_math", "math_result", ResultBatch::new(vec![json!({"value": 1})]));

    let outcome = executor
        .run_with_environment("inspector", Task::new("look"), env, WAIT, 10)
        .await
        .unwrap();

    assert_eq!(outcome.result.as_ref().unwrap()["tool"], "safe_math");
    let record = executor.history_record(&outcome.execution_id).unwrap();
    let listed = &record.environment.batches("environment_summary", "environment_summary")[0];
    assert_eq!(listed.objects.len(), 1);
}

#[tokio::test]
async fn test_hidden_state_carries_between_runs() {
    init_tracing();
    let executor = AgentExecutor::new(agents().await, RuntimeConfig::default());

    let write = Task::new("store").with_inputs(json!({"key": UNLOCK_KEY, "value": "42"}));
    let first = executor.run_task("keeper", write.clone()).await.unwrap();
    assert_eq!(first.result.as_ref().unwrap()["stored_key"], UNLOCK_KEY);

    let env = executor.history_record(&first.execution_id).unwrap().environment;
    let second = executor
        .run_with_environment("keeper", write, env, WAIT, 10)
        .await
        .unwrap();
    assert_eq!(second.result, Some(json!({"unlock": "42"})));
}

#[tokio::test]
async fn test_vector_search_agent() {
    init_tracing();
    let store = Arc::new(MemoryVectorStore::new());
    store.create_collection("notes", 2).await.unwrap();
    store
        .insert(
            "notes",
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            vec![json!({"title": "east"}), json!({"title": "north"})],
        )
        .await
        .unwrap();

    let registry = agents().await;
    registry
        .tools()
        .register_factory(VectorSearchTool::factory(store))
        .await;
    registry
        .register(AgentDefinition::new("librarian", "Finds notes").tool("vector_search"))
        .await;
    let executor = AgentExecutor::new(registry, RuntimeConfig::default());

    let task = Task::new("find").with_inputs(json!({"collection": "notes", "vector": [0.1, 0.9], "limit": 1}));
    let outcome = executor.run_task("librarian", task).await.unwrap();
    assert_eq!(outcome.result.as_ref().unwrap()["payload"]["title"], "north");
}

#[tokio::test]
async fn test_config_file_drives_executor() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_steps = 0\nhistory_limit = 1").unwrap();
    let config = RuntimeConfig::load(file.path()).unwrap();
    let executor = AgentExecutor::new(agents().await, config);

    let task = Task::new("sum").with_inputs(json!({"operation": "sum", "numbers": [1]}));
    let outcome = executor.run_task("calculator", task.clone()).await.unwrap();
    assert_eq!(outcome.status, RunStatus::Error);

    executor.run_task("calculator", task).await.unwrap();
    assert_eq!(executor.history(10).len(), 1);
}

#[tokio::test]
async fn test_coordinated_calculation() {
    init_tracing();
    let orchestrator = MultiAgentOrchestrator::new(AgentExecutor::new(
        agents().await,
        RuntimeConfig::default(),
    ));

    // The coordinator role is played by this task: it hands each participant a sum.
    let lead = orchestrator.clone();
    let coordinator = tokio::spawn(async move {
        let task = lead.bus().recv_timeout("lead", WAIT).await.unwrap();
        for participant in ["calculator", "inspector"] {
            lead.send_message(
                Message::new("lead", participant, task.content.clone(), MessageType::Task)
                    .with_metadata("inputs", json!({"operation": "product", "numbers": [1, 2, 3]})),
            );
        }
    });

    let result = orchestrator
        .execute_coordinated_task_with_timeout("multiply", ["calculator", "inspector"], "lead", WAIT)
        .await
        .unwrap();
    coordinator.await.unwrap();

    assert!(!result.timed_out);
    assert_eq!(result.responses.len(), 2);
    assert!(
        result
            .responses
            .iter()
            .all(|m| m.message_type == MessageType::Response && m.recipient == "lead")
    );
    assert!(orchestrator.active_agents().is_empty());

    let replies = orchestrator.conversation_history(Some(&MessageFilter::new().recipient("lead")));
    assert_eq!(replies.len(), 3);
}

#[tokio::test]
async fn test_workflow_through_collaboration() {
    init_tracing();
    let config = RuntimeConfig::default().coordination_timeout(Duration::ZERO);
    let collaboration = AgentCollaboration::new(MultiAgentOrchestrator::new(AgentExecutor::new(
        agents().await,
        config,
    )));

    collaboration
        .define_workflow(
            "audit",
            vec![
                WorkflowStep::new("count", "Count things", "lead").agents(["calculator"]),
                WorkflowStep::new("inspect", "Look around", "lead").agents(["inspector"]),
            ],
            ["lead", "calculator", "inspector"],
        )
        .await;

    let result = collaboration.execute_workflow("audit").await.unwrap();
    assert_eq!(result.workflow, "audit");
    assert_eq!(result.completed_steps.len(), 2);
    assert!(collaboration.orchestrator().active_agents().is_empty());

    let err = collaboration.execute_workflow("nope").await.unwrap_err();
    let err: RelayError = err.into();
    assert!(err.to_string().contains("nope"));
}
