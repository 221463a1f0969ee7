mod common;

use std::sync::{Arc, Mutex};

use agentic_comic::infrastructure::ContentStore;
use agentic_comic::models::{AgentLogStatus, GenerationRequest, GenerationStatus};
use agentic_comic::services::LlmService;
use agentic_comic::workflow::{LogProgress, WorkflowOrchestrator, WorkflowStage};
use common::{memory_store, ScriptedTextGenerator};

fn solar_request() -> GenerationRequest {
    GenerationRequest::new("Solar System and Planets", "superhero")
        .with_age_group("child")
        .with_language("en")
}

#[tokio::test]
async fn test_successful_run_logs_four_steps() {
    let store = memory_store().await;
    let text = Arc::new(ScriptedTextGenerator::new());
    let orchestrator = WorkflowOrchestrator::new(LlmService::new(text.clone()), store.clone());

    let result = orchestrator
        .execute_workflow(solar_request(), &LogProgress)
        .await;

    assert!(result.is_success(), "unexpected error: {:?}", result.error);
    assert_eq!(result.stage, WorkflowStage::Completed);
    assert_eq!(result.execution_summary.status, GenerationStatus::Completed);
    assert_eq!(result.execution_summary.steps_completed, Some(4));
    assert_eq!(result.execution_summary.agents_executed, Some(4));
    assert!(result.quality_warning.is_none());

    let generation_id = result.generation_id.unwrap();
    let record = store.get_generation(generation_id).await.unwrap();
    assert_eq!(record.status, GenerationStatus::Completed);
    assert!(record.completed_at.is_some());

    let logs = store.agent_logs(generation_id).await.unwrap();
    let steps: Vec<u32> = logs.iter().map(|l| l.step_number).collect();
    assert_eq!(steps, vec![1, 2, 3, 4]);
    assert!(logs.iter().all(|l| l.status == AgentLogStatus::Success));
    assert_eq!(logs[0].agent_name, "ContentIntelligenceAgent");
    assert_eq!(logs[3].agent_name, "QualityAssuranceAgent");
}

#[tokio::test]
async fn test_agent_outputs_are_merged() {
    let store = memory_store().await;
    let text = Arc::new(ScriptedTextGenerator::new());
    let orchestrator = WorkflowOrchestrator::new(LlmService::new(text.clone()), store);

    let result = orchestrator
        .execute_workflow(solar_request(), &LogProgress)
        .await;

    let content = result.content_intelligence.as_ref().unwrap();
    assert_eq!(content.scenes.len(), 3);
    assert_eq!(content.dialogue_count(), 4);
    assert_eq!(content.character_registry.len(), 2);

    let planning = result.educational_planning.as_ref().unwrap();
    assert_eq!(planning.learning_objectives.len(), 3);
    assert_eq!(planning.curriculum_alignment.score, 8.5);

    // 一个封面 + 每句对白一个分镜
    let visual = result.visual_generation.as_ref().unwrap();
    assert_eq!(visual.total_prompts, 5);
    assert_eq!(visual.poster().unwrap().scene_number, 0);
    assert_eq!(text.count_calls("comic book cover"), 1);
    assert_eq!(text.count_calls("Create a detailed visual prompt"), 4);

    // 整体评估一次 + 每句对白一次
    let quality = result.quality_assurance.as_ref().unwrap();
    assert!(quality.approval_status);
    assert_eq!(quality.scene_validations.len(), 4);
    assert_eq!(text.count_calls("Analyze this educational content"), 5);

    let json = serde_json::to_value(&result).unwrap();
    for key in [
        "content_intelligence",
        "educational_planning",
        "visual_generation",
        "quality_assurance",
        "execution_summary",
    ] {
        assert!(json.get(key).is_some(), "missing key {}", key);
    }
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_agent_failure_stops_later_agents() {
    let store = memory_store().await;
    let text = Arc::new(ScriptedTextGenerator::new().failing_on("learning objectives"));
    let orchestrator = WorkflowOrchestrator::new(LlmService::new(text.clone()), store.clone());

    let result = orchestrator
        .execute_workflow(solar_request(), &LogProgress)
        .await;

    assert!(!result.is_success());
    assert_eq!(result.stage, WorkflowStage::Failed);
    let error = result.error.as_deref().unwrap();
    assert!(error.starts_with("EducationalPlanningAgent failed:"), "{}", error);
    assert_eq!(result.execution_summary.status, GenerationStatus::Failed);
    assert!(result.content_intelligence.is_some());
    assert!(result.visual_generation.is_none());
    assert!(result.quality_assurance.is_none());

    assert_eq!(text.count_calls("visual prompt"), 0);
    assert_eq!(text.count_calls("Analyze this educational content"), 0);

    let generation_id = result.generation_id.unwrap();
    let record = store.get_generation(generation_id).await.unwrap();
    assert_eq!(record.status, GenerationStatus::Failed);

    let logs = store.agent_logs(generation_id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].status, AgentLogStatus::Success);
    assert_eq!(logs[1].status, AgentLogStatus::Error);
    assert!(logs[1].error_message.is_some());
}

#[tokio::test]
async fn test_first_agent_failure_marks_generation_failed() {
    let store = memory_store().await;
    let text = Arc::new(ScriptedTextGenerator::new().failing_on("Create educational content about"));
    let orchestrator = WorkflowOrchestrator::new(LlmService::new(text.clone()), store.clone());

    let result = orchestrator
        .execute_workflow(solar_request(), &LogProgress)
        .await;

    assert!(result
        .error
        .as_deref()
        .unwrap()
        .starts_with("ContentIntelligenceAgent failed:"));
    assert!(result.content_intelligence.is_none());
    assert_eq!(text.count_calls("learning objectives"), 0);

    let generation_id = result.generation_id.unwrap();
    let record = store.get_generation(generation_id).await.unwrap();
    assert!(record.status.is_terminal());
    assert_eq!(record.status, GenerationStatus::Failed);
    assert_eq!(store.agent_logs(generation_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_quality_rejection_is_advisory() {
    let store = memory_store().await;
    let text = Arc::new(ScriptedTextGenerator::new().rejecting());
    let orchestrator = WorkflowOrchestrator::new(LlmService::new(text), store.clone());

    let result = orchestrator
        .execute_workflow(solar_request(), &LogProgress)
        .await;

    assert!(result.is_success());
    let warnings = result.quality_warning.as_ref().unwrap();
    assert_eq!(
        warnings,
        &vec![
            "- Add more facts about Mars".to_string(),
            "- Simplify the vocabulary".to_string(),
        ]
    );

    let record = store
        .get_generation(result.generation_id.unwrap())
        .await
        .unwrap();
    assert_eq!(record.status, GenerationStatus::Completed);
}

#[tokio::test]
async fn test_progress_messages() {
    let store = memory_store().await;
    let text = Arc::new(ScriptedTextGenerator::new().rejecting());
    let orchestrator = WorkflowOrchestrator::new(LlmService::new(text), store);

    let messages = Mutex::new(Vec::new());
    let reporter = |m: &str| messages.lock().unwrap().push(m.to_string());
    orchestrator
        .execute_workflow(solar_request(), &reporter)
        .await;

    let messages = messages.into_inner().unwrap();
    let steps: Vec<&String> = messages.iter().filter(|m| m.starts_with("Step ")).collect();
    assert_eq!(steps.len(), 5);
    assert_eq!(steps[0], "Step 1/5: Analyzing educational content...");
    assert_eq!(steps[4], "Step 5/5: Finalizing comic generation...");
    assert!(messages
        .iter()
        .any(|m| m.contains("continuing with quality warnings")));
}

#[tokio::test]
async fn test_empty_script_still_completes() {
    let store = memory_store().await;
    let text = Arc::new(ScriptedTextGenerator::new().with_script("Sorry, no script today."));
    let orchestrator = WorkflowOrchestrator::new(LlmService::new(text), store);

    let result = orchestrator
        .execute_workflow(solar_request(), &LogProgress)
        .await;

    assert!(result.is_success());
    let content = result.content_intelligence.as_ref().unwrap();
    assert!(content.scenes.is_empty());
    // 只有封面提示词
    assert_eq!(result.visual_generation.as_ref().unwrap().total_prompts, 1);
}

#[tokio::test]
async fn test_lines_after_summary_header_count_as_dialogue() {
    let store = memory_store().await;
    let script = "\
SCENE 1:
Max: What is the Sun?
Luna: It is a star.

EDUCATIONAL_SUMMARY:
Key point: the Sun is a star";
    let text = Arc::new(ScriptedTextGenerator::new().with_script(script));
    let orchestrator = WorkflowOrchestrator::new(LlmService::new(text.clone()), store);

    let result = orchestrator
        .execute_workflow(solar_request(), &LogProgress)
        .await;

    assert!(result.is_success());
    let content = result.content_intelligence.as_ref().unwrap();
    assert_eq!(content.scenes.len(), 1);
    assert_eq!(content.dialogue_count(), 3);

    // 每句对白一个分镜提示词 + 一次质检
    assert_eq!(result.visual_generation.as_ref().unwrap().total_prompts, 4);
    assert_eq!(text.count_calls("Create a detailed visual prompt"), 3);
    assert_eq!(text.count_calls("Analyze this educational content"), 4);
}
