mod common;

use std::sync::Arc;

use agentic_comic::config::Config;
use agentic_comic::error::RenderError;
use agentic_comic::infrastructure::ContentStore;
use agentic_comic::logger;
use agentic_comic::models::{GenerationRequest, GenerationStatus};
use agentic_comic::services::PanelComposer;
use agentic_comic::App;
use common::{memory_store, test_config, FailingImages, PngImages, ScriptedTextGenerator};
use lopdf::Document;

fn solar_request() -> GenerationRequest {
    GenerationRequest::new("Solar System and Planets", "superhero").with_language("en")
}

#[tokio::test]
async fn test_solar_system_comic() {
    logger::init();
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let store = memory_store().await;
    let images = Arc::new(PngImages::new(&config.image_output_folder()));

    let app = App::from_parts(
        config,
        Arc::new(ScriptedTextGenerator::new()),
        Some(images),
        store.clone(),
        PanelComposer::bundled().unwrap(),
    );

    let artifact = app.run(solar_request(), None).await.unwrap();

    // 输出文件名由主题生成
    let expected_path = app
        .config()
        .pdf_output_folder()
        .join("solar_system_and_planets.pdf");
    assert_eq!(artifact.render.output_path, expected_path);
    assert!(expected_path.exists());

    let panels = &artifact.render.panels;
    assert_eq!(panels.iter().filter(|p| p.scene_number == 0).count(), 1);
    assert!(panels.len() >= 2);
    assert_eq!(artifact.render.page_count, panels.len());
    assert_eq!(
        Document::load(&expected_path).unwrap().get_pages().len(),
        panels.len()
    );

    let record = store
        .get_generation(artifact.generation_id.unwrap())
        .await
        .unwrap();
    assert_eq!(record.status, GenerationStatus::Completed);
    assert_eq!(record.topic, "Solar System and Planets");
    assert_eq!(
        record.output_path.as_deref(),
        Some(expected_path.display().to_string().as_str())
    );
    assert!(record.generation_time_seconds.is_some());
}

#[tokio::test]
async fn test_explicit_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let app = App::from_parts(
        config,
        Arc::new(ScriptedTextGenerator::new()),
        None,
        memory_store().await,
        PanelComposer::bundled().unwrap(),
    );
    let output = dir.path().join("custom").join("planets.pdf");

    let artifact = app.run(solar_request(), Some(&output)).await.unwrap();

    assert_eq!(artifact.render.output_path, output);
    // 封面 + 三个场景，全部是占位图
    assert_eq!(artifact.render.page_count, 4);
}

#[tokio::test]
async fn test_workflow_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = memory_store().await;
    let app = App::from_parts(
        test_config(dir.path()),
        Arc::new(ScriptedTextGenerator::new().failing_on("visual prompt")),
        None,
        store.clone(),
        PanelComposer::bundled().unwrap(),
    );

    let err = app.run(solar_request(), None).await.unwrap_err();
    assert!(err.to_string().contains("VisualGenerationAgent failed"));

    let record = store.get_generation(1).await.unwrap();
    assert_eq!(record.status, GenerationStatus::Failed);
    assert!(record.output_path.is_none());
}

#[tokio::test]
async fn test_no_images_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    // 静态目录是一个普通文件，占位图也写不出来
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, b"not a directory").unwrap();
    config.static_folder = blocked.display().to_string();

    let app = App::from_parts(
        config,
        Arc::new(ScriptedTextGenerator::new()),
        Some(Arc::new(FailingImages::new())),
        memory_store().await,
        PanelComposer::bundled().unwrap(),
    );

    let err = app
        .run(solar_request(), Some(&dir.path().join("comic.pdf")))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RenderError>(),
        Some(RenderError::NoImagesGenerated)
    ));
}

#[tokio::test]
#[ignore] // 需要真实的 GEMINI_API_KEY：cargo test -- --ignored
async fn test_live_generation() {
    logger::init();
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("缺少 GEMINI_API_KEY");
    let app = App::initialize(config).await.expect("初始化失败");

    let artifact = app
        .run(solar_request(), None)
        .await
        .expect("漫画生成失败");

    assert!(artifact.render.page_count >= 1);
    assert!(artifact.render.output_path.exists());
}
