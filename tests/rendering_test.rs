mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use agentic_comic::error::RenderError;
use agentic_comic::models::{DialogueLine, Scene, VisualPrompt};
use agentic_comic::orchestrator::RenderingDriver;
use agentic_comic::services::PanelComposer;
use common::{FailingImages, PngImages};
use lopdf::Document;

fn scenes() -> Vec<Scene> {
    (1..=3)
        .map(|n| {
            let mut scene = Scene::new(n);
            scene.dialogues.push(DialogueLine::new(
                "Captain Cosmo",
                "one two three four five six seven eight nine ten eleven twelve",
            ));
            scene
        })
        .collect()
}

fn prompts() -> Vec<VisualPrompt> {
    let mut prompts = vec![VisualPrompt::poster("cover art")];
    for n in [3, 1, 2] {
        prompts.push(VisualPrompt::scene(n, "Captain Cosmo", "hi", format!("scene {} first", n), 0));
        prompts.push(VisualPrompt::scene(n, "Luna", "hey", format!("scene {} second", n), 0));
    }
    prompts
}

#[tokio::test]
async fn test_renders_poster_and_first_prompt_per_scene() {
    let dir = tempfile::tempdir().unwrap();
    let images = Arc::new(PngImages::new(&dir.path().join("img")));
    let driver = RenderingDriver::new(
        Some(images.clone()),
        Arc::new(PanelComposer::bundled().unwrap()),
        dir.path().join("placeholders"),
        2,
    );
    let output = dir.path().join("comic.pdf");

    let outcome = driver
        .render(&prompts(), &scenes(), "superhero", &output)
        .await
        .unwrap();

    let order: Vec<u32> = outcome.panels.iter().map(|p| p.scene_number).collect();
    assert_eq!(order, vec![0, 1, 2, 3]);
    assert_eq!(outcome.page_count, 4);
    assert_eq!(Document::load(&output).unwrap().get_pages().len(), 4);

    // 每个场景只渲染第一个提示词，专用接口第一次就成功
    let sent = images.prompts.lock().unwrap().clone();
    assert_eq!(sent.len(), 4);
    assert!(sent.iter().any(|p| p.contains("scene 1 first")));
    assert!(!sent.iter().any(|p| p.contains("second")));
    assert!(sent.iter().any(|p| p.contains("superhero style comic panel")));

    // 分镜加了 50px 留白和 10px 边框，封面保持原尺寸
    let poster = image::open(&outcome.panels[0].file_path).unwrap();
    assert_eq!((poster.width(), poster.height()), (64, 48));
    let panel = image::open(&outcome.panels[1].file_path).unwrap();
    assert_eq!((panel.width(), panel.height()), (64 + 20, 48 + 50 + 20));

    // 对白写在边框内侧的留白里
    let panel = panel.to_rgb8();
    let inked = (10..60)
        .flat_map(|y| (10..74).map(move |x| (x, y)))
        .filter(|&(x, y)| *panel.get_pixel(x, y) != image::Rgb([255, 255, 255]))
        .count();
    assert!(inked > 0);
}

#[tokio::test]
async fn test_failing_backend_falls_back_to_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let images = Arc::new(FailingImages::new());
    let placeholder_folder = dir.path().join("placeholders");
    let driver = RenderingDriver::new(
        Some(images.clone()),
        Arc::new(PanelComposer::bundled().unwrap()),
        &placeholder_folder,
        3,
    );
    let output = dir.path().join("comic.pdf");

    let outcome = driver
        .render(&prompts(), &scenes(), "superhero", &output)
        .await
        .unwrap();

    assert_eq!(outcome.page_count, 4);
    assert!(outcome
        .panels
        .iter()
        .all(|p| p.file_path.starts_with(&placeholder_folder)));
    // 每张图：专用接口 + 通用接口
    assert_eq!(images.calls.load(Ordering::SeqCst), 8);

    let poster = image::open(&outcome.panels[0].file_path).unwrap();
    assert_eq!((poster.width(), poster.height()), (512, 512));
}

#[tokio::test]
async fn test_missing_backend_uses_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let driver = RenderingDriver::new(
        None,
        Arc::new(PanelComposer::bundled().unwrap()),
        dir.path().join("placeholders"),
        1,
    );
    let output = dir.path().join("out").join("comic.pdf");

    let outcome = driver
        .render(&prompts(), &scenes(), "superhero", &output)
        .await
        .unwrap();

    assert_eq!(outcome.page_count, 4);
    assert!(output.exists());
}

#[tokio::test]
async fn test_scene_zero_prompt_is_not_rendered_as_panel() {
    let dir = tempfile::tempdir().unwrap();
    let images = Arc::new(PngImages::new(&dir.path().join("img")));
    let driver = RenderingDriver::new(
        Some(images.clone()),
        Arc::new(PanelComposer::bundled().unwrap()),
        dir.path().join("placeholders"),
        2,
    );
    let prompts = vec![
        VisualPrompt::poster("cover art"),
        VisualPrompt::scene(0, "Luna", "hey", "stray scene zero", 0),
        VisualPrompt::scene(1, "Luna", "hey", "scene one", 0),
    ];

    let outcome = driver
        .render(&prompts, &scenes(), "superhero", &dir.path().join("comic.pdf"))
        .await
        .unwrap();

    assert_eq!(outcome.page_count, 2);
    let sent = images.prompts.lock().unwrap().clone();
    assert!(!sent.iter().any(|p| p.contains("stray scene zero")));
}

#[tokio::test]
async fn test_all_tiers_failing_reports_no_images() {
    let dir = tempfile::tempdir().unwrap();
    // 占位图目录是一个普通文件，第三级也会失败
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, b"not a directory").unwrap();

    let driver = RenderingDriver::new(
        Some(Arc::new(FailingImages::new())),
        Arc::new(PanelComposer::bundled().unwrap()),
        &blocked,
        2,
    );
    let output = dir.path().join("comic.pdf");

    let result = driver
        .render(&prompts(), &scenes(), "superhero", &output)
        .await;

    assert!(matches!(result, Err(RenderError::NoImagesGenerated)));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_no_prompts_reports_no_images() {
    let dir = tempfile::tempdir().unwrap();
    let driver = RenderingDriver::new(
        None,
        Arc::new(PanelComposer::bundled().unwrap()),
        dir.path(),
        2,
    );

    let result = driver
        .render(&[], &[], "superhero", &dir.path().join("comic.pdf"))
        .await;

    assert!(matches!(result, Err(RenderError::NoImagesGenerated)));
}
