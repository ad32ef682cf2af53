//! End-to-end run: JSON-lines dataset, stand-in scanner, mocked TGI server,
//! Markdown report on disk.

#![cfg(unix)]

use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vulnreview::config::{DatasetConfig, GeneratorConfig};
use vulnreview::dataset::create_source;
use vulnreview::pipeline::ReviewPipeline;
use vulnreview::report::write_report;
use vulnreview::review::ReviewGenerator;
use vulnreview::scanner::BanditScanner;

const DATASET: &str = concat!(
    r#"{"lang": "python", "rejected": "```python\nimport os\n# read the command\ncmd = input()\nos.system(cmd)\n```", "vulnerability": "Command injection", "question": "Run a user command"}"#,
    "\n",
    r#"{"lang": "javascript", "rejected": "eval(x)", "vulnerability": "Use of eval", "question": "Evaluate"}"#,
    "\n",
    r#"{"lang": "python", "rejected": "x = 1", "vulnerability": null, "question": null}"#,
    "\n",
);

/// Reports every scanned file as having one finding on line 3.
fn scanner() -> BanditScanner {
    let report = r#"{"results": [{"line_number": 3, "line_range": [3], "issue_text": "Starting a process with a shell", "test_id": "B605", "issue_severity": "HIGH", "issue_confidence": "HIGH"}]}"#;
    BanditScanner::new("sh", vec!["-c".into(), format!("printf '%s' '{report}'")])
}

#[tokio::test]
async fn run_writes_report_for_matching_samples() {
    let tmp = TempDir::new().unwrap();
    let dataset = tmp.path().join("samples.jsonl");
    std::fs::write(&dataset, DATASET).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("fim"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "generated_text": "subprocess.run([cmd])<|EOT|>" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let source = create_source(&DatasetConfig {
        kind: "jsonl".into(),
        path: Some(dataset),
        ..DatasetConfig::default()
    })
    .unwrap();
    let records = source.load("python", 20).await.unwrap();
    assert_eq!(records.len(), 2);

    let generator = ReviewGenerator::from_config(&GeneratorConfig {
        endpoint: server.uri(),
        ..GeneratorConfig::default()
    })
    .unwrap();
    let pipeline = ReviewPipeline::new(scanner(), generator, false);
    let results = pipeline.run(&records).await.unwrap();

    let out = tmp.path().join("reports").join("review_report.md");
    write_report(&results, &out).unwrap();
    let md = std::fs::read_to_string(&out).unwrap();

    assert!(md.starts_with(
        "# Review 1\n\n```python\nimport os\ncmd = input ( )\nos . system ( cmd )\n```\n"
    ));
    assert!(md.contains(
        "## Bandit Report\nLine 3: Starting a process with a shell (B605, severity HIGH, confidence HIGH)\n"
    ));
    // Echoed prompt with the flagged line masked, then the continuation.
    assert!(md.contains("## LLM Code Review\n\nimport os\ncmd = input ( )\n\nsubprocess.run([cmd])\n"));
    assert!(md.contains("- **vulnerability_description**: Command injection\n"));
    assert!(md.contains("- **prompt_question**: Run a user command\n"));

    assert!(md.contains("# Review 2\n\n```python\nx = 1\n```"));
    assert!(md.contains("- **vulnerability_description**: \n"));
    assert!(!md.contains("eval(x)"));
    assert_eq!(md.matches("\n---\n").count(), 2);
}

#[tokio::test]
async fn generator_outage_aborts_run() {
    let tmp = TempDir::new().unwrap();
    let dataset = tmp.path().join("samples.jsonl");
    std::fs::write(&dataset, DATASET).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&server)
        .await;

    let source = create_source(&DatasetConfig {
        kind: "jsonl".into(),
        path: Some(dataset),
        ..DatasetConfig::default()
    })
    .unwrap();
    let records = source.load("python", 0).await.unwrap();

    let generator = ReviewGenerator::from_config(&GeneratorConfig {
        endpoint: server.uri(),
        ..GeneratorConfig::default()
    })
    .unwrap();
    let err = ReviewPipeline::new(scanner(), generator, false)
        .run(&records)
        .await
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("Sample 0 failed"));
    assert!(msg.contains("503"));
}
