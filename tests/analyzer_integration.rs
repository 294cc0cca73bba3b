// Library-level tests across analyzer, stats, batch processing and registry

use microtools::batch::{process_inputs, BatchOptions};
use microtools::grammar::{analyze_text, apply_fix, Category, Severity};
use microtools::reader::{expand_inputs, InputSource, ReaderConfig};
use microtools::registry::ToolRegistry;
use microtools::stats::calculate_text_stats;
use microtools::Settings;

#[path = "integration/mod.rs"]
mod test_utils;
use test_utils::fixtures::{ESSAY_TEXT, SAMPLE_TEXT};
use test_utils::TestFixture;

#[test]
fn test_essay_issues_are_sorted_and_categorized() {
    let issues = analyze_text(ESSAY_TEXT).unwrap();

    assert!(issues.windows(2).all(|w| w[0].start <= w[1].start));
    for category in Category::ALL {
        assert!(
            issues.iter().any(|i| i.category == category),
            "expected a {category} issue"
        );
    }
    for issue in &issues {
        assert_eq!(&ESSAY_TEXT[issue.start..issue.end], issue.text);
        assert_eq!(issue.id, format!("{}-{}", issue.rule_index, issue.start));
    }

    let occured = issues.iter().find(|i| i.text == "occured").unwrap();
    assert_eq!(occured.span.start_line, 5);
    assert_eq!(occured.severity, Severity::High);
}

#[test]
fn test_fix_then_reanalyze() {
    let issues = analyze_text(SAMPLE_TEXT).unwrap();
    let spelling = issues.iter().find(|i| i.category == Category::Spelling).unwrap();

    let fixed = apply_fix(SAMPLE_TEXT, spelling).unwrap();
    let remaining = analyze_text(&fixed).unwrap();
    assert!(remaining.iter().all(|i| i.category != Category::Spelling));
    assert_eq!(remaining.len(), issues.len() - 1);
}

#[test]
fn test_essay_stats() {
    let stats = calculate_text_stats(ESSAY_TEXT).unwrap();
    assert_eq!(stats.paragraphs, 3);
    assert_eq!(stats.sentences, 4);
    assert_eq!(stats.reading_time, 1);
    assert!(stats.readability_score <= 100);
}

#[tokio::test]
async fn test_batch_over_glob_with_failures() {
    let fixture = TestFixture::new();
    fixture.create_text_file("in/one.txt", SAMPLE_TEXT);
    fixture.create_text_file("in/two.txt", ESSAY_TEXT);
    std::fs::write(fixture.root_path.join("in/three.txt"), [0xC3, 0x28]).unwrap();

    let pattern = format!("{}/in/*.txt", fixture.root_path.display());
    let sources = expand_inputs(&[pattern]).unwrap();
    assert_eq!(sources.len(), 3);

    let reports = process_inputs(sources.clone(), &BatchOptions::default()).await.unwrap();
    let names: Vec<_> = reports
        .iter()
        .map(|r| r.source.rsplit('/').next().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["one.txt", "three.txt", "two.txt"]);
    assert_eq!(reports[0].issues.len(), 2);
    assert!(reports[1].error.as_deref().unwrap().contains("UTF-8"));
    assert!(reports[2].issues.len() > 5);

    let strict = BatchOptions {
        reader: ReaderConfig {
            fail_fast: true,
            ..ReaderConfig::default()
        },
        ..BatchOptions::default()
    };
    assert!(process_inputs(sources, &strict).await.is_err());
}

#[tokio::test]
async fn test_batch_keeps_text_for_fixing() {
    let fixture = TestFixture::new();
    let path = fixture.create_text_file("a.txt", SAMPLE_TEXT);

    let options = BatchOptions {
        keep_text: true,
        ..BatchOptions::default()
    };
    let reports = process_inputs(vec![InputSource::File(path)], &options).await.unwrap();
    assert_eq!(reports[0].text.as_deref(), Some(SAMPLE_TEXT));
}

#[test]
fn test_registry_runs_every_tool() {
    let registry = ToolRegistry::builtin().unwrap();
    let settings = Settings::default();

    let inputs = [
        ("/tools/grammar-checker", SAMPLE_TEXT),
        ("/tools/csv-to-json", "a,b\n1,2"),
        ("/tools/unit-converter", "length 1 mi km"),
        ("/tools/age-calculator", "1990-05-15 08:30"),
    ];
    for (route, input) in inputs {
        let tool = registry.resolve(route).unwrap();
        assert_eq!(tool.config.route(), route);
        let output = tool.component.run(input, &settings).unwrap();
        assert!(!output.is_null(), "{route} produced no output");
    }
}
