use std::{fs, path::PathBuf};

use tempfile::tempdir;

use strata_cli::{Args, CliError, run};

/// Collects all .toml graphs from a directory
fn collect_graph_files(dir: PathBuf) -> Vec<PathBuf> {
    let mut files = if let Ok(entries) = fs::read_dir(&dir) {
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("toml")
            })
            .collect()
    } else {
        Vec::new()
    };

    // Sort for consistent test output
    files.sort();
    files
}

fn demos_path() -> PathBuf {
    // Demos are at workspace root, relative to workspace not the crate
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
}

fn args(input: PathBuf, config: Option<PathBuf>) -> Args {
    Args {
        input: input.to_string_lossy().to_string(),
        config: config.map(|path| path.to_string_lossy().to_string()),
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_smoke_test_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let demos = collect_graph_files(demos_path());

    assert!(!demos.is_empty(), "No demo graphs found in demos/");

    let strategies = ["simple", "brandes_koepf", "linear_segments", "network_simplex"];
    let mut failed = Vec::new();

    for strategy in strategies {
        let config_path = temp_dir.path().join(format!("{strategy}.toml"));
        fs::write(
            &config_path,
            format!("[placement]\nstrategy = \"{strategy}\"\n\n[compaction]\nstrategy = \"left\"\n"),
        )
        .unwrap();

        for demo in &demos {
            match run(&args(demo.clone(), Some(config_path.clone()))) {
                Ok(report) => assert!(!report.is_empty(), "{} produced no output", demo.display()),
                Err(err) => failed.push((demo.clone(), strategy, err)),
            }
        }
    }

    if !failed.is_empty() {
        eprintln!("\nDemos that failed:");
        for (path, strategy, err) in &failed {
            eprintln!("  - {} ({strategy}): {err}", path.display());
        }
        panic!("{} demo run(s) failed unexpectedly", failed.len());
    }
}

#[test]
fn e2e_layered_report() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("graph.toml");
    let config = temp_dir.path().join("config.toml");
    fs::write(
        &input,
        r#"
[[layers]]
nodes = [{ id = "A", width = 10, height = 10 }, { id = "B", width = 10, height = 10 }]

[[layers]]
nodes = [{ id = "C", width = 10, height = 10 }]

[[edges]]
source = "A"
target = "C"

[[edges]]
source = "B"
target = "C"
"#,
    )
    .unwrap();
    fs::write(
        &config,
        r#"
[placement]
strategy = "simple"
node_spacing = 5
layer_spacing = 40

[compaction]
strategy = "left"
spacing = 5
"#,
    )
    .unwrap();

    let report = run(&args(input, Some(config))).unwrap();
    let lines: Vec<_> = report.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("A 0.00 "));
    assert!(lines[1].starts_with("B 0.00 "));
    assert_eq!(lines[2], "C 15.00 7.50");
}

#[test]
fn e2e_tree_report() {
    let temp_dir = tempdir().unwrap();
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "").unwrap();

    let report = run(&args(demos_path().join("diamond_tree.toml"), Some(config))).unwrap();

    assert_eq!(
        report,
        "r 15.00 0.00\nx 0.00 50.00\ny 30.00 50.00\nz 0.00 100.00\n"
    );
}

#[test]
fn e2e_invalid_input_is_reported() {
    let temp_dir = tempdir().unwrap();
    let input = temp_dir.path().join("graph.toml");
    fs::write(
        &input,
        "[[layers]]\nnodes = [{ id = \"a\", width = 1, height = 1 }]\n\n[[edges]]\nsource = \"a\"\ntarget = \"b\"\n",
    )
    .unwrap();

    let err = run(&args(input, None)).unwrap_err();
    assert!(matches!(err, CliError::Input(_)));
}

#[test]
fn e2e_missing_input_is_io_error() {
    let temp_dir = tempdir().unwrap();
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "").unwrap();

    let err = run(&args(temp_dir.path().join("absent.toml"), Some(config))).unwrap_err();
    assert!(matches!(err, CliError::Io(_)));
}
