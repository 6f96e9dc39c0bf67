use std::path::{Path, PathBuf};

use mmdc_runner::{
    Defaults, RenderError, Renderer, RunError, ScriptConfig, build_command, generate, resolve,
};

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, contents).expect("write fixture");
}

#[test]
fn default_run_derives_svg_without_config_flag() {
    let dir = tempfile::tempdir().unwrap();
    let defaults = Defaults::from_base_dir(dir.path());
    let script = ScriptConfig::load(&defaults.script_config_path()).unwrap();

    let paths = resolve(Some(Path::new("diagram.mmd")), None, &script, &defaults).unwrap();

    let expected_output = defaults.output_dir.join("diagram.svg");
    assert_eq!(paths.output_path, expected_output);
    assert_eq!(paths.config_path, None);
    let line = build_command(&paths.input_path, &paths.output_path, None);
    assert!(line.contains(&format!(
        "-i \"diagram.mmd\" -o \"{}\"",
        expected_output.display()
    )));
    assert!(!line.contains("-c"));
}

#[test]
fn script_config_extension_changes_output() {
    let dir = tempfile::tempdir().unwrap();
    let defaults = Defaults::from_base_dir(dir.path());
    write(&defaults.script_config_path(), r#"{"extension": ".png"}"#);

    let script = ScriptConfig::load(&defaults.script_config_path()).unwrap();
    let paths = resolve(Some(Path::new("flow.mmd")), None, &script, &defaults).unwrap();

    assert!(paths.output_path.to_string_lossy().ends_with(".png"));
}

#[test]
fn default_renderer_config_is_picked_up_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let defaults = Defaults::from_base_dir(dir.path());
    let mermaid_config = defaults.config_dir.join("mermaid-config.json");
    write(&mermaid_config, r#"{"theme": "dark"}"#);

    let paths = resolve(
        Some(Path::new("flow.mmd")),
        None,
        &ScriptConfig::default(),
        &defaults,
    )
    .unwrap();

    assert_eq!(paths.config_path, Some(mermaid_config.clone()));
    let line = build_command(
        &paths.input_path,
        &paths.output_path,
        paths.config_path.as_deref(),
    );
    assert!(line.ends_with(&format!("-c \"{}\"", mermaid_config.display())));
}

#[test]
fn missing_input_never_starts_renderer() {
    let dir = tempfile::tempdir().unwrap();
    let defaults = Defaults::from_base_dir(dir.path());
    let missing = dir.path().join("nope.mmd");
    let paths = resolve(Some(&missing), None, &ScriptConfig::default(), &defaults).unwrap();

    // Would fail with ToolNotFound if it were started.
    let renderer = Renderer {
        program: "mmdc-runner-test-no-such-binary".to_string(),
        ..Default::default()
    };
    let err = generate(&paths, &renderer).unwrap_err();

    assert!(matches!(err, RunError::InputNotFound(ref p) if *p == missing));
    assert_eq!(
        err.to_string(),
        format!("Input file not found: {}", missing.display())
    );
}

#[test]
fn absent_tool_message_differs_from_render_failure() {
    let dir = tempfile::tempdir().unwrap();
    let defaults = Defaults::from_base_dir(dir.path());
    let input = dir.path().join("flow.mmd");
    write(&input, "flowchart LR\n  A --> B\n");
    let paths = resolve(Some(&input), None, &ScriptConfig::default(), &defaults).unwrap();

    let renderer = Renderer {
        program: "mmdc-runner-test-no-such-binary".to_string(),
        ..Default::default()
    };
    let err = generate(&paths, &renderer).unwrap_err();

    assert!(matches!(
        err,
        RunError::Render(RenderError::ToolNotFound { .. })
    ));
    let message = err.to_string();
    assert!(message.contains("not found"));
    assert!(!message.contains("error occurred while generating"));
}

#[cfg(unix)]
fn fake_renderer(script: &str) -> Renderer {
    Renderer {
        program: "sh".to_string(),
        leading_args: vec!["-c".to_string(), script.to_string()],
        timeout: None,
    }
}

#[cfg(unix)]
#[test]
fn successful_render_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let defaults = Defaults::from_base_dir(dir.path());
    let input = dir.path().join("flow.mmd");
    write(&input, "flowchart LR\n  A --> B\n");
    let paths = resolve(Some(&input), None, &ScriptConfig::default(), &defaults).unwrap();

    // $0=-i $1=input $2=-o $3=output
    let result = generate(&paths, &fake_renderer(r#"cp "$1" "$3""#)).unwrap();

    assert!(result.succeeded);
    let written: PathBuf = defaults.output_dir.join("flow.svg");
    assert_eq!(
        std::fs::read_to_string(written).unwrap(),
        "flowchart LR\n  A --> B\n"
    );
}

#[cfg(unix)]
#[test]
fn render_failure_surfaces_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let defaults = Defaults::from_base_dir(dir.path());
    let input = dir.path().join("broken.mmd");
    write(&input, "flowchart LR\n  A -->\n");
    let paths = resolve(Some(&input), None, &ScriptConfig::default(), &defaults).unwrap();

    let err = generate(
        &paths,
        &fake_renderer("echo 'Parse error on line 2' >&2; exit 1"),
    )
    .unwrap_err();

    match err {
        RunError::Render(RenderError::Failed { exit_code, stderr }) => {
            assert_eq!(exit_code, 1);
            assert_eq!(stderr.trim(), "Parse error on line 2");
        }
        other => panic!("expected render failure, got {other:?}"),
    }
}
