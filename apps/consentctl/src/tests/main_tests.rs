use super::*;

fn run(cookie_file: &std::path::Path, args: &[&str]) -> Value {
    let mut argv = vec![
        "consentctl".to_string(),
        "--cookie-file".to_string(),
        cookie_file.display().to_string(),
    ];
    argv.extend(args.iter().map(|arg| arg.to_string()));
    let cli = Cli::try_parse_from(argv).expect("parse args");
    let output = execute(cli).expect("execute");
    serde_json::from_str(&output).expect("json output")
}

#[test]
fn parses_seed_arguments() {
    let (service, payload) = parse_seed(r#"gtm={"event":"pageView"}"#).expect("seed");
    assert_eq!(service, ServiceName::Gtm);
    assert_eq!(payload, json!({"event": "pageView"}));

    assert!(parse_seed("gtm").is_err());
    assert!(parse_seed("fbq={}").is_err());
    assert!(parse_seed("ga=[oops").is_err());
}

#[test]
fn status_is_undecided_without_a_cookie_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let status = run(&dir.path().join("cookies.json"), &["status"]);
    assert_eq!(status["user_reacted"], json!(false));
    assert_eq!(status["tracking_accepted"], Value::Null);
    assert_eq!(status["enable_modal"], json!(true));
}

#[test]
fn accept_persists_seeds_for_later_invocations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cookies = dir.path().join("cookies.json");
    let config = dir.path().join("consent.toml");
    fs::write(&config, "[services.gtm]\nid = \"GTM-1\"\n").expect("write config");
    let config_arg = config.display().to_string();

    let accepted = run(
        &cookies,
        &[
            "--config",
            &config_arg,
            "accept",
            "--seed",
            r#"gtm={"event":"pageView"}"#,
        ],
    );
    assert_eq!(accepted["ok"], json!(true));
    assert_eq!(accepted["status"]["services"]["gtm"], json!(true));

    let data = run(&cookies, &["--config", &config_arg, "data", "gtm"]);
    assert_eq!(data, json!([{"event": "pageView"}]));
}

#[test]
fn deny_blocks_registration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cookies = dir.path().join("cookies.json");

    run(&cookies, &["deny"]);
    let registered = run(&cookies, &["register", "gtm", r#"{"event":"x"}"#]);
    assert_eq!(registered["ok"], json!(false));
    let status = run(&cookies, &["status"]);
    assert_eq!(status["tracking_accepted"], json!(false));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cookie_file = dir.path().join("c.json").display().to_string();
    let cli = Cli::try_parse_from([
        "consentctl",
        "--config",
        "/definitely/not/here.toml",
        "--cookie-file",
        cookie_file.as_str(),
        "status",
    ])
    .expect("parse args");
    assert!(execute(cli).is_err());
}
