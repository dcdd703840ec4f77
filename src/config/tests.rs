use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.github.per_page.get(), 10);
    assert_eq!(settings.github.api_base.as_str(), "https://api.github.com/");
    assert!(settings.github.token.is_none());
    assert_eq!(settings.render.raw_markup, RawMarkupPolicy::Escape);
    assert_eq!(settings.render.max_depth.get(), 128);
    assert_eq!(settings.render.cache_capacity, 256);
    assert!(settings.checkout.endpoint.is_none());
    assert!(settings.identity.userinfo_url.is_none());
    assert_eq!(settings.checkout.catalog.products().len(), 1);
}

#[test]
fn checkout_return_urls_follow_public_url() {
    let mut raw = RawSettings::default();
    raw.server.public_url = Some("https://gitreader.example/app".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.checkout.success_url.as_str(),
        "https://gitreader.example/app/success"
    );
    assert_eq!(
        settings.checkout.cancel_url.as_str(),
        "https://gitreader.example/app/cancel"
    );
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn render_policy_is_validated() {
    let mut raw = RawSettings::default();
    raw.render.raw_markup = Some("yolo".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown policy");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.raw_markup",
            ..
        }
    ));
}

#[test]
fn zero_depth_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.max_depth = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero depth");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.max_depth",
            ..
        }
    ));
}

#[test]
fn per_page_is_bounded() {
    let mut raw = RawSettings::default();
    raw.github.per_page = Some(101);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.github.per_page = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_token_counts_as_absent() {
    let mut raw = RawSettings::default();
    raw.github.token = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.github.token.is_none());
}

#[test]
fn api_base_gains_trailing_slash() {
    let mut raw = RawSettings::default();
    raw.github.api_base = Some("https://ghe.example/api/v3".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.github.api_base.as_str(),
        "https://ghe.example/api/v3/"
    );
}

#[test]
fn empty_product_list_is_rejected() {
    let mut raw = RawSettings::default();
    raw.checkout.products = Some(Vec::new());

    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "checkout.products",
            ..
        })
    ));
}

#[test]
fn file_layer_is_overridden_by_cli() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gitreader.toml");
    std::fs::write(
        &path,
        r#"
[server]
port = 8080

[render]
raw_markup = "sanitize"
cache_capacity = 0

[[checkout.products]]
id = "prod_test"
price_id = "price_test"
name = "Coffee"
description = "One coffee"
"#,
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "gitreader",
        "--config-file",
        path.to_str().expect("utf-8 path"),
        "serve",
        "--server-port",
        "9090",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(settings.server.addr.port(), 9090);
    assert_eq!(settings.render.raw_markup, RawMarkupPolicy::Sanitize);
    assert_eq!(settings.render.cache_capacity, 0);
    assert!(settings.checkout.catalog.require_price("price_test").is_ok());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["gitreader"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "gitreader",
        "render",
        "README.md",
        "--theme",
        "dark",
        "--render-raw-markup",
        "trust",
        "--base-url",
        "https://raw.githubusercontent.com/o/r/HEAD/",
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.file, std::path::Path::new("README.md"));
            assert_eq!(render.theme, crate::domain::Theme::Dark);
            assert_eq!(render.overrides.raw_markup, Some(RawMarkupPolicy::Trust));
            assert!(render.base_url.is_some());
            assert!(!render.standalone);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_search_arguments() {
    let args = CliArgs::parse_from(["gitreader", "search", "rust", "web", "--page", "3"]);

    match args.command.expect("search command") {
        Command::Search(search) => {
            assert_eq!(search.query, vec!["rust".to_string(), "web".to_string()]);
            assert_eq!(search.page, 3);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "gitreader",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--render-cache-capacity",
        "16",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.render.cache_capacity, Some(16));
        }
        _ => panic!("wrong command parsed"),
    }
}
