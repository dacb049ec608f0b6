use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.views.null_string = Some("-".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        views: ViewOverrides {
            null_string: Some("n/a".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.views.null_string, "n/a");
}

#[test]
fn view_defaults_match_the_container_layout() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let views = settings.views;
    assert_eq!(views.null_string, "");
    assert_eq!(views.view_prefixes, ["WEB-INF", ""]);
    assert_eq!(views.view_suffixes, [".html"]);
    assert_eq!(views.default_character_encoding, "UTF-8");
    assert_eq!(views.default_locale, Locale::EN_US);
    assert_eq!(views.time_zone, Tz::UTC);
    assert_eq!(settings.server.resource_dir, PathBuf::from("site"));
}

#[test]
fn view_overrides_replace_lists_and_normalize() {
    let mut raw = RawSettings::default();
    let overrides = ViewOverrides {
        view_prefixes: vec!["/templates/".to_string(), String::new()],
        view_suffixes: vec![".ssp".to_string(), ".html".to_string()],
        default_locale: Some("de_DE".to_string()),
        time_zone: Some("Europe/Berlin".to_string()),
        default_encoding: Some("latin1".to_string()),
        ..Default::default()
    };

    raw.apply_view_overrides(&overrides);
    let views = Settings::from_raw(raw).expect("valid settings").views;

    assert_eq!(views.view_prefixes, ["templates", ""]);
    assert_eq!(views.view_suffixes, [".ssp", ".html"]);
    assert_eq!(views.default_locale, Locale::DE_DE);
    assert_eq!(views.time_zone, chrono_tz::Europe::Berlin);
    assert_eq!(views.default_character_encoding, "windows-1252");
}

#[test]
fn invalid_view_settings_name_the_key() {
    let cases: [(&str, fn(&mut RawViewSettings)); 4] = [
        ("views.suffixes", |views| views.suffixes = Some(Vec::new())),
        ("views.default_character_encoding", |views| {
            views.default_character_encoding = Some("klingon-8".to_string())
        }),
        ("views.default_locale", |views| {
            views.default_locale = Some("tlh".to_string())
        }),
        ("views.time_zone", |views| {
            views.time_zone = Some("Mars/Olympus_Mons".to_string())
        }),
    ];

    for (expected_key, corrupt) in cases {
        let mut raw = RawSettings::default();
        corrupt(&mut raw.views);
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected invalid `{expected_key}`, got {other:?}"),
        }
    }
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "server.port",
            ..
        })
    ));
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
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["vista"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "vista",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--resource-dir",
        "/srv/site",
        "--view-prefix",
        "",
        "--null-string",
        "-",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.resource_dir.as_deref(),
                Some(std::path::Path::new("/srv/site"))
            );
            assert_eq!(serve.overrides.views.view_prefixes, [""]);
            assert_eq!(serve.overrides.views.null_string.as_deref(), Some("-"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_candidates_arguments() {
    let args = CliArgs::parse_from([
        "vista",
        "candidates",
        "app.Person",
        "app.Base",
        "--view",
        "card",
        "--view-suffix",
        ".ssp",
    ]);

    match args.command.expect("candidates command") {
        Command::Candidates(candidates) => {
            assert_eq!(candidates.types, ["app.Person", "app.Base"]);
            assert_eq!(candidates.view, "card");
            assert_eq!(candidates.views.view_suffixes, [".ssp"]);
        }
        _ => panic!("wrong command parsed"),
    }
}
