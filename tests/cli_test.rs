use clap::Parser;
use skel::cli::{Args, Command, TemplateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

fn make_args(args: &[&str]) -> Vec<OsString> {
    let mut res = vec![OsString::from("skel")];
    res.extend(args.iter().map(OsString::from));
    res
}

#[test]
fn test_create_from_spec() {
    let parsed = Args::try_parse_from(make_args(&["create", "./output", "--spec", "spec.json"]))
        .unwrap();

    assert!(!parsed.verbose);
    match parsed.command {
        Command::Create(create) => {
            assert_eq!(create.output_dir, PathBuf::from("./output"));
            assert_eq!(create.spec, Some(PathBuf::from("spec.json")));
            assert_eq!(create.template, None);
            assert!(!create.backup);
            assert!(!create.no_backup);
            assert!(!create.yes);
        }
        other => panic!("Expected create command, got {:?}", other),
    }
}

#[test]
fn test_create_flags() {
    let parsed = Args::try_parse_from(make_args(&[
        "-v",
        "create",
        "out",
        "-t",
        "rust-cli",
        "--backup",
        "--allow-unknown",
        "--open-editor",
        "--editor",
        "vim",
        "-y",
    ]))
    .unwrap();

    assert!(parsed.verbose);
    let Command::Create(create) = parsed.command else {
        panic!("Expected create command");
    };
    assert_eq!(create.template.as_deref(), Some("rust-cli"));
    assert!(create.backup);
    assert!(create.allow_unknown);
    assert!(create.open_editor);
    assert_eq!(create.editor.as_deref(), Some("vim"));
    assert!(create.yes);
}

#[test]
fn test_create_requires_a_source() {
    assert!(Args::try_parse_from(make_args(&["create", "out"])).is_err());
}

#[test]
fn test_spec_and_template_conflict() {
    let args = make_args(&["create", "out", "--spec", "a.json", "--template", "b"]);
    assert!(Args::try_parse_from(args).is_err());
}

#[test]
fn test_backup_flags_conflict() {
    let args = make_args(&["create", "out", "-s", "a.json", "--backup", "--no-backup"]);
    assert!(Args::try_parse_from(args).is_err());
}

#[test]
fn test_template_save() {
    let parsed = Args::try_parse_from(make_args(&[
        "--home",
        "/tmp/skel",
        "template",
        "save",
        "web",
        "--spec",
        "web.json",
        "-d",
        "static site",
    ]))
    .unwrap();

    assert_eq!(parsed.home, Some(PathBuf::from("/tmp/skel")));
    match parsed.command {
        Command::Template(TemplateCommand::Save { name, spec, description, title }) => {
            assert_eq!(name, "web");
            assert_eq!(spec, PathBuf::from("web.json"));
            assert_eq!(description, "static site");
            assert_eq!(title, None);
        }
        other => panic!("Expected template save, got {:?}", other),
    }
}

#[test]
fn test_history_summary() {
    let parsed = Args::try_parse_from(make_args(&["history", "--summary"])).unwrap();
    match parsed.command {
        Command::History(history) => assert!(history.summary),
        other => panic!("Expected history command, got {:?}", other),
    }
}

#[test]
fn test_missing_subcommand() {
    assert!(Args::try_parse_from(make_args(&[])).is_err());
}
