use quire_core::{Editor, INSERT_TEXT, REDO, UNDO};
use quire_extensions::builtin::{self, character_limit, context_menu, history};
use quire_extensions::{compose, Overrides};
use std::io::Write;

fn type_text(editor: &Editor, text: &str) {
    for c in text.chars() {
        editor.dispatch_command(&INSERT_TEXT, c.to_string());
    }
}

#[test]
fn builtins_compose_with_overrides_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"max-length": {{"max_length": 5}}, "character-limit": {{"max_length": 5}}}}"#
    )
    .unwrap();
    let overrides = Overrides::from_path(file.path()).unwrap();

    let composition = compose(&builtin::all().unwrap(), overrides).unwrap();
    let editor = composition.editor().unwrap();
    let limit = composition
        .output::<character_limit::CharacterLimitOutput>(character_limit::NAME)
        .unwrap();

    type_text(editor, "abcdefg");
    assert_eq!(editor.state().text_content(), "abcde");
    assert_eq!(limit.count.get(), 5);
    assert_eq!(limit.remaining.get(), 0);
    assert!(!limit.is_over_limit());
}

#[test]
fn restored_overflow_is_not_an_undo_step() {
    let overrides = Overrides::from_json_str(r#"{"max-length": {"max_length": 3}}"#).unwrap();
    let composition = compose(&builtin::all().unwrap(), overrides).unwrap();
    let editor = composition.editor().unwrap();
    let output = composition.output::<history::HistoryOutput>(history::NAME).unwrap();

    type_text(editor, "abcd");
    assert_eq!(editor.state().text_content(), "abc");
    assert_eq!(output.undo_depth(), 1);

    assert!(editor.dispatch_command(&UNDO, ()));
    assert_eq!(editor.state().text_content(), "");
    assert!(output.can_redo.get());
    assert!(editor.dispatch_command(&REDO, ()));
    assert_eq!(editor.state().text_content(), "abc");
}

#[test]
fn every_builtin_can_be_disabled_and_enabled_again() {
    let composition = compose(&builtin::all().unwrap(), Overrides::new()).unwrap();
    let editor = composition.editor().unwrap();
    let baseline = editor.listener_count();
    assert!(baseline > 0);

    let names: Vec<String> = composition.names().unwrap().map(str::to_string).collect();
    for name in &names {
        composition.config(name).unwrap().set_disabled(true).unwrap();
    }
    assert_eq!(editor.listener_count(), 0);
    let menu = composition
        .output::<context_menu::ContextMenuOutput>(context_menu::NAME)
        .unwrap();
    assert!(menu.entries.get().is_empty());

    for name in &names {
        composition.config(name).unwrap().set_disabled(false).unwrap();
    }
    assert_eq!(editor.listener_count(), baseline);
    assert!(!menu.entries.get().is_empty());
}
