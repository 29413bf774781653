//! End-to-end coverage driving the loader, resolver and query engine
//! together the way a running session would, rather than one module in
//! isolation.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use vela_core::lexer::Position;
use vela_core::loader::{self, SearchPaths};
use vela_core::query::{code_actions, rename};
use vela_core::resolver::{self, ResolvedProgram};
use vela_core::session::Session;

fn scratch_dir(name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "vela-scenarios-{name}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_module(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(format!("{name}.vl"));
    std::fs::write(&path, contents).unwrap();
    path
}

fn build(dir: &Path, entry: &Path) -> ResolvedProgram {
    let search = SearchPaths::new(dir.to_path_buf());
    let loaded = loader::load_program(entry, &search);
    resolver::resolve(loaded)
}

/// A module exporting a routine and another importing and calling it;
/// renaming at either site rewrites both files' call and declaration.
#[test]
fn rename_across_modules_rewrites_both_files() {
    let dir = scratch_dir("rename");
    let a = write_module(
        &dir,
        "A",
        "module lib A;\n\
routine Helper(): Integer;\n\
begin\n\
end\n",
    );
    write_module(
        &dir,
        "B",
        "module lib B;\n\
import A;\n\
routine Run(): Integer;\n\
begin\n\
  return A.Helper();\n\
end\n",
    );

    let program = build(&dir, &a);
    let a_file = a.to_string_lossy().into_owned();

    // Position of "Helper" in its own declaration line.
    let declaration = Position::new(2, 9);
    let edit = rename::rename(&program, &a_file, declaration, "Compute").expect("renames");

    assert_eq!(edit.changes.len(), 2, "both A and B are touched");
    for edits in edit.changes.values() {
        assert_eq!(edits.len(), 1, "exactly one edit per file");
        assert_eq!(edits[0].new_text, "Compute");
    }
}

/// Renaming to something that is not a legal identifier is rejected before
/// any edit is produced.
#[test]
fn rename_to_an_invalid_identifier_is_rejected() {
    let dir = scratch_dir("rename-invalid");
    let a = write_module(
        &dir,
        "A",
        "module lib A;\n\
routine Helper(): Integer;\n\
begin\n\
end\n",
    );
    let program = build(&dir, &a);
    let a_file = a.to_string_lossy().into_owned();
    let declaration = Position::new(2, 9);

    let err = rename::rename(&program, &a_file, declaration, "not an identifier").unwrap_err();
    assert_eq!(err, vela_core::query::rename::RenameError::InvalidIdentifier);
}

/// A module header missing its exe/lib/dll kind offers all three quick
/// fixes, each inserting the kind keyword right after `module`.
#[test]
fn missing_module_kind_offers_three_quick_fixes() {
    let dir = scratch_dir("missing-kind");
    let main = write_module(&dir, "M", "module M;\nbegin\nend\n");
    let program = build(&dir, &main);
    let file = main.to_string_lossy().into_owned();

    assert_eq!(program.diagnostics.len(), 1);
    let diag = &program.diagnostics[0];
    assert_eq!(diag.code, vela_core::diagnostic::Code::MissingModuleKind);

    let actions = code_actions::code_actions(&program, &file, diag.position);
    assert_eq!(actions.len(), 3);

    let titles: Vec<&str> = actions.iter().map(|a| a.title.as_str()).collect();
    assert!(titles.contains(&"Insert EXE module type"));
    assert!(titles.contains(&"Insert DLL module type"));
    assert!(titles.contains(&"Insert LIB module type"));

    for action in &actions {
        assert_eq!(action.edits.len(), 1);
        assert!(action.edits[0].new_text.ends_with(' '), "kind keyword is followed by a space");
    }
}

/// Two record types whose parent chains point at each other: the resolver
/// reports one diagnostic per participant, breaks both links, and leaves
/// textual references to either type still resolvable.
#[test]
fn mutually_inheriting_records_each_get_one_cycle_diagnostic() {
    let dir = scratch_dir("cycle");
    let main = write_module(
        &dir,
        "Main",
        "module exe Main;\n\
type TA = record(TB) X: Integer; end;\n\
type TB = record(TA) Y: Integer; end;\n\
var a: TA;\n\
begin\n\
end\n",
    );
    let program = build(&dir, &main);
    let file = main.to_string_lossy().into_owned();

    let cycle_diagnostics: Vec<_> = program
        .diagnostics
        .iter()
        .filter(|d| d.code == vela_core::diagnostic::Code::InheritanceCycle)
        .collect();
    assert_eq!(cycle_diagnostics.len(), 2, "one diagnostic per cycle participant");

    // `TA` on the `var a: TA;` line still resolves to its own declaration.
    let use_of_ta = Position::new(4, 8);
    let references = vela_core::query::navigation::references(&program, &file, use_of_ta);
    assert!(!references.is_empty(), "TA's declaration and uses remain navigable");
}

/// A full session lifecycle: discover a project, open a buffer with
/// unsaved edits, rebuild, and see those edits reflected in query results —
/// but only after a trigger that actually causes a rebuild.
#[test]
fn session_rebuild_picks_up_open_buffer_contents() {
    let dir = scratch_dir("session");
    std::fs::create_dir_all(dir.join("src")).unwrap();
    let main_path = dir.join("src").join("Main.vl");
    std::fs::write(&main_path, "module exe Main;\nbegin\nend\n").unwrap();

    let mut session = Session::new(dir.clone(), main_path.clone());
    assert!(session.program().is_none(), "no rebuild has happened yet");

    session.open(main_path.clone(), "module exe Main;\nconst Answer = 42;\nbegin\nend\n".to_string());
    session.rebuild();

    let program = session.program().expect("rebuilt");
    assert!(program.symbols.find_in_module("Main", "Answer").is_some());

    // didChange alone never triggers a rebuild; only open/save do, so a
    // further buffer update without a rebuild call leaves the old program in
    // place (the staleness every query already accepts).
    session.update(&main_path, "module exe Main;\nbegin\nend\n".to_string());
    let stale_program = session.program().expect("still the last built program");
    assert!(stale_program.symbols.find_in_module("Main", "Answer").is_some());
}
