//! Integration-level checks for the properties listed in the
//! specification's testable-properties section, driven through the
//! library's public `scanner`/`parser`/`analyzer`/`evaluator` API.

use uguisu::analyzer::analyze;
use uguisu::evaluator::{run, HostOptions};
use uguisu::parser::parse;
use uguisu::scanner::{Scanner, Token};
use uguisu::types::Type;

#[test]
fn scanner_totality_always_terminates_at_eof() {
    for src in ["", "   \t\r\n", "fn main(){}", "// comment only", "1 + 2 * (3 - 4)"] {
        let mut scanner = Scanner::new(src).expect("well-formed sources scan");
        let mut steps = 0;
        loop {
            steps += 1;
            assert!(steps < 10_000, "scanner did not reach EOF for {src:?}");
            if matches!(scanner.token(), Token::Eof { .. }) {
                break;
            }
            scanner.advance().unwrap();
        }
    }
}

#[test]
fn token_position_matches_first_character_of_lexeme() {
    let mut scanner = Scanner::new("  foo").unwrap();
    assert_eq!(scanner.pos().line, 1);
    assert_eq!(scanner.pos().column, 3);
}

#[test]
fn parsing_the_same_source_twice_is_deterministic() {
    let source = "struct P { x: number, y: number } fn dist(a: P, b: P): number { return a.x - b.x; } fn main(){}";
    let first = parse(source, "t.ug").unwrap();
    let second = parse(source, "t.ug").unwrap();
    assert_eq!(first, second);
}

#[test]
fn analyzer_idempotence_on_a_successful_program() {
    let file = parse(
        "fn main(){ var x = 1; loop { if x == 5 { break; } x = x + 1; } assertEq(x, 5); }",
        "t.ug",
    )
    .unwrap();
    let first = analyze(&file);
    let second = analyze(&file);
    assert!(first.success && second.success);
    assert_eq!(first.errors, second.errors);
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn scope_discipline_inner_declaration_does_not_escape_its_block() {
    let file = parse("fn main(){ loop { var inner = 1; break; } printNum(inner); }", "t.ug").unwrap();
    let outcome = analyze(&file);
    assert!(!outcome.success);
}

#[test]
fn shadowed_outer_name_is_restored_after_the_inner_block_ends() {
    let file = parse(
        "fn main(){ var x = 1; loop { var x = 2; assertEq(x, 2); break; } assertEq(x, 1); }",
        "t.ug",
    )
    .unwrap();
    assert!(analyze(&file).success);
    assert!(run(&file, &HostOptions::silent()).is_ok());
}

#[test]
fn closure_slot_semantics_fork_shares_a_mutated_slot() {
    // A function value's captured environment is a `fork()` of the
    // defining scope (see `evaluator::run`'s setup loop): later mutation
    // of a shared layer through one handle is visible through every
    // other handle forked from it, which is what lets a closure observe
    // updates the enclosing function makes after the closure was made.
    let mut defining_scope: uguisu::scope::Scope<std::rc::Rc<std::cell::RefCell<i64>>> = uguisu::scope::Scope::new();
    defining_scope.define("counter", std::rc::Rc::new(std::cell::RefCell::new(1)));

    let captured_by_closure = defining_scope.fork();

    *defining_scope.lookup("counter").unwrap().borrow_mut() = 2;

    assert_eq!(*captured_by_closure.lookup("counter").unwrap().borrow(), 2);
}

#[test]
fn loop_body_observes_updates_made_to_variables_from_earlier_iterations() {
    let file = parse(
        "fn main(){ var total = 0; var i = 0; loop { if i == 4 { break; } total = total + i; i = i + 1; } assertEq(total, 6); }",
        "t.ug",
    )
    .unwrap();
    assert!(analyze(&file).success);
    assert!(run(&file, &HostOptions::silent()).is_ok());
}

#[test]
fn break_outside_loop_is_rejected_but_break_in_nested_if_inside_loop_is_accepted() {
    let rejected = parse("fn main(){ break; }", "t.ug").unwrap();
    assert!(!analyze(&rejected).success);

    let accepted = parse("fn main(){ loop { if true { break; } } }", "t.ug").unwrap();
    assert!(analyze(&accepted).success);
}

#[test]
fn type_compatibility_laws_hold() {
    let named = Type::named("A");
    assert!(named.compatible(&named));
    assert!(Type::Bad.compatible(&named));
    assert!(named.compatible(&Type::Bad));
    assert!(!Type::Void.compatible(&named));
    assert!(!named.compatible(&Type::Void));
    assert!(Type::Void.compatible(&Type::Void));
}
