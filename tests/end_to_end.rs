//! The eight concrete source-to-result scenarios from the specification,
//! driven through the library's public `run` entry point rather than the
//! compiled binary.

use std::cell::RefCell;
use std::rc::Rc;

use uguisu::evaluator::HostOptions;
use uguisu::UguisuError;

fn run_ok(source: &str) {
    let result = uguisu::run(source, "t.ug", &HostOptions::silent());
    assert!(result.is_ok(), "expected success, got {result:?}");
}

fn analysis_error_contains(source: &str, needle: &str) {
    let result = uguisu::run(source, "t.ug", &HostOptions::silent());
    match result {
        Err(UguisuError::Analysis(errors)) => {
            assert!(
                errors.iter().any(|e| e.message.contains(needle)),
                "expected an error containing {needle:?}, got {errors:?}"
            );
        }
        other => panic!("expected an analysis error, got {other:?}"),
    }
}

#[test]
fn scenario_1_simple_arithmetic_and_assert() {
    run_ok("fn main(){ var x = 1 + 2; assertEq(x, 3); }");
}

#[test]
fn scenario_2_function_call_with_params() {
    run_ok("fn add(x:number,y:number):number{ return x+y; } fn main(){ assertEq(add(1,2), 3); }");
}

#[test]
fn scenario_3_recursive_function() {
    run_ok(
        "fn calc(x:number):number{ if x==0 { return 1; } else { return calc(x-1)*2; } } fn main(){ assertEq(calc(8), 256); }",
    );
}

#[test]
fn scenario_4_loop_with_break_and_compound_assignment() {
    run_ok("fn main(){ var i=0; var x=1; loop{ if i==10 { break; } x = x*2; i = i+1; } assertEq(x, 1024); }");
}

#[test]
fn scenario_5_break_outside_loop_is_an_analyzer_error() {
    analysis_error_contains("fn main(){ break; }", "invalid break statement");
}

#[test]
fn scenario_6_reading_unassigned_variable_is_an_analyzer_error() {
    analysis_error_contains(
        "fn main(){ var x: number; printNum(x); }",
        "variable is not assigned yet.",
    );
}

#[test]
fn scenario_7_struct_field_read_and_write() {
    run_ok(
        "struct A { value: number } fn main(){ var a = new A { value: 1 }; assertEq(a.value, 1); a.value = 2; assertEq(a.value, 2); }",
    );
}

#[test]
fn scenario_8_array_index_read_and_write() {
    run_ok("fn main(){ var a = [1,2]; assertEq(a[0], 1); a[0] = 3; assertEq(a[0], 3); }");
}

#[test]
fn print_str_output_is_observable_through_host_options() {
    let captured = Rc::new(RefCell::new(String::new()));
    let sink = captured.clone();
    let options = HostOptions::with_stdout(move |s| sink.borrow_mut().push_str(s));
    let result = uguisu::run("fn main(){ printStr(\"hello\"); }", "t.ug", &options);
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(*captured.borrow(), "hello");
}

#[test]
fn missing_main_is_a_runtime_error_at_the_library_boundary() {
    let result = uguisu::run("fn helper(){}", "t.ug", &HostOptions::silent());
    match result {
        Err(UguisuError::Runtime(e)) => assert!(e.message.contains("function `main` is not found")),
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn parse_error_surfaces_with_position() {
    let result = uguisu::run("fn main( {", "t.ug", &HostOptions::silent());
    match result {
        Err(UguisuError::Parse(e)) => {
            assert!(e.message.starts_with("unexpected token"));
            assert_eq!(e.position.line, 1);
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}
