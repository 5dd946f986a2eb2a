// Integration tests for generator execution: scripts run end to end

use gentty::interpreter::Interpreter;
use gentty::parser::parse_source;
use gentty::runtime::exception::ExceptionKind;

fn run(source: &str) -> Vec<String> {
    let program = parse_source(source).expect("Parsing failed");
    let mut interpreter = Interpreter::new(10_000);
    let result = interpreter.run(&program);
    assert!(result.is_ok(), "Execution failed: {:?}", result);
    interpreter.output()
}

fn run_failing(source: &str) -> (Vec<String>, ExceptionKind) {
    let program = parse_source(source).expect("Parsing failed");
    let mut interpreter = Interpreter::new(10_000);
    let err = interpreter.run(&program).expect_err("Execution should fail");
    let kind = err.exception().map(|e| e.kind).expect("uncaught exception");
    (interpreter.output(), kind)
}

#[test]
fn test_simple_generator() {
    let output = run(r#"
def multiplier(first, second):
    y = first * second
    yield y
    y *= second
    yield y
    y *= second
    yield y
    y *= second
    yield y

print(list(multiplier(1, 20)))
"#);
    assert_eq!(output, ["[20, 400, 8000, 160000]"]);
}

#[test]
fn test_loop_generator() {
    let output = run(r#"
def fizz_buzz(start, stop):
    for i in range(start, stop):
        found = False
        if i % 2 == 0:
            yield 'fizz'
            found = True
        if i % 3 == 0:
            yield 'buzz'
            found = True
        if not found:
            yield i

print(list(fizz_buzz(1, 20)))
"#);
    assert_eq!(
        output,
        ["[1, 'fizz', 'buzz', 'fizz', 5, 'fizz', 'buzz', 7, 'fizz', 'buzz', 'fizz', 11, 'fizz', 'buzz', 13, 'fizz', 'buzz', 'fizz', 17, 'fizz', 'buzz', 19]"]
    );
}

#[test]
fn test_simplest_generator() {
    let output = run(r#"
def somegen():
    yield 1
    yield 2
    yield 3

for i in somegen():
    print(i)
"#);
    assert_eq!(output, ["1", "2", "3"]);
}

#[test]
fn test_body_runs_lazily() {
    let output = run(r#"
def gen():
    print('start')
    yield 1
    print('middle')
    yield 2
    print('end')

g = gen()
print('created')
print(next(g))
print(next(g))
print(next(g, 'done'))
"#);
    assert_eq!(output, ["created", "start", "1", "middle", "2", "end", "done"]);
}

#[test]
fn test_independent_instances() {
    let output = run(r#"
def counter(n):
    i = 0
    while i < n:
        yield i
        i += 1

a = counter(3)
b = counter(3)
print(next(a), next(a), next(b), next(a))
"#);
    assert_eq!(output, ["0 1 0 2"]);
}

#[test]
fn test_yield_from_not_used() {
    let output = run(r#"
def unused():
    yield from range(5)

    print('Hello, world!')
"#);
    assert!(output.is_empty());
}

#[test]
fn test_yield_from_used() {
    let (output, kind) = run_failing(r#"
def using_yieldfrom():
    yield from range(5)

for i in using_yieldfrom():
    print(i)
"#);
    assert!(output.is_empty());
    assert_eq!(kind, ExceptionKind::NotImplementedError);
}

#[test]
fn test_break_out_of_generator_loop() {
    let output = run(r#"
def naturals():
    n = 0
    while True:
        yield n
        n += 1

for n in naturals():
    if n > 3:
        break
    print(n)
print('after')
"#);
    assert_eq!(output, ["0", "1", "2", "3", "after"]);
}

#[test]
fn test_generator_feeding_generator() {
    let output = run(r#"
def numbers(n):
    for i in range(n):
        yield i

def squares(source):
    for x in source:
        yield x * x

print(list(squares(numbers(5))))
"#);
    assert_eq!(output, ["[0, 1, 4, 9, 16]"]);
}

#[test]
fn test_return_value_becomes_stop_iteration() {
    let output = run(r#"
def gen():
    try:
        yield 1
        return 5
    finally:
        print('fin')

g = gen()
next(g)
try:
    next(g)
except StopIteration as e:
    print(e)
"#);
    assert_eq!(output, ["fin", "5"]);
}

#[test]
fn test_handler_in_generator_catches_body_error() {
    let output = run(r#"
def safe_div(divisors):
    for d in divisors:
        try:
            yield 10 // d
        except ZeroDivisionError:
            yield 'inf'

print(list(safe_div([2, 0, 5])))
"#);
    assert_eq!(output, ["[5, 'inf', 2]"]);
}

#[test]
fn test_uncaught_error_closes_generator() {
    let output = run(r#"
def gen():
    yield 1
    x = 1 / 0
    yield 2

g = gen()
next(g)
try:
    next(g)
except ZeroDivisionError:
    print('caught')
print(next(g, 'exhausted'))
"#);
    assert_eq!(output, ["caught", "exhausted"]);
}

#[test]
fn test_stop_iteration_inside_generator() {
    let (_, kind) = run_failing(r#"
def gen():
    yield 1
    raise StopIteration

print(list(gen()))
"#);
    assert_eq!(kind, ExceptionKind::RuntimeError);
}

#[test]
fn test_generator_reentry_is_rejected() {
    let output = run(r#"
def gen():
    yield next(g)

g = gen()
try:
    next(g)
except ValueError:
    print('already running')
"#);
    assert_eq!(output, ["already running"]);
}

#[test]
fn test_drive_history_records_each_drive() {
    let program = parse_source(
        "def gen():\n    yield 1\n    yield 2\nfor x in gen():\n    pass\n",
    )
    .unwrap();
    let mut interpreter = Interpreter::new(100);
    interpreter.run(&program).unwrap();
    let ops: Vec<_> = interpreter.trace().iter().map(|e| e.outcome.clone()).collect();
    assert_eq!(ops.len(), 3);
    assert!(ops[0].contains('1'));
    assert!(ops[1].contains('2'));
}

#[test]
fn test_trace_limit_ends_run() {
    let program = parse_source(
        "def gen():\n    while True:\n        yield 1\nfor x in gen():\n    pass\n",
    )
    .unwrap();
    let mut interpreter = Interpreter::new(50);
    let err = interpreter.run(&program).unwrap_err();
    assert!(matches!(
        err,
        gentty::interpreter::errors::RuntimeError::TraceLimit { limit: 50 }
    ));
    assert_eq!(interpreter.trace().len(), 50);
}

#[test]
fn test_for_and_list_step_through_iteration_drives() {
    let program = parse_source(
        "def gen():\n    yield 1\n    return 9\nfor x in gen():\n    pass\nitems = list(gen())\nprint(items)\n",
    )
    .unwrap();
    let mut interpreter = Interpreter::new(100);
    interpreter.run(&program).unwrap();
    assert_eq!(interpreter.output(), ["[1]"]);
    let drives: Vec<_> = interpreter
        .trace()
        .iter()
        .map(|e| (e.operation, e.outcome.clone()))
        .collect();
    assert_eq!(drives.len(), 4);
    assert!(drives.iter().all(|(op, _)| *op == "iter"));
    assert_eq!(drives[0].1, "produced 1");
    assert_eq!(drives[1].1, "completed");
}
