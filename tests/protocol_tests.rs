// Integration tests for send / throw / close and the direct object API

use gentty::generator::iter::step_shared;
use gentty::generator::{
    decompose_function, DriveResult, GeneratorError, GeneratorIter, GeneratorObject, GeneratorRef,
    Phase, ResumeSignal,
};
use gentty::interpreter::Interpreter;
use gentty::parser::ast::Stmt;
use gentty::parser::parse_source;
use gentty::runtime::exception::{Exception, ExceptionKind};
use gentty::runtime::value::Value;

fn run(source: &str) -> Vec<String> {
    let program = parse_source(source).expect("Parsing failed");
    let mut interpreter = Interpreter::new(10_000);
    let result = interpreter.run(&program);
    assert!(result.is_ok(), "Execution failed: {:?}", result);
    interpreter.output()
}

/// Compile the first `def` in `source` into a fresh object
fn object(source: &str, args: Vec<Value>) -> GeneratorObject {
    let program = parse_source(source).expect("Parsing failed");
    let Some(Stmt::FunctionDef(def)) = program.body.first() else {
        panic!("expected a function definition");
    };
    let descriptor = decompose_function(def).expect("decomposition failed");
    GeneratorObject::new(descriptor, args).expect("arity")
}

fn produced(result: Result<DriveResult, GeneratorError>) -> String {
    match result {
        Ok(DriveResult::Produced(v)) => v.repr(),
        other => panic!("expected a produced value, got {:?}", other),
    }
}

#[test]
fn test_generator_send() {
    let output = run(r#"
def gen():
    a = yield
    print(a)

g = gen()
next(g)
try:
    g.send("Hello World")
except StopIteration:
    pass
"#);
    assert_eq!(output, ["Hello World"]);
}

#[test]
fn test_generator_multi_send() {
    let output = run(r#"
def gen():
    a = yield 1
    print(a)
    b = yield 2
    print(b)

g = gen()
next(g)
try:
    print(g.send("a"))
    print(g.send("b"))
except StopIteration:
    pass
"#);
    assert_eq!(output, ["a", "2", "b"]);
}

#[test]
fn test_generator_send_loop() {
    let output = run(r#"
def gen():
    for i in range(1, 5):
        a = yield i
        print("printing from generator " + str(a))

g = gen()
g.send(None)
try:
    while True:
        b = g.send(1)
        print("printing from user " + str(b))
except StopIteration:
    pass
"#);
    assert_eq!(
        output,
        [
            "printing from generator 1",
            "printing from user 2",
            "printing from generator 1",
            "printing from user 3",
            "printing from generator 1",
            "printing from user 4",
            "printing from generator 1",
        ]
    );
}

#[test]
fn test_send_non_none_to_fresh_generator() {
    let output = run(r#"
def gen():
    print("never")
    yield 1

g = gen()
try:
    g.send(1)
except TypeError:
    print("rejected")
print(next(g))
"#);
    assert_eq!(output, ["rejected", "never", "1"]);
}

#[test]
fn test_generator_throw_on_starting() {
    let output = run(r#"
def gen():
    yield "Hello World"

g = gen()
try:
    g.throw(ZeroDivisionError)
except ZeroDivisionError:
    print("propagated")
print(next(g, "closed"))
"#);
    assert_eq!(output, ["propagated", "closed"]);
}

#[test]
fn test_generator_throw_other_exception() {
    let output = run(r#"
def gen():
    try:
        yield
        print("Hello World")
    except ZeroDivisionError:
        raise TypeError

g = gen()
next(g)
try:
    g.throw(ZeroDivisionError)
except TypeError:
    print("translated")
"#);
    assert_eq!(output, ["translated"]);
}

#[test]
fn test_generator_throw_complex() {
    let output = run(r#"
def gen():
    try:
        yield "from try block"
    except TypeError:
        yield "from catch block"

    yield "from outside try-except"
    a = yield
    print(a)

g = gen()
print(next(g))
print(g.throw(TypeError))
print(next(g))
print(g.send("message"))
"#);
    assert_eq!(
        output,
        [
            "from try block",
            "from catch block",
            "from outside try-except",
            "None",
        ]
    );
}

#[test]
fn test_generator_close() {
    let output = run(r#"
def gen():
    print("Hello world")
    try:
        yield
    except TypeError:
        pass
    except ZeroDivisionError:
        pass

g = gen()
print(g.close())
try:
    print(next(g))
except StopIteration:
    print("stopped")
"#);
    assert_eq!(output, ["None", "stopped"]);
}

#[test]
fn test_generator_close_ignore_exit() {
    let output = run(r#"
def gen():
    try:
        yield
    except TypeError:
        pass
    except GeneratorExit:
        yield "exit ignored"

g = gen()
next(g)
try:
    g.close()
except RuntimeError:
    print("ignored exit")
"#);
    assert_eq!(output, ["ignored exit"]);
}

#[test]
fn test_generator_close_exception_propagation() {
    let output = run(r#"
def gen():
    try:
        yield
    except GeneratorExit:
        raise OSError

g = gen()
next(g)
try:
    g.close()
except OSError:
    print("propagated")
"#);
    assert_eq!(output, ["propagated"]);
}

#[test]
fn test_generator_close_twice() {
    let output = run(r#"
def gen():
    yield 1
    yield 2

g = gen()
print(g.close())
print(g.close())
"#);
    assert_eq!(output, ["None", "None"]);
}

#[test]
fn test_close_runs_finally() {
    let output = run(r#"
def gen():
    try:
        yield 1
    finally:
        print("cleanup")

g = gen()
print(next(g))
g.close()
print("after")
"#);
    assert_eq!(output, ["1", "cleanup", "after"]);
}

#[test]
fn test_close_returns_value_of_caught_exit() {
    let output = run(r#"
def gen():
    try:
        yield 1
    except GeneratorExit:
        return "bye"

g = gen()
next(g)
print(g.close())
"#);
    assert_eq!(output, ["bye"]);
}

#[test]
fn test_throw_generator_exit_is_rejected() {
    let output = run(r#"
def gen():
    yield 1

g = gen()
try:
    g.throw(GeneratorExit)
except TypeError:
    print("reserved")
"#);
    assert_eq!(output, ["reserved"]);
}

// Direct object API, with the interpreter as host

const COUNTDOWN: &str = "def countdown(n):\n    while n > 0:\n        received = yield n\n        if received is not None:\n            n = received\n        else:\n            n -= 1\n    return 'liftoff'\n";

#[test]
fn test_object_phases() {
    let mut host = Interpreter::new(100);
    let mut gen = object(COUNTDOWN, vec![Value::Int(2)]);
    assert_eq!(gen.phase(), Phase::Created);

    assert_eq!(produced(gen.advance(&mut host)), "2");
    assert_eq!(gen.phase(), Phase::Suspended);
    assert_eq!(produced(gen.advance(&mut host)), "1");

    match gen.advance(&mut host) {
        Ok(DriveResult::Completion(Some(Value::Str(s)))) => assert_eq!(&*s, "liftoff"),
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(gen.phase(), Phase::Completed);

    // Finished generators keep completing without a value
    assert!(matches!(gen.advance(&mut host), Ok(DriveResult::Completion(None))));
}

#[test]
fn test_object_drive_with_value() {
    let mut host = Interpreter::new(100);
    let mut gen = object(COUNTDOWN, vec![Value::Int(5)]);
    assert_eq!(produced(gen.advance(&mut host)), "5");
    let result = gen.drive_with(&mut host, ResumeSignal::Value(Value::Int(9)));
    assert_eq!(produced(result), "9");
}

#[test]
fn test_object_non_none_on_start() {
    let mut host = Interpreter::new(100);
    let mut gen = object(COUNTDOWN, vec![Value::Int(5)]);
    let err = gen
        .drive_with(&mut host, ResumeSignal::Value(Value::Int(1)))
        .unwrap_err();
    assert_eq!(err, GeneratorError::NonNoneOnStart);
    assert_eq!(gen.phase(), Phase::Created);
}

#[test]
fn test_object_throw_into_uncaught() {
    let mut host = Interpreter::new(100);
    let mut gen = object(COUNTDOWN, vec![Value::Int(5)]);
    gen.advance(&mut host).unwrap();
    let err = gen
        .throw_into(&mut host, Exception::bare(ExceptionKind::IndexError))
        .unwrap_err();
    assert!(matches!(err, GeneratorError::Raised(ref e) if e.kind == ExceptionKind::IndexError));
    assert_eq!(gen.phase(), Phase::Completed);
}

#[test]
fn test_object_terminate() {
    let mut host = Interpreter::new(100);

    let mut fresh = object(COUNTDOWN, vec![Value::Int(5)]);
    assert!(matches!(fresh.terminate(&mut host), Ok(None)));
    assert_eq!(fresh.phase(), Phase::Closed);
    assert!(matches!(fresh.terminate(&mut host), Ok(None)));

    let mut suspended = object(COUNTDOWN, vec![Value::Int(5)]);
    suspended.advance(&mut host).unwrap();
    assert!(matches!(suspended.terminate(&mut host), Ok(None)));
    assert_eq!(suspended.phase(), Phase::Closed);
}

#[test]
fn test_object_terminate_ignored() {
    let mut host = Interpreter::new(100);
    let mut gen = object(
        "def stubborn():\n    while True:\n        try:\n            yield 1\n        except GeneratorExit:\n            pass\n",
        Vec::new(),
    );
    gen.advance(&mut host).unwrap();
    assert!(matches!(
        gen.terminate(&mut host),
        Err(GeneratorError::IgnoredTermination)
    ));
    assert!(gen.phase().is_finished());
}

#[test]
fn test_object_arity() {
    let program = parse_source(COUNTDOWN).unwrap();
    let Some(Stmt::FunctionDef(def)) = program.body.first() else {
        panic!("expected a function definition");
    };
    let descriptor = decompose_function(def).unwrap();
    let err = GeneratorObject::new(descriptor, Vec::new()).unwrap_err();
    assert_eq!(err.kind, ExceptionKind::TypeError);
}

#[test]
fn test_iterator_adapter() {
    let mut host = Interpreter::new(100);
    let gen = object(COUNTDOWN, vec![Value::Int(3)]);
    let items: Vec<String> = GeneratorIter::new(gen, &mut host)
        .map(|item| item.unwrap().repr())
        .collect();
    assert_eq!(items, ["3", "2", "1"]);
}

#[test]
fn test_iterator_adapter_stops_after_error() {
    let mut host = Interpreter::new(100);
    let gen = object(
        "def failing():\n    yield 1\n    raise ValueError('bad')\n    yield 2\n",
        Vec::new(),
    );
    let mut iter = GeneratorIter::new(gen, &mut host);
    assert!(matches!(iter.next(), Some(Ok(Value::Int(1)))));
    assert!(matches!(iter.next(), Some(Err(GeneratorError::Raised(_)))));
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
    assert_eq!(iter.generator().phase(), Phase::Completed);
}

#[test]
fn test_throw_stop_iteration_into_fresh_generator() {
    let output = run(r#"
def gen():
    yield 1

g = gen()
try:
    g.throw(StopIteration)
except RuntimeError as e:
    print("RE", e)
except StopIteration:
    print("SI")
print(next(g, "done"))
"#);
    assert_eq!(output, ["RE generator raised StopIteration", "done"]);
}

#[test]
fn test_object_throw_stop_iteration_before_start() {
    let mut host = Interpreter::new(100);
    let mut gen = object(COUNTDOWN, vec![Value::Int(2)]);
    let result = gen.throw_into(&mut host, Exception::bare(ExceptionKind::StopIteration));
    let Err(GeneratorError::Raised(exc)) = result else {
        panic!("expected a raised exception, got {:?}", result);
    };
    assert_eq!(exc.kind, ExceptionKind::RuntimeError);
    assert_eq!(gen.phase(), Phase::Completed);
}

#[test]
fn test_shared_step_adapter() {
    let mut host = Interpreter::new(100);
    let gen = GeneratorRef::new(object(COUNTDOWN, vec![Value::Int(2)]));
    assert!(matches!(step_shared(&gen, &mut host), Ok(Some(Value::Int(2)))));
    assert!(matches!(step_shared(&gen, &mut host), Ok(Some(Value::Int(1)))));
    assert!(matches!(step_shared(&gen, &mut host), Ok(None)));
    assert!(matches!(step_shared(&gen, &mut host), Ok(None)));
}
