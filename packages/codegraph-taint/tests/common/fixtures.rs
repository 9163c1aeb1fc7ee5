//! Scenario fixtures
//!
//! Each fixture returns the program, the handles the tests inspect, and the
//! seeds to run with.

use codegraph_taint::features::taint_analysis::{
    BasicBlock, BasicBlockGraph, EntryPointSeed, Invocation, MethodHandle, Operation, Symbol,
    Value,
};

use super::builders::*;

pub struct Fixture {
    pub program: Program,
    pub handler: MethodHandle,
    pub helper: Option<MethodHandle>,
    pub sink: Symbol,
    /// Locals in declaration order
    pub locals: Vec<Symbol>,
    pub seeds: Vec<EntryPointSeed>,
}

fn tainted_handler(builder: &mut ProgramBuilder, parameters: &[&str]) -> (MethodHandle, Vec<EntryPointSeed>) {
    let handler = builder.method("Handler", parameters);
    let seeds = vec![EntryPointSeed::tainted_parameters(
        handler.method,
        handler.parameters.clone(),
    )];
    (handler, seeds)
}

/// ```text
/// Handler(input) { var s = input; Sink(s); }
/// ```
pub fn direct_flow() -> Fixture {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let (handler, seeds) = tainted_handler(&mut builder, &["input"]);
    let input = handler.parameters[0];
    let s = builder.local("s");
    builder.body(handler.method, vec![copy(s, input), call(sink, &[s])]);

    Fixture {
        program: builder.build(),
        handler,
        helper: None,
        sink,
        locals: vec![s],
        seeds,
    }
}

/// ```text
/// Handler(input) { var s = Sanitize(input); Sink(s); }
/// ```
pub fn sanitized_flow() -> Fixture {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let sanitize = builder.sanitizer("Sanitize");
    let (handler, seeds) = tainted_handler(&mut builder, &["input"]);
    let input = handler.parameters[0];
    let s = builder.local("s");
    builder.body(
        handler.method,
        vec![call_into(s, sanitize, &[input]), call(sink, &[s])],
    );

    Fixture {
        program: builder.build(),
        handler,
        helper: None,
        sink,
        locals: vec![s],
        seeds,
    }
}

/// ```text
/// Handler(input) { Helper(input); }
/// Helper(p)      { Sink(p); }
/// ```
pub fn helper_flow() -> Fixture {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let helper = builder.method("Helper", &["p"]);
    let p = helper.parameters[0];
    builder.body(helper.method, vec![call(sink, &[p])]);

    let (handler, seeds) = tainted_handler(&mut builder, &["input"]);
    let input = handler.parameters[0];
    builder.body(handler.method, vec![call(helper.method, &[input])]);

    Fixture {
        program: builder.build(),
        handler,
        helper: Some(helper),
        sink,
        locals: Vec::new(),
        seeds,
    }
}

/// ```text
/// Handler(a, b) { var x = Helper(a); Sink(x); var y = Helper(b); Sink(y); }
/// Helper(p)     { return p; }
/// ```
pub fn two_call_sites() -> Fixture {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let helper = builder.method("Helper", &["p"]);
    let p = helper.parameters[0];
    builder.body(helper.method, vec![ret(p)]);

    let (handler, seeds) = tainted_handler(&mut builder, &["a", "b"]);
    let (a, b) = (handler.parameters[0], handler.parameters[1]);
    let x = builder.local("x");
    let y = builder.local("y");
    builder.body(
        handler.method,
        vec![
            call_into(x, helper.method, &[a]),
            call(sink, &[x]),
            call_into(y, helper.method, &[b]),
            call(sink, &[y]),
        ],
    );

    Fixture {
        program: builder.build(),
        handler,
        helper: Some(helper),
        sink,
        locals: vec![x, y],
        seeds,
    }
}

/// ```text
/// Handler(a, b) { Helper(a); Helper(b); }
/// Helper(p)     { Sink(p); }
/// ```
pub fn sink_in_shared_helper() -> Fixture {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let helper = builder.method("Helper", &["p"]);
    let p = helper.parameters[0];
    builder.body(helper.method, vec![call(sink, &[p])]);

    let (handler, seeds) = tainted_handler(&mut builder, &["a", "b"]);
    let (a, b) = (handler.parameters[0], handler.parameters[1]);
    builder.body(
        handler.method,
        vec![call(helper.method, &[a]), call(helper.method, &[b])],
    );

    Fixture {
        program: builder.build(),
        handler,
        helper: Some(helper),
        sink,
        locals: Vec::new(),
        seeds,
    }
}

/// Second call to `Helper` is reached only after the first one returned
///
/// ```text
/// Handler(a) { var x = Helper(a); ...; var y = Helper(a); Sink(y); }
/// Helper(p)  { return p; }
/// ```
pub fn delayed_second_call() -> Fixture {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let helper = builder.method("Helper", &["p"]);
    let p = helper.parameters[0];
    builder.body(helper.method, vec![ret(p)]);

    let (handler, seeds) = tainted_handler(&mut builder, &["a"]);
    let a = handler.parameters[0];
    let x = builder.local("x");
    let y = builder.local("y");
    let mut body = vec![call_into(x, helper.method, &[a])];
    body.extend(nops(8));
    body.push(call_into(y, helper.method, &[a]));
    body.push(call(sink, &[y]));
    builder.body(handler.method, body);

    Fixture {
        program: builder.build(),
        handler,
        helper: Some(helper),
        sink,
        locals: vec![x, y],
        seeds,
    }
}

/// ```text
/// Handler(x) { Ping(x); }
/// Ping(u)    { Pong(u); }
/// Pong(v)    { Ping(v); Sink(v); }
/// ```
pub fn mutual_recursion() -> (Fixture, MethodHandle, MethodHandle) {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let ping = builder.method("Ping", &["u"]);
    let pong = builder.method("Pong", &["v"]);
    let (u, v) = (ping.parameters[0], pong.parameters[0]);
    builder.body(ping.method, vec![call(pong.method, &[u])]);
    builder.body(pong.method, vec![call(ping.method, &[v]), call(sink, &[v])]);

    let (handler, seeds) = tainted_handler(&mut builder, &["x"]);
    builder.body(handler.method, vec![call(ping.method, &[handler.parameters[0]])]);

    let fixture = Fixture {
        program: builder.build(),
        handler,
        helper: None,
        sink,
        locals: Vec::new(),
        seeds,
    };
    (fixture, ping, pong)
}

/// ```text
/// abstract Base.Run(v);
/// Safe.Run(v)  { }
/// Leaky.Run(v) { Sink(v); }
/// Handler(input) { Base.Run(input); }
/// ```
pub fn virtual_dispatch() -> (Fixture, Symbol, Symbol) {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let base = builder.method("Base.Run", &["v"]).method;
    let safe = builder.method("Safe.Run", &["v"]);
    let leaky = builder.method("Leaky.Run", &["v"]);
    builder.body(safe.method, vec![Operation::nop()]);
    builder.body(leaky.method, vec![call(sink, &[leaky.parameters[0]])]);
    builder.index.mark_abstract(base);
    builder.index.add_override(base, safe.method);
    builder.index.add_override(base, leaky.method);

    let (handler, seeds) = tainted_handler(&mut builder, &["input"]);
    builder.body(handler.method, vec![call(base, &[handler.parameters[0]])]);

    let fixture = Fixture {
        program: builder.build(),
        handler,
        helper: None,
        sink,
        locals: Vec::new(),
        seeds,
    };
    (fixture, safe.method, leaky.method)
}

/// ```text
/// Handler() { var s = ReadLine(); Sink(s); }
/// ```
pub fn source_call() -> (Fixture, Symbol) {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let source = builder.source("ReadLine");
    let handler = builder.method("Handler", &[]);
    let s = builder.local("s");
    builder.body(handler.method, vec![call_into(s, source, &[]), call(sink, &[s])]);

    let fixture = Fixture {
        program: builder.build(),
        seeds: vec![EntryPointSeed::new(handler.method)],
        handler,
        helper: None,
        sink,
        locals: vec![s],
    };
    (fixture, source)
}

/// ```text
/// Handler(input) {
///   Broken(input);        // CFG references a missing block
///   Unknown(input);       // signature unknown to the index
///   var s = input;
///   if (..) Sink(s);
/// }
/// ```
pub fn broken_callees() -> (Fixture, Symbol, Symbol) {
    let mut builder = ProgramBuilder::new();
    let sink = builder.sink("Sink");
    let broken = builder.method("Broken", &["q"]);
    builder.graph(
        broken.method,
        BasicBlockGraph::new(0, vec![BasicBlock::new(vec![Operation::nop()]).falls_through_to(7)]),
    );
    let unknown = builder.index.declare_opaque("Unknown");

    let (handler, seeds) = tainted_handler(&mut builder, &["input"]);
    let input = handler.parameters[0];
    let s = builder.local("s");
    builder.graph(
        handler.method,
        BasicBlockGraph::new(
            0,
            vec![
                BasicBlock::new(vec![
                    call(broken.method, &[input]),
                    Operation::invoke(Invocation::new(unknown, [Value::path(input)])),
                    copy(s, input),
                ])
                .falls_through_to(2)
                .branches_to(1),
                BasicBlock::new(vec![call(sink, &[s])]).falls_through_to(2),
                BasicBlock::new(vec![]),
            ],
        ),
    );

    let fixture = Fixture {
        program: builder.build(),
        handler,
        helper: None,
        sink,
        locals: vec![s],
        seeds,
    };
    (fixture, broken.method, unknown)
}
