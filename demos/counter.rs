// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use asmsim::error::report_error;
use asmsim::ir::*;
use asmsim::sim::{ExecOptions, Interpreter, Simulator};
use asmsim::symbolic::trace_to_smt;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "counter")]
#[command(author = "Kevin Laeufer <laeufer@cornell.edu>")]
#[command(version)]
#[command(about = "Runs a counter machine on the ASM interpreter.", long_about = None)]
struct Args {
    #[arg(short, long)]
    verbose: bool,
    #[arg(long, default_value_t = 10, help = "Value to count up to.")]
    bound: i64,
    #[arg(long, help = "Leave the bound unknown and record a symbolic trace.")]
    symbolic: bool,
    #[arg(long, help = "Print the updates of every step.")]
    dump_updates: bool,
    #[arg(long, help = "Print the symbolic trace as SMT-LIB instead of TPTP.")]
    smt: bool,
    #[arg(long, help = "Maximum number of steps.")]
    limit: Option<u64>,
}

const SOURCE: &str = "\
function counter : -> Integer initially { 0 }
function bound : -> Integer
rule main =
    if counter < bound then
        counter := counter + 1
    else
        program := undef
";

fn span_of(text: &str) -> Span {
    let start = SOURCE.find(text).unwrap_or(0);
    Span::new(start as u32, (start + text.len()) as u32)
}

fn build(ctx: &mut Context, bound_value: Option<i64>) -> Specification {
    let mut spec = Specification::new(ctx, "counter".to_string());
    let counter = spec.add_function(ctx, "counter", vec![], Type::Int);
    let bound = spec.add_function(ctx, "bound", vec![], Type::Int);
    let zero = ctx.int(0);
    spec.modify_function(counter, |f| f.init.push((vec![], zero)));
    match bound_value {
        Some(value) => {
            let value = ctx.int(value);
            spec.modify_function(bound, |f| {
                f.kind = FunctionKind::Static;
                f.init.push((vec![], value));
            });
        }
        None => spec.modify_function(bound, |f| f.symbolic = true),
    }

    let read_counter = ctx.read(counter, vec![]);
    let read_bound = ctx.read(bound, vec![]);
    let cond = ctx.lesser(read_counter, read_bound);
    let one = ctx.int(1);
    let inc = ctx.add(read_counter, one);
    let then = ctx.update(counter, vec![], inc);
    ctx.set_span(then, span_of("counter := counter + 1"));
    let undef = ctx.undef();
    let stop = ctx.update(spec.program(), vec![], undef);
    ctx.set_span(stop, span_of("program := undef"));
    let body = ctx.if_then(cond, then, Some(stop));
    ctx.set_span(body, span_of("if counter < bound"));

    let main = spec.add_rule(ctx, "main", &[]);
    spec.set_rule_body(main, body);
    spec.set_init(main);
    spec
}

fn main() {
    let args = Args::parse();
    let mut ctx = Context::default();
    let spec = build(&mut ctx, (!args.symbolic).then_some(args.bound));
    if args.verbose {
        println!("{SOURCE}");
    }

    let opts = ExecOptions {
        symbolic: args.symbolic,
        dump_updates: args.dump_updates,
    };
    // a symbolic bound never lets the counter stop on its own
    let limit = args.limit.or(args.symbolic.then_some(8));

    let start = std::time::Instant::now();
    let mut sim = Interpreter::new(&ctx, &spec, opts);
    let res = sim.init().and_then(|_| sim.run(limit));
    let delta = std::time::Instant::now() - start;
    match res {
        Ok(halted) => {
            let state = if halted { "halted" } else { "stopped" };
            println!("{state} after {} steps in {:?}", sim.step_count(), delta);
        }
        Err(e) => {
            report_error(&e, "counter.casm", SOURCE);
            std::process::exit(1);
        }
    }

    for line in sim.output() {
        println!("{line}");
    }
    for line in sim.update_dumps() {
        println!("{line}");
    }
    if args.symbolic {
        if args.smt {
            match trace_to_smt(sim.trace()) {
                Ok(lines) => lines.iter().for_each(|l| println!("{l}")),
                Err(e) => eprintln!("failed to build SMT context: {e}"),
            }
        } else {
            sim.trace_lines().iter().for_each(|l| println!("{l}"));
        }
    }
    if let Ok(value) = sim.get_by_name("counter", &[]) {
        println!("counter = {}", sim.render(&value));
    }
}
