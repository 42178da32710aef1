// Copyright 2023 The Regents of the University of California
// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use super::exec;
use crate::error::{ExecError, ExecErrorKind, Result};
use crate::ir::*;
use crate::sim::list::{ListStore, StepOwner};
use crate::sim::state::{ArgumentsKey, FunctionStore};
use crate::sim::update::{Update, UpdateSet};
use crate::sim::value::{values_equal, Renderer, Value};
use crate::symbolic::{
    CheckResult, DefinitionOp, CompareOp, Symbol, SymbolicCondition, SymbolicEngine, Term,
    TraceEntry,
};
use indexmap::IndexSet;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Materialize unseen locations of symbolic functions as symbols and record a trace.
    pub symbolic: bool,
    /// Record a summary of the applied updates after every step.
    pub dump_updates: bool,
}

pub trait Simulator {
    /// Applies the function initializers and schedules the init rule.
    fn init(&mut self) -> Result<()>;

    /// Executes one macro step. Returns `false` without doing anything once `program`
    /// is undef.
    fn step(&mut self) -> Result<bool>;

    /// Steps until the machine halts or `limit` steps were taken. Returns whether it halted.
    fn run(&mut self, limit: Option<u64>) -> Result<bool> {
        let mut steps = 0;
        loop {
            if limit.is_some_and(|l| steps >= l) {
                return Ok(false);
            }
            if !self.step()? {
                return Ok(true);
            }
            steps += 1;
        }
    }

    /// Current value of a stored location.
    fn get(&self, function: FunctionId, args: &[Value]) -> Value;

    fn step_count(&self) -> u64;
}

/// Tree walking interpreter for a type checked specification.
pub struct Interpreter<'a> {
    ctx: &'a Context,
    spec: &'a Specification,
    opts: ExecOptions,
    lists: ListStore,
    owner: StepOwner,
    store: FunctionStore,
    updates: UpdateSet,
    symbolic: SymbolicEngine,
    /// `let`, `forall` and parameter bindings, innermost last
    locals: Vec<(StringRef, Value)>,
    /// first binding visible to the rule or derived function that is executing
    frame_base: usize,
    /// statement that is currently executed, for error locations
    span: Span,
    output: Vec<String>,
    dumps: Vec<String>,
    step_count: u64,
    halted: bool,
}

impl<'a> Interpreter<'a> {
    pub fn new(ctx: &'a Context, spec: &'a Specification, opts: ExecOptions) -> Self {
        let mut lists = ListStore::default();
        let owner = lists.begin_step();
        Self {
            ctx,
            spec,
            opts,
            lists,
            owner,
            store: FunctionStore::new(spec),
            updates: UpdateSet::default(),
            symbolic: SymbolicEngine::default(),
            locals: Vec::new(),
            frame_base: 0,
            span: Span::default(),
            output: Vec::new(),
            dumps: Vec::new(),
            step_count: 0,
            halted: false,
        }
    }

    /// Lines written by `print`.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// One `{ f(args) = value, ... }` line per step, if enabled.
    pub fn update_dumps(&self) -> &[String] {
        &self.dumps
    }

    pub fn trace(&self) -> &[TraceEntry] {
        self.symbolic.trace()
    }

    pub fn trace_lines(&self) -> Vec<String> {
        self.symbolic.trace_lines()
    }

    pub fn symbolic_engine(&self) -> &SymbolicEngine {
        &self.symbolic
    }

    pub fn lists(&self) -> &ListStore {
        &self.lists
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn render(&self, value: &Value) -> String {
        self.renderer().value(value)
    }

    pub fn get_by_name(
        &self,
        name: &str,
        args: &[Value],
    ) -> std::result::Result<Value, UnknownName> {
        let function = self.spec.function_by_name(self.ctx, name)?;
        Ok(self.get(function, args))
    }

    fn renderer(&self) -> Renderer<'_> {
        Renderer::new(self.ctx, self.spec, &self.lists)
    }

    fn name(&self, function: FunctionId) -> &'a str {
        let (ctx, spec) = (self.ctx, self.spec);
        ctx.get_str(spec.function(function).name)
    }

    fn term(&self, value: &Value) -> Term {
        Term::try_from(value).unwrap_or_else(|_| Term::Text(self.render(value)))
    }

    fn error(&self, kind: ExecErrorKind, detail: impl Into<String>) -> ExecError {
        ExecError::new(kind, self.span, detail)
    }

    fn unsupported(&self, detail: String) -> ExecError {
        self.error(ExecErrorKind::UnsupportedOperation, detail)
    }

    /// Drops all state of a step that failed.
    fn abort_step(&mut self) {
        self.updates.clear();
        self.locals.clear();
        self.frame_base = 0;
    }

    fn halt(&mut self) {
        self.halted = true;
        if self.opts.symbolic {
            self.symbolic.finish();
        }
        debug!("halted after {} steps", self.step_count);
    }

    /// Moves all pending updates into the function store. Returns the number of updates.
    fn apply(&mut self, end_of_step: bool) -> usize {
        let updates = self.updates.take();
        let count = updates.len();
        if self.opts.dump_updates && end_of_step {
            let line = self.format_updates(&updates);
            self.dumps.push(line);
        }
        if self.opts.symbolic && end_of_step {
            self.symbolic.advance_timestamp();
        }
        let program = self.spec.program();
        let mut touched = IndexSet::new();
        for update in updates {
            let value = self.flatten(update.value);
            let args: Vec<Value> = update.args.into_iter().map(|a| self.flatten(a)).collect();
            if self.opts.symbolic && update.function != program {
                let arg_terms = args.iter().map(|a| self.term(a)).collect();
                let term = self.term(&value);
                let key = (update.function, update.key.clone());
                let name = self.name(update.function);
                self.symbolic.dump_update(key.clone(), name, arg_terms, term);
                touched.insert(key);
            }
            self.store
                .set(&self.lists, update.function, update.key, args, value);
        }
        if self.opts.symbolic && end_of_step {
            self.symbolic.dump_symbolic(&touched);
        }
        count
    }

    /// Stored lists are kept as flat vectors.
    fn flatten(&mut self, value: Value) -> Value {
        match value {
            Value::List(list) => Value::List(self.lists.collect(list)),
            other => other,
        }
    }

    fn format_updates(&self, updates: &[Update]) -> String {
        if updates.is_empty() {
            return "{ }".to_string();
        }
        let renderer = self.renderer();
        let entries: Vec<String> = updates
            .iter()
            .map(|u| {
                format!(
                    "{} = {}",
                    renderer.location(self.name(u.function), &u.args),
                    renderer.value(&u.value)
                )
            })
            .collect();
        format!("{{ {} }}", entries.join(", "))
    }

    /// Frees list nodes that are no longer reachable and starts a new list generation.
    fn collect_garbage(&mut self) {
        let conditions = self
            .symbolic
            .path_conditions()
            .iter()
            .flat_map(|c| [&c.lhs, &c.rhs]);
        self.lists
            .collect_garbage(self.store.values().chain(conditions));
        self.owner = self.lists.begin_step();
    }

    fn lookup_local(&self, name: StringRef) -> Value {
        self.locals[self.frame_base..]
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Undef)
    }

    /// Runs `body` in a new frame with `params` bound to `args`.
    fn with_frame<T>(
        &mut self,
        params: &[StringRef],
        args: Vec<Value>,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.frame_base;
        self.frame_base = self.locals.len();
        self.locals.extend(params.iter().copied().zip(args));
        let res = body(self);
        self.locals.truncate(self.frame_base);
        self.frame_base = saved;
        res
    }

    /// Reads a location: pending updates of enclosing sequential blocks first, then the
    /// store. Derived functions are evaluated.
    fn read(&mut self, function: FunctionId, args: Vec<Value>) -> Result<Value> {
        let spec = self.spec;
        let f = spec.function(function);
        if let FunctionKind::Derived { params, body } = &f.kind {
            if params.len() != args.len() {
                return Err(self.error(
                    ExecErrorKind::InvalidCall,
                    format!(
                        "`{}` expects {} arguments, got {}",
                        self.name(function),
                        params.len(),
                        args.len()
                    ),
                ));
            }
            let body = *body;
            return self.with_frame(params, args, |s| s.eval(body));
        }

        let key = ArgumentsKey::new(&args, &self.lists);
        if let Some(value) = self.updates.lookup(&self.lists, function, &key, &args) {
            return Ok(value.clone());
        }
        if let Some(value) = self.store.get(&self.lists, function, key.as_slice(), &args) {
            return Ok(value.clone());
        }
        if self.opts.symbolic && f.symbolic {
            let sym = self.symbolic.fresh_symbol();
            let id = sym.id;
            let value = Value::Symbol(Box::new(sym));
            let arg_terms = args.iter().map(|a| self.term(a)).collect();
            let name = self.name(function);
            self.symbolic
                .dump_create((function, key.clone()), name, arg_terms, Term::Symbol(id));
            self.store
                .set(&self.lists, function, key, args, value.clone());
            return Ok(value);
        }
        Ok(Value::Undef)
    }

    /// Records all function initializers and `program := @init` as updates.
    fn schedule_init(&mut self) -> Result<()> {
        let spec = self.spec;
        for (id, function) in spec.functions() {
            for (args, value) in &function.init {
                let args = self.eval_all(args)?;
                let value = self.eval(*value)?;
                self.updates
                    .add(&self.lists, id, args, value, Span::default())?;
            }
        }
        if let Some(rule) = spec.init() {
            self.updates.add(
                &self.lists,
                spec.program(),
                Vec::new(),
                Value::RuleRef(rule),
                Span::default(),
            )?;
        }
        Ok(())
    }

    /// Evaluates an expression in the current frame.
    pub fn eval(&mut self, expr: ExprRef) -> Result<Value> {
        let ctx = self.ctx;
        bottom_up(ctx, expr, |_, e, children: &mut [Result<Value>]| {
            let args = children
                .iter_mut()
                .map(|c| std::mem::replace(c, Ok(Value::Undef)))
                .collect::<Result<Vec<_>>>()?;
            self.eval_node(e, args)
        })
    }

    fn eval_node(&mut self, expr: &Expr, mut args: Vec<Value>) -> Result<Value> {
        match expr {
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Float(v) => Ok(Value::Float(*v)),
            Expr::Bool(v) => Ok(Value::Bool(*v)),
            Expr::Str(s) => Ok(Value::str(self.ctx.get_str(*s))),
            Expr::Undef => Ok(Value::Undef),
            Expr::Rule(r) => Ok(Value::RuleRef(*r)),
            Expr::Var(name) => Ok(self.lookup_local(*name)),
            Expr::Read { function, .. } => self.read(*function, args),
            Expr::Builtin { op, .. } => {
                let symbolic = self.opts.symbolic && args.iter().any(Value::is_symbolic);
                match exec::builtin(*op, args, &mut self.lists, &self.owner) {
                    Ok(value) => Ok(value),
                    // nothing is known about the result of a builtin applied to a symbol
                    Err(_) if symbolic => {
                        Ok(Value::Symbol(Box::new(self.symbolic.fresh_symbol())))
                    }
                    Err(detail) => Err(self.unsupported(detail)),
                }
            }
            Expr::Binary(op, _, _) => {
                let b = args.pop().unwrap_or_default();
                let a = args.pop().unwrap_or_default();
                self.binary(*op, a, b)
            }
            Expr::Not(_) => {
                let a = args.pop().unwrap_or_default();
                self.not(a)
            }
            Expr::List(_) => Ok(Value::List(self.lists.from_values(args))),
            Expr::Range(_, _) => {
                let hi = args.pop().unwrap_or_default();
                let lo = args.pop().unwrap_or_default();
                match (lo, hi) {
                    (Value::Int(lo), Value::Int(hi)) => {
                        let values = (lo..=hi).map(Value::Int).collect();
                        Ok(Value::List(self.lists.from_values(values)))
                    }
                    (Value::Undef, _) | (_, Value::Undef) => Ok(Value::Undef),
                    (lo, hi) => Err(self.unsupported(format!(
                        "range bounds need to be Int, got {} and {}",
                        lo.kind_name(),
                        hi.kind_name()
                    ))),
                }
            }
        }
    }

    fn binary(&mut self, op: BinOp, a: Value, b: Value) -> Result<Value> {
        if a.is_symbolic() || b.is_symbolic() {
            return Ok(self.symbolic_binary(op, a, b));
        }
        exec::binary(op, &a, &b, &self.lists).map_err(|d| self.unsupported(d))
    }

    fn symbolic_binary(&mut self, op: BinOp, a: Value, b: Value) -> Value {
        let ordering = op.is_comparison() && !matches!(op, BinOp::Eq | BinOp::Neq);
        if (op.is_arithmetic() || ordering) && (a.is_undef() || b.is_undef()) {
            return Value::Undef;
        }
        if let Some(def) = DefinitionOp::from_bin_op(op) {
            let (lhs, rhs) = (self.term(&a), self.term(&b));
            return Value::Symbol(Box::new(self.symbolic.define(def, lhs, rhs)));
        }
        if let Some(cond) = SymbolicCondition::from_comparison(op, a, b) {
            return match self.symbolic.check(&cond) {
                CheckResult::True => Value::Bool(true),
                CheckResult::False => Value::Bool(false),
                CheckResult::NotFound => Value::Symbol(Box::new(self.symbolic.fresh_condition(cond))),
            };
        }
        // and, or, xor
        Value::Symbol(Box::new(self.symbolic.fresh_symbol()))
    }

    fn not(&mut self, value: Value) -> Result<Value> {
        match value {
            Value::Symbol(sym) => {
                let Symbol { id, condition } = *sym;
                let negated = match condition {
                    Some(c) => SymbolicCondition::new(c.lhs, c.op.negate(), c.rhs),
                    None => SymbolicCondition::new(
                        Value::Symbol(Box::new(Symbol::new(id))),
                        CompareOp::Eq,
                        Value::Bool(false),
                    ),
                };
                Ok(Value::Symbol(Box::new(self.symbolic.fresh_condition(negated))))
            }
            other => exec::not(&other).map_err(|d| self.unsupported(d)),
        }
    }

    /// Decides a branch condition. Undef counts as false. A symbolic condition is assumed
    /// to hold, unless the path conditions already decide it.
    fn decide(&mut self, value: Value) -> Result<bool> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Undef => Ok(false),
            Value::Symbol(sym) => {
                let Symbol { id, condition } = *sym;
                let cond = match condition {
                    Some(c) => *c,
                    None => SymbolicCondition::new(
                        Value::Symbol(Box::new(Symbol::new(id))),
                        CompareOp::Eq,
                        Value::Bool(true),
                    ),
                };
                match self.symbolic.check(&cond) {
                    CheckResult::True => Ok(true),
                    CheckResult::False => Ok(false),
                    CheckResult::NotFound => {
                        let (lhs, rhs) = (self.term(&cond.lhs), self.term(&cond.rhs));
                        self.symbolic.assume(cond, lhs, rhs);
                        Ok(true)
                    }
                }
            }
            other => Err(self.unsupported(format!(
                "expected a Boolean condition, got {}",
                other.kind_name()
            ))),
        }
    }

    fn eval_all(&mut self, exprs: &[ExprRef]) -> Result<Vec<Value>> {
        exprs.iter().map(|e| self.eval(*e)).collect()
    }

    fn call_rule(&mut self, rule: RuleId, args: Vec<Value>) -> Result<()> {
        let spec = self.spec;
        let r = spec.rule(rule);
        if r.params.len() != args.len() {
            return Err(self.error(
                ExecErrorKind::InvalidCall,
                format!(
                    "rule `{}` expects {} arguments, got {}",
                    self.ctx.get_str(r.name),
                    r.params.len(),
                    args.len()
                ),
            ));
        }
        let Some(body) = r.body else {
            return Ok(());
        };
        self.with_frame(&r.params, args, |s| s.exec(body))
    }

    /// Executes a statement, recording its writes in the update set.
    pub fn exec(&mut self, stmt: StmtRef) -> Result<()> {
        let ctx = self.ctx;
        let stmt = ctx.get_stmt(stmt);
        let span = stmt.span;
        self.span = span;
        match &stmt.kind {
            StmtKind::Skip => Ok(()),
            StmtKind::Update {
                function,
                args,
                value,
            } => {
                let args = self.eval_all(args)?;
                let value = self.eval(*value)?;
                self.updates.add(&self.lists, *function, args, value, span)
            }
            StmtKind::Par(body) => {
                let forked = self.updates.fork_parallel();
                for s in body {
                    self.exec(*s)?;
                }
                self.updates.merge(&self.lists, forked)
            }
            StmtKind::Seq(body) => {
                let forked = self.updates.fork_sequential();
                for s in body {
                    self.exec(*s)?;
                }
                self.updates.merge(&self.lists, forked)
            }
            StmtKind::If { cond, then, els } => {
                let cond = self.eval(*cond)?;
                if self.decide(cond)? {
                    self.exec(*then)
                } else if let Some(els) = els {
                    self.exec(*els)
                } else {
                    Ok(())
                }
            }
            StmtKind::Case {
                expr,
                arms,
                default,
            } => {
                let value = self.eval(*expr)?;
                for (label, body) in arms {
                    let label = self.eval(*label)?;
                    if values_equal(&self.lists, &value, &label) {
                        return self.exec(*body);
                    }
                }
                match default {
                    Some(body) => self.exec(*body),
                    None => Ok(()),
                }
            }
            StmtKind::Let { name, value, body } => {
                let value = self.eval(*value)?;
                self.locals.push((*name, value));
                let res = self.exec(*body);
                self.locals.pop();
                res
            }
            StmtKind::Forall { name, domain, body } => {
                let elements = match self.eval(*domain)? {
                    Value::List(list) => self.lists.to_vec(list),
                    Value::Undef => Vec::new(),
                    other => {
                        return Err(self.unsupported(format!(
                            "forall needs a List to iterate over, got {}",
                            other.kind_name()
                        )))
                    }
                };
                let forked = self.updates.fork_parallel();
                for element in elements {
                    self.locals.push((*name, element));
                    let res = self.exec(*body);
                    self.locals.pop();
                    res?;
                }
                self.updates.merge(&self.lists, forked)
            }
            StmtKind::Iterate(body) => {
                let seq = self.updates.fork_sequential();
                loop {
                    let round = self.updates.fork_parallel();
                    self.exec(*body)?;
                    let done = self.updates.top_is_empty();
                    self.updates.merge_iteration(&self.lists, round)?;
                    if done {
                        break;
                    }
                }
                self.updates.merge(&self.lists, seq)
            }
            StmtKind::Call { target, args } => {
                let rule = match target {
                    CallTarget::Direct(rule) => *rule,
                    CallTarget::Indirect(e) => match self.eval(*e)? {
                        Value::RuleRef(rule) => rule,
                        Value::Undef => {
                            return Err(self.error(
                                ExecErrorKind::InvalidCall,
                                "call of an undef rule reference",
                            ))
                        }
                        other => {
                            return Err(self.error(
                                ExecErrorKind::InvalidCall,
                                format!("cannot call a {}", other.kind_name()),
                            ))
                        }
                    },
                };
                let args = self.eval_all(args)?;
                self.call_rule(rule, args)
            }
            StmtKind::Print(values) => {
                let values = self.eval_all(values)?;
                let renderer = self.renderer();
                let line: String = values.iter().map(|v| renderer.value(v)).collect();
                self.output.push(line);
                Ok(())
            }
            StmtKind::Assert(cond) => {
                let value = self.eval(*cond)?;
                if self.decide(value)? {
                    Ok(())
                } else {
                    Err(self.error(
                        ExecErrorKind::AssertionFailure,
                        format!("`{}` does not hold", serialize_expr(ctx, self.spec, *cond)),
                    ))
                }
            }
            StmtKind::Diedie(msg) => {
                let detail = match msg {
                    Some(msg) => {
                        let msg = self.eval(*msg)?;
                        self.render(&msg)
                    }
                    None => "diedie".to_string(),
                };
                Err(self.error(ExecErrorKind::Abort, detail))
            }
            StmtKind::Push { value, to, args } => {
                let value = self.eval(*value)?;
                let args = self.eval_all(args)?;
                let list = match self.read(*to, args.clone())? {
                    Value::List(list) => list,
                    Value::Undef => self.lists.empty(),
                    other => {
                        return Err(self.unsupported(format!(
                            "cannot push into a {}",
                            other.kind_name()
                        )))
                    }
                };
                let pushed = Value::List(self.lists.cons(value, list));
                self.updates.add(&self.lists, *to, args, pushed, span)
            }
            StmtKind::Pop {
                from,
                from_args,
                to,
            } => {
                let args = self.eval_all(from_args)?;
                match self.read(*from, args.clone())? {
                    Value::List(list) => {
                        let head = self.lists.peek(list);
                        let rest = Value::List(self.lists.tail(list));
                        self.updates.add(&self.lists, *to, Vec::new(), head, span)?;
                        self.updates.add(&self.lists, *from, args, rest, span)
                    }
                    Value::Undef => self
                        .updates
                        .add(&self.lists, *to, Vec::new(), Value::Undef, span),
                    other => Err(self.unsupported(format!(
                        "cannot pop from a {}",
                        other.kind_name()
                    ))),
                }
            }
        }
    }
}

impl<'a> Simulator for Interpreter<'a> {
    fn init(&mut self) -> Result<()> {
        if let Err(e) = self.schedule_init() {
            self.abort_step();
            return Err(e);
        }
        self.apply(false);
        self.collect_garbage();
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        if self.halted {
            return Ok(false);
        }
        self.span = Span::default();
        let rule = match self.read(self.spec.program(), Vec::new())? {
            Value::Undef => {
                self.halt();
                return Ok(false);
            }
            Value::RuleRef(rule) => rule,
            other => {
                return Err(self.error(
                    ExecErrorKind::InvalidCall,
                    format!("`program` holds a {} instead of a rule", other.kind_name()),
                ))
            }
        };
        if let Err(e) = self.call_rule(rule, Vec::new()) {
            self.abort_step();
            return Err(e);
        }
        let applied = self.apply(true);
        self.step_count += 1;
        debug!("step {}: applied {applied} updates", self.step_count);
        self.collect_garbage();
        Ok(true)
    }

    fn get(&self, function: FunctionId, args: &[Value]) -> Value {
        let key = ArgumentsKey::new(args, &self.lists);
        self.store
            .get(&self.lists, function, key.as_slice(), args)
            .cloned()
            .unwrap_or(Value::Undef)
    }

    fn step_count(&self) -> u64 {
        self.step_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_functions_see_only_their_parameters() {
        let mut ctx = Context::default();
        let mut spec = Specification::new(&mut ctx, "derived".to_string());
        // derived double(x) = x + x
        let x = ctx.var("x");
        let body = ctx.add(x, x);
        let double = spec.add_derived(&mut ctx, "double", &[("x", Type::Int)], Type::Int, body);
        let out = spec.add_function(&mut ctx, "out", vec![], Type::Int);
        let init = spec.add_rule(&mut ctx, "main", &[]);
        // let x = 100 in out := double(3)
        let three = ctx.int(3);
        let call = ctx.read(double, vec![three]);
        let update = ctx.update(out, vec![], call);
        let hundred = ctx.int(100);
        let body = ctx.let_in("x", hundred, update);
        let undef = ctx.undef();
        let halt = ctx.update(spec.program(), vec![], undef);
        let main = ctx.par(vec![body, halt]);
        spec.set_rule_body(init, main);
        spec.set_init(init);

        let mut sim = Interpreter::new(&ctx, &spec, ExecOptions::default());
        sim.init().unwrap();
        assert!(sim.run(None).unwrap());
        assert_eq!(sim.get(out, &[]).as_int(), Some(6));
    }

    #[test]
    fn error_discards_pending_updates() {
        let mut ctx = Context::default();
        let mut spec = Specification::new(&mut ctx, "abort".to_string());
        let x = spec.add_function(&mut ctx, "x", vec![], Type::Int);
        let init = spec.add_rule(&mut ctx, "main", &[]);
        let one = ctx.int(1);
        let write = ctx.update(x, vec![], one);
        let die = ctx.diedie(None);
        let body = ctx.seq(vec![write, die]);
        spec.set_rule_body(init, body);
        spec.set_init(init);

        let mut sim = Interpreter::new(&ctx, &spec, ExecOptions::default());
        sim.init().unwrap();
        let err = sim.step().unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::Abort);
        assert_eq!(err.detail, "diedie");
        assert!(sim.get(x, &[]).is_undef());
        assert_eq!(sim.step_count(), 0);
    }

    #[test]
    fn limit_stops_a_machine_that_runs_forever() {
        let mut ctx = Context::default();
        let mut spec = Specification::new(&mut ctx, "forever".to_string());
        let init = spec.add_rule(&mut ctx, "main", &[]);
        let body = ctx.skip();
        spec.set_rule_body(init, body);
        spec.set_init(init);
        let mut sim = Interpreter::new(&ctx, &spec, ExecOptions::default());
        sim.init().unwrap();
        assert!(!sim.run(Some(5)).unwrap());
        assert_eq!(sim.step_count(), 5);
        assert!(!sim.is_halted());
    }
}
