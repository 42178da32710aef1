// Copyright 2023 The Regents of the University of California
// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use super::{Context, ExprRef, StmtRef, StringRef, Type};
use fuzzy_matcher::FuzzyMatcher;
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct FunctionId(u32);

impl FunctionId {
    pub(crate) fn from_index(index: usize) -> Self {
        FunctionId(index as u32)
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum FunctionKind {
    /// Updated by rules, the default.
    Controlled,
    /// Only assigned through initializers.
    Static,
    /// Computed from an expression over its parameters, never stored.
    Derived { params: Vec<StringRef>, body: ExprRef },
}

#[derive(Debug, PartialEq, Clone)]
pub struct Function {
    pub name: StringRef,
    pub args: Vec<Type>,
    pub ret: Type,
    pub kind: FunctionKind,
    /// Unseen locations of symbolic functions are materialized as fresh symbols in symbolic mode.
    pub symbolic: bool,
    /// `(arguments, value)` pairs applied once before the first step.
    pub init: Vec<(Vec<ExprRef>, ExprRef)>,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.kind, FunctionKind::Derived { .. })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Rule {
    pub name: StringRef,
    pub params: Vec<StringRef>,
    pub body: Option<StmtRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what} `{name}`{}", suggestion_str(.suggestions))]
pub struct UnknownName {
    pub what: &'static str,
    pub name: String,
    pub suggestions: Vec<String>,
}

fn suggestion_str(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(", did you mean: {}?", suggestions.join(", "))
    }
}

/// Symbol table of a type checked specification: all functions and rules together with
/// the distinguished `program` function and the init rule.
#[derive(Debug, PartialEq, Clone)]
pub struct Specification {
    pub name: String,
    pub(crate) functions: Vec<Function>,
    pub(crate) rules: Vec<Rule>,
    program: FunctionId,
    init: Option<RuleId>,
}

impl Specification {
    pub fn new(ctx: &mut Context, name: String) -> Self {
        let mut spec = Specification {
            name,
            functions: Vec::default(),
            rules: Vec::default(),
            program: FunctionId(0),
            init: None,
        };
        spec.program = spec.add_function(ctx, "program", vec![], Type::RuleRef);
        spec
    }

    pub fn add_function(
        &mut self,
        ctx: &mut Context,
        name: &str,
        args: Vec<Type>,
        ret: Type,
    ) -> FunctionId {
        self.push_function(Function {
            name: ctx.string(name.into()),
            args,
            ret,
            kind: FunctionKind::Controlled,
            symbolic: false,
            init: Vec::default(),
        })
    }

    pub fn add_derived(
        &mut self,
        ctx: &mut Context,
        name: &str,
        params: &[(&str, Type)],
        ret: Type,
        body: ExprRef,
    ) -> FunctionId {
        let args = params.iter().map(|(_, t)| t.clone()).collect();
        let params = params.iter().map(|(n, _)| ctx.string((*n).into())).collect();
        self.push_function(Function {
            name: ctx.string(name.into()),
            args,
            ret,
            kind: FunctionKind::Derived { params, body },
            symbolic: false,
            init: Vec::default(),
        })
    }

    fn push_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    pub fn modify_function<F>(&mut self, reference: FunctionId, modify: F)
    where
        F: FnOnce(&mut Function),
    {
        modify(self.functions.get_mut(reference.index()).unwrap())
    }

    pub fn add_rule(&mut self, ctx: &mut Context, name: &str, params: &[&str]) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        self.rules.push(Rule {
            name: ctx.string(name.into()),
            params: params.iter().map(|p| ctx.string((*p).into())).collect(),
            body: None,
        });
        id
    }

    pub fn set_rule_body(&mut self, rule: RuleId, body: StmtRef) {
        self.rules[rule.index()].body = Some(body);
    }

    pub fn set_init(&mut self, rule: RuleId) {
        self.init = Some(rule);
    }

    pub fn init(&self) -> Option<RuleId> {
        self.init
    }

    pub fn program(&self) -> FunctionId {
        self.program
    }

    pub fn function(&self, reference: FunctionId) -> &Function {
        &self.functions[reference.index()]
    }

    pub fn rule(&self, reference: RuleId) -> &Rule {
        &self.rules[reference.index()]
    }

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(ii, f)| (FunctionId(ii as u32), f))
    }

    pub fn function_by_name(&self, ctx: &Context, name: &str) -> Result<FunctionId, UnknownName> {
        self.functions()
            .find(|(_, f)| ctx.get_str(f.name) == name)
            .map(|(id, _)| id)
            .ok_or_else(|| UnknownName {
                what: "function",
                name: name.to_string(),
                suggestions: suggest(name, self.functions.iter().map(|f| ctx.get_str(f.name))),
            })
    }

    pub fn rule_by_name(&self, ctx: &Context, name: &str) -> Result<RuleId, UnknownName> {
        self.rules
            .iter()
            .position(|r| ctx.get_str(r.name) == name)
            .map(|ii| RuleId(ii as u32))
            .ok_or_else(|| UnknownName {
                what: "rule",
                name: name.to_string(),
                suggestions: suggest(name, self.rules.iter().map(|r| ctx.get_str(r.name))),
            })
    }
}

fn suggest<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Vec<String> {
    let matcher = fuzzy_matcher::skim::SkimMatcherV2::default();
    let mut matches: Vec<(&str, i64)> = candidates
        .flat_map(|other| matcher.fuzzy_match(other, name).map(|s| (other, s)))
        .collect();
    matches.sort_by_key(|(_, s)| -(*s));
    matches
        .into_iter()
        .take(3)
        .map(|(n, _)| n.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_function_always_exists() {
        let mut ctx = Context::default();
        let spec = Specification::new(&mut ctx, "empty".to_string());
        let program = spec.function_by_name(&ctx, "program").unwrap();
        assert_eq!(program, spec.program());
        assert_eq!(spec.function(program).ret, Type::RuleRef);
        assert_eq!(spec.function(program).arity(), 0);
    }

    #[test]
    fn unknown_function_suggests_close_names() {
        let mut ctx = Context::default();
        let mut spec = Specification::new(&mut ctx, "lookup".to_string());
        spec.add_function(&mut ctx, "counter", vec![], Type::Int);
        let err = spec.function_by_name(&ctx, "cntr").unwrap_err();
        assert_eq!(err.suggestions, ["counter"]);
        assert_eq!(
            err.to_string(),
            "unknown function `cntr`, did you mean: counter?"
        );
    }
}
