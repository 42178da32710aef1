// Copyright 2023 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use super::{bottom_up, Context, Expr, ExprRef, Specification};

/// Renders an expression in specification syntax.
pub fn serialize_expr(ctx: &Context, spec: &Specification, expr: ExprRef) -> String {
    bottom_up(ctx, expr, |ctx, expr, children: &mut [String]| match expr {
        Expr::Int(value) => value.to_string(),
        Expr::Float(value) => format!("{value:?}"),
        Expr::Bool(value) => value.to_string(),
        Expr::Str(s) => format!("{:?}", ctx.get_str(*s)),
        Expr::Undef => "undef".to_string(),
        Expr::Rule(r) => format!("@{}", ctx.get_str(spec.rule(*r).name)),
        Expr::Var(name) => ctx.get_str(*name).to_string(),
        Expr::Read { function, args } => {
            let name = ctx.get_str(spec.function(*function).name);
            if args.is_empty() {
                name.to_string()
            } else {
                format!("{name}({})", children.join(", "))
            }
        }
        Expr::Builtin { op, .. } => format!("{}({})", op.name(), children.join(", ")),
        Expr::Binary(op, _, _) => format!("({} {} {})", children[0], op.symbol(), children[1]),
        Expr::Not(_) => format!("not {}", children[0]),
        Expr::List(_) => format!("[{}]", children.join(", ")),
        Expr::Range(_, _) => format!("[{}..{}]", children[0], children[1]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Builtin, Type};

    #[test]
    fn serialize_nested() {
        let mut ctx = Context::default();
        let mut spec = Specification::new(&mut ctx, "s".to_string());
        let f = spec.add_function(&mut ctx, "f", vec![Type::Int], Type::List(Box::new(Type::Int)));
        let one = ctx.int(1);
        let read = ctx.read(f, vec![one]);
        let len = ctx.builtin(Builtin::Len, vec![read]);
        let two = ctx.int(2);
        let cmp = ctx.greater(len, two);
        let e = ctx.not(cmp);
        assert_eq!(serialize_expr(&ctx, &spec, e), "not (len(f(1)) > 2)");
    }
}
