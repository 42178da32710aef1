// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::ir::{Context, Expr, ExprRef, ForEachChild};

/// Visits expression nodes bottom up while propagating values.
/// Children results are handed to `f` in the order in which `for_each_child` lists them.
/// They are passed as a mutable slice so that `f` can move them out instead of cloning.
pub fn bottom_up<R>(
    ctx: &Context,
    expr: ExprRef,
    mut f: impl FnMut(&Context, &Expr, &mut [R]) -> R,
) -> R {
    let mut todo = vec![(expr, false)];
    let mut stack: Vec<R> = Vec::with_capacity(4);

    while let Some((e, bottom_up)) = todo.pop() {
        let expr = ctx.get(e);

        // Check if there are children that we need to compute first.
        if !bottom_up {
            let num_children = expr.num_children();
            if num_children > 0 {
                todo.push((e, true));
                // push in reverse so that the first child is evaluated first
                let mut children = Vec::with_capacity(num_children);
                expr.for_each_child(|c| children.push(*c));
                todo.extend(children.into_iter().rev().map(|c| (c, false)));
                continue;
            }
        }

        // Otherwise, all arguments are available on the stack for us to use.
        let num_children = expr.num_children();
        let start = stack.len() - num_children;
        let result = f(ctx, expr, &mut stack[start..]);
        stack.truncate(start);
        stack.push(result);
    }

    debug_assert_eq!(stack.len(), 1);
    stack.pop().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BinOp;

    #[test]
    fn children_are_visited_left_to_right() {
        let mut ctx = Context::default();
        let one = ctx.int(1);
        let two = ctx.int(2);
        let three = ctx.int(3);
        let sum = ctx.add(one, two);
        let e = ctx.binary(BinOp::Sub, sum, three);
        let mut order = vec![];
        let result = bottom_up(&ctx, e, |_, expr, children: &mut [i64]| {
            let value = match expr {
                Expr::Int(v) => *v,
                Expr::Binary(BinOp::Add, _, _) => children[0] + children[1],
                Expr::Binary(BinOp::Sub, _, _) => children[0] - children[1],
                other => unreachable!("{other:?}"),
            };
            order.push(value);
            value
        });
        assert_eq!(result, 0);
        assert_eq!(order, [1, 2, 3, 3, 0]);
    }
}
