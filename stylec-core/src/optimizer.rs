//! Optional rewrite pass over the IR forest, enabled by default.
//!
//! Two rewrites only: branch canonicalization and dead-store elision.
//! Elision is scoped to values with no observable effect: a discarded
//! call of a function that writes or assigns must stay. Deliberately
//! absent is common-subexpression elimination: a node referenced twice
//! is re-rendered in full at every use site instead of being hoisted
//! into a temporary, trading output size for a simpler translation.

use std::collections::HashSet;
use std::rc::Rc;

use crate::ir::{CompilationUnit, Expr, Stmt};

/// Rewrite every function body of the unit in place.
pub fn optimize(unit: &mut CompilationUnit) {
    // Callees precede their callers in memoization order, so one
    // forward scan settles purity for every function.
    let mut pure_fns = HashSet::new();
    for function in &unit.functions {
        if is_pure_body(&function.body, &pure_fns) {
            pure_fns.insert(function.name.clone());
        }
    }
    for function in &mut unit.functions {
        let body = std::mem::take(&mut function.body);
        function.body = rewrite(body, &pure_fns);
    }
}

fn rewrite(stmts: Vec<Stmt>, pure_fns: &HashSet<String>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match stmt {
            // Popping a pure expression has no observable effect.
            Stmt::Discard(value) => {
                if !is_pure(&value, pure_fns) {
                    out.push(Stmt::Discard(value));
                }
            }
            Stmt::If {
                cond,
                then_arm,
                else_arm,
            } => {
                let then_arm = rewrite(then_arm, pure_fns);
                let else_arm = rewrite(else_arm, pure_fns);
                if then_arm.is_empty() {
                    // Make the non-trivial branch primary.
                    out.push(Stmt::If {
                        cond: negate(cond),
                        then_arm: else_arm,
                        else_arm: then_arm,
                    });
                } else {
                    out.push(Stmt::If {
                        cond,
                        then_arm,
                        else_arm,
                    });
                }
            }
            Stmt::While { cond, body } => out.push(Stmt::While {
                cond,
                body: rewrite(body, pure_fns),
            }),
            other => out.push(other),
        }
    }
    out
}

/// A function is pure when its body is at most a return of a pure
/// expression. Any statement before the return is an effect.
fn is_pure_body(body: &[Stmt], pure_fns: &HashSet<String>) -> bool {
    match body {
        [] => true,
        [Stmt::Return(value)] => is_pure(value, pure_fns),
        _ => false,
    }
}

fn is_pure(expr: &Expr, pure_fns: &HashSet<String>) -> bool {
    match expr {
        Expr::IntLit(_) | Expr::StrLit(_) | Expr::Param { .. } | Expr::Var { .. } => true,
        // Value-returning built-ins only read; their effects would be
        // statements, not expressions.
        Expr::Call { args, .. } => args.iter().all(|arg| is_pure(arg, pure_fns)),
        Expr::CallUser { name, args, .. } => {
            pure_fns.contains(name) && args.iter().all(|arg| is_pure(arg, pure_fns))
        }
        Expr::Ternary {
            cond,
            then_value,
            else_value,
        } => {
            is_pure(cond, pure_fns)
                && is_pure(then_value, pure_fns)
                && is_pure(else_value, pure_fns)
        }
        Expr::Not(inner) => is_pure(inner, pure_fns),
        Expr::Name(_) | Expr::CodeBlock(_) => true,
    }
}

fn negate(cond: Rc<Expr>) -> Rc<Expr> {
    if let Expr::Not(inner) = &*cond {
        return inner.clone();
    }
    Rc::new(Expr::Not(cond))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::build_ir;
    use crate::ir::FunctionIr;
    use crate::parser::parse;

    fn optimized(source: &str) -> CompilationUnit {
        let mut unit = build_ir(&parse(source).expect("parse"), "Style").expect("build");
        optimize(&mut unit);
        unit
    }

    fn function<'u>(unit: &'u CompilationUnit, name: &str) -> &'u FunctionIr {
        unit.functions
            .iter()
            .find(|f| f.name == name)
            .expect("function present")
    }

    #[test]
    fn elides_discarded_pure_expressions() {
        let unit = optimized("FUNCTION {f}{ #1 pop$ }");
        assert!(unit.functions[0].body.is_empty());
    }

    #[test]
    fn elides_discarded_calls_of_pure_functions() {
        let unit = optimized("MACRO {jan}{\"January\"} FUNCTION {g}{ jan pop$ }");
        assert!(function(&unit, "g").body.is_empty());
    }

    #[test]
    fn keeps_discards_whose_value_has_effects() {
        // f writes before pushing its result; dropping the discarded
        // call would drop the write.
        let unit = optimized("FUNCTION {f}{ \"x\" write$ #1 } FUNCTION {g}{ f pop$ }");
        let g = function(&unit, "g");
        assert_eq!(g.body.len(), 1);
        assert!(matches!(g.body[0], Stmt::Discard(_)));
    }

    #[test]
    fn effectful_calls_taint_enclosing_expressions() {
        let unit = optimized(
            "FUNCTION {f}{ \"x\" write$ #1 } FUNCTION {g}{ f #1 + pop$ }",
        );
        assert_eq!(function(&unit, "g").body.len(), 1);
    }

    #[test]
    fn canonicalizes_an_empty_then_branch() {
        let unit = optimized("FUNCTION {f}{ #1 'skip$ { \"x\" write$ } if$ }");
        let [Stmt::If { cond, then_arm, else_arm }] = unit.functions[0].body.as_slice() else {
            panic!("expected a conditional");
        };
        assert!(matches!(&**cond, Expr::Not(_)));
        assert_eq!(then_arm.len(), 1);
        assert!(else_arm.is_empty());
    }

    #[test]
    fn keeps_a_non_empty_then_branch() {
        let unit = optimized("FUNCTION {f}{ #1 { \"x\" write$ } 'skip$ if$ }");
        let [Stmt::If { cond, then_arm, .. }] = unit.functions[0].body.as_slice() else {
            panic!("expected a conditional");
        };
        assert!(!matches!(&**cond, Expr::Not(_)));
        assert_eq!(then_arm.len(), 1);
    }

    #[test]
    fn negates_even_when_both_arms_are_empty() {
        let unit = optimized("FUNCTION {f}{ #1 'skip$ 'skip$ if$ }");
        let [Stmt::If { cond, then_arm, else_arm }] = unit.functions[0].body.as_slice() else {
            panic!("expected a conditional");
        };
        assert!(matches!(&**cond, Expr::Not(_)));
        assert!(then_arm.is_empty());
        assert!(else_arm.is_empty());
    }

    #[test]
    fn elision_applies_inside_loop_bodies() {
        let unit = optimized(
            "INTEGERS {i} FUNCTION {f}{ { i } { #1 pop$ #0 'i := } while$ }",
        );
        let [Stmt::While { body, .. }] = unit.functions[0].body.as_slice() else {
            panic!("expected a loop");
        };
        assert_eq!(body.len(), 1);
    }
}
