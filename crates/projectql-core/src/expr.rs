//! [`ProjectionFragment`]: the composable expression tree a selection
//! compiles into. Built bottom-up by
//! [`crate::compile::project`], rewritten in place by [`crate::extension`]
//! pipelines, and evaluated by [`crate::exec`] against a live
//! [`HostValue`].

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::exec::ExecutionError;
use crate::host::value::HostValue;

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<Literal> for HostValue {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Null => Self::Null,
            Literal::Bool(b) => Self::Bool(b),
            Literal::Int(n) => Self::Int(n),
            Literal::Float(n) => Self::Float(n),
            Literal::String(s) => Self::String(s),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// A pure, composable projection over a host value. `Context` stands for
/// whatever value is "in scope" at that point in the tree: the field's
/// parent object at the root, or the current element inside a `Where`/
/// `Select`/`OrderBy` callback.
#[derive(Clone, Debug)]
pub enum ProjectionFragment {
    Literal(Literal),
    Context,
    Member {
        base: Box<ProjectionFragment>,
        name: String,
    },
    /// Anonymous-record construction: `{ name_i = expr_i, ... }`.
    Record(Vec<(String, ProjectionFragment)>),
    /// `base == null ? null : project(base)`, `project`'s `Context`
    /// referring to the (non-null) value of `base`.
    NullGuard {
        base: Box<ProjectionFragment>,
        project: Box<ProjectionFragment>,
    },
    Where {
        base: Box<ProjectionFragment>,
        predicate: Box<ProjectionFragment>,
    },
    OrderBy {
        base: Box<ProjectionFragment>,
        key: Box<ProjectionFragment>,
        descending: bool,
    },
    /// `count` is itself an expression (evaluated against the same
    /// context as `base`, not the element) so paging math that depends on
    /// a runtime-known total (e.g. `last` without a cursor) can be
    /// expressed without a separate "dynamic" node kind.
    Skip {
        base: Box<ProjectionFragment>,
        count: Box<ProjectionFragment>,
    },
    Take {
        base: Box<ProjectionFragment>,
        count: Box<ProjectionFragment>,
    },
    Count(Box<ProjectionFragment>),
    First {
        base: Box<ProjectionFragment>,
        predicate: Option<Box<ProjectionFragment>>,
    },
    Any {
        base: Box<ProjectionFragment>,
        predicate: Box<ProjectionFragment>,
    },
    /// The collection analogue of `Record`: `base.select(elem => project)`.
    Select {
        base: Box<ProjectionFragment>,
        project: Box<ProjectionFragment>,
    },
    /// The 0-based position of the current element within the nearest
    /// enclosing `Select`'s base sequence. Used by the connection
    /// extension to build edge cursors without a separate index parameter.
    ElementIndex,
    BinOp {
        op: BinOp,
        lhs: Box<ProjectionFragment>,
        rhs: Box<ProjectionFragment>,
    },
    Not(Box<ProjectionFragment>),
    /// Base64-encodes an integer-valued inner expression into the opaque
    /// cursor string format. Used by the connection paging extension to
    /// compute `edges[].cursor` from `ElementIndex`.
    Cursor(Box<ProjectionFragment>),
    /// Binds `value`'s result to `name` for the evaluation of `body`,
    /// visible through any nested `Select`/`Where` scope inside `body`
    /// (unlike `Context`, which rebinds at each scope). Used by the
    /// connection extension to compute a paging offset once (it may
    /// depend on a runtime-known total) and reuse it in both the
    /// windowing `Skip` and each edge's cursor.
    Let {
        name: String,
        value: Box<ProjectionFragment>,
        body: Box<ProjectionFragment>,
    },
    Var(String),
    /// `if cond then then else els`, all evaluated against the same
    /// `Context`/`index`/`env`. A general-purpose conditional beyond the
    /// null-guard case, used internally by the connection extension to
    /// compute `startCursor`/`endCursor` for an empty page.
    If {
        cond: Box<ProjectionFragment>,
        then: Box<ProjectionFragment>,
        els: Box<ProjectionFragment>,
    },
    /// Escape hatch for host-provided logic the tree can't express
    /// (mutation side effects, custom scalar coercion). Never produced by
    /// the core expression builder itself.
    Native(Arc<dyn Fn(&HostValue) -> Result<HostValue, ExecutionError> + Send + Sync>),
}

impl std::fmt::Display for ProjectionFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// `Let`-bound values, inherited unchanged into nested `Select`/`Where`
/// scopes (unlike `ctx`/`index`, which rebind at each of those).
type Env = IndexMap<String, HostValue>;

/// Evaluate `expr` against a root context value.
pub fn eval(expr: &ProjectionFragment, ctx: &HostValue) -> Result<HostValue, ExecutionError> {
    eval_scoped(expr, ctx, None, &Env::new())
}

fn eval_scoped(
    expr: &ProjectionFragment,
    ctx: &HostValue,
    index: Option<i64>,
    env: &Env,
) -> Result<HostValue, ExecutionError> {
    use ProjectionFragment as P;
    match expr {
        P::Literal(lit) => Ok(lit.clone().into()),
        P::Context => Ok(ctx.clone()),
        P::ElementIndex => index.map(HostValue::Int).ok_or_else(|| {
            ExecutionError::Internal("ElementIndex used outside a Select".to_string())
        }),
        P::Var(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutionError::Internal(format!("unbound variable '{name}'"))),
        P::Let { name, value, body } => {
            let bound = eval_scoped(value, ctx, index, env)?;
            let mut inner_env = env.clone();
            inner_env.insert(name.clone(), bound);
            eval_scoped(body, ctx, index, &inner_env)
        }
        P::Member { base, name } => eval_scoped(base, ctx, index, env)?.get_field(name),
        P::Record(fields) => {
            let mut map = IndexMap::new();
            for (name, field_expr) in fields {
                map.insert(name.clone(), eval_scoped(field_expr, ctx, index, env)?);
            }
            Ok(HostValue::Record(map))
        }
        P::NullGuard { base, project } => {
            let base_val = eval_scoped(base, ctx, index, env)?;
            if base_val.is_null() {
                Ok(HostValue::Null)
            } else {
                eval_scoped(project, &base_val, None, env)
            }
        }
        P::Where { base, predicate } => {
            let items = eval_scoped(base, ctx, index, env)?.into_list()?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if eval_scoped(predicate, &item, None, env)?.truthy() {
                    out.push(item);
                }
            }
            Ok(HostValue::List(out))
        }
        P::OrderBy {
            base,
            key,
            descending,
        } => {
            let mut items = eval_scoped(base, ctx, index, env)?.into_list()?;
            let mut keyed = items
                .drain(..)
                .map(|item| {
                    let k = eval_scoped(key, &item, None, env)?;
                    Ok::<_, ExecutionError>((k, item))
                })
                .collect::<Result<Vec<_>, _>>()?;
            keyed.sort_by(|(a, _), (b, _)| {
                a.partial_compare(b).unwrap_or(Ordering::Equal)
            });
            if *descending {
                keyed.reverse();
            }
            Ok(HostValue::List(keyed.into_iter().map(|(_, v)| v).collect()))
        }
        P::Skip { base, count } => {
            let items = eval_scoped(base, ctx, index, env)?.into_list()?;
            let n = eval_count(count, ctx, index, env)?;
            Ok(HostValue::List(items.into_iter().skip(n).collect()))
        }
        P::Take { base, count } => {
            let items = eval_scoped(base, ctx, index, env)?.into_list()?;
            let n = eval_count(count, ctx, index, env)?;
            Ok(HostValue::List(items.into_iter().take(n).collect()))
        }
        P::Count(base) => {
            let items = eval_scoped(base, ctx, index, env)?.into_list()?;
            Ok(HostValue::Int(items.len() as i64))
        }
        P::First { base, predicate } => {
            let items = eval_scoped(base, ctx, index, env)?.into_list()?;
            for item in items {
                let matches = match predicate {
                    Some(pred) => eval_scoped(pred, &item, None, env)?.truthy(),
                    None => true,
                };
                if matches {
                    return Ok(item);
                }
            }
            Ok(HostValue::Null)
        }
        P::Any { base, predicate } => {
            let items = eval_scoped(base, ctx, index, env)?.into_list()?;
            for item in items {
                if eval_scoped(predicate, &item, None, env)?.truthy() {
                    return Ok(HostValue::Bool(true));
                }
            }
            Ok(HostValue::Bool(false))
        }
        P::Select { base, project } => {
            let items = eval_scoped(base, ctx, index, env)?.into_list()?;
            let projected = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| eval_scoped(project, &item, Some(i as i64), env))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(HostValue::List(projected))
        }
        P::BinOp { op, lhs, rhs } => {
            let l = eval_scoped(lhs, ctx, index, env)?;
            let r = eval_scoped(rhs, ctx, index, env)?;
            eval_binop(*op, &l, &r)
        }
        P::Not(inner) => Ok(HostValue::Bool(!eval_scoped(inner, ctx, index, env)?.truthy())),
        P::Cursor(inner) => {
            let value = eval_scoped(inner, ctx, index, env)?;
            let offset = value
                .as_i64()
                .ok_or_else(|| ExecutionError::Internal(format!("cursor of non-integer value {value}")))?;
            Ok(HostValue::String(crate::cursor::encode(offset)))
        }
        P::If { cond, then, els } => {
            if eval_scoped(cond, ctx, index, env)?.truthy() {
                eval_scoped(then, ctx, index, env)
            } else {
                eval_scoped(els, ctx, index, env)
            }
        }
        P::Native(f) => f(ctx),
    }
}

fn eval_count(
    expr: &ProjectionFragment,
    ctx: &HostValue,
    index: Option<i64>,
    env: &Env,
) -> Result<usize, ExecutionError> {
    let value = eval_scoped(expr, ctx, index, env)?;
    let n = value
        .as_i64()
        .ok_or_else(|| ExecutionError::Internal(format!("expected an integer count, found {value}")))?;
    Ok(n.max(0) as usize)
}

pub fn literal_usize(n: usize) -> ProjectionFragment {
    ProjectionFragment::Literal(Literal::Int(n as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(name: &str, age: i64) -> HostValue {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), HostValue::String(name.to_string()));
        map.insert("age".to_string(), HostValue::Int(age));
        HostValue::Record(map)
    }

    #[test]
    fn member_reads_a_record_field() {
        let expr = ProjectionFragment::Member {
            base: Box::new(ProjectionFragment::Context),
            name: "name".to_string(),
        };
        let result = eval(&expr, &person("Ada", 36)).unwrap();
        assert_eq!(result.as_str(), Some("Ada"));
    }

    #[test]
    fn null_guard_short_circuits_on_null() {
        let expr = ProjectionFragment::NullGuard {
            base: Box::new(ProjectionFragment::Context),
            project: Box::new(ProjectionFragment::Member {
                base: Box::new(ProjectionFragment::Context),
                name: "name".to_string(),
            }),
        };
        assert!(eval(&expr, &HostValue::Null).unwrap().is_null());

        let result = eval(&expr, &person("Ada", 36)).unwrap();
        assert_eq!(result.as_str(), Some("Ada"));
    }

    #[test]
    fn where_filters_by_predicate_against_each_element() {
        let people = HostValue::List(vec![person("Ada", 36), person("Grace", 85)]);
        let expr = ProjectionFragment::Where {
            base: Box::new(ProjectionFragment::Context),
            predicate: Box::new(ProjectionFragment::BinOp {
                op: BinOp::Gt,
                lhs: Box::new(ProjectionFragment::Member {
                    base: Box::new(ProjectionFragment::Context),
                    name: "age".to_string(),
                }),
                rhs: Box::new(ProjectionFragment::Literal(Literal::Int(50))),
            }),
        };
        let result = eval(&expr, &people).unwrap().into_list().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].get_field("name").unwrap().as_str(), Some("Grace"));
    }

    #[test]
    fn order_by_sorts_ascending_then_descending() {
        let people = HostValue::List(vec![person("Ada", 36), person("Grace", 85), person("Alan", 41)]);
        let key = Box::new(ProjectionFragment::Member {
            base: Box::new(ProjectionFragment::Context),
            name: "age".to_string(),
        });

        let ascending = ProjectionFragment::OrderBy {
            base: Box::new(ProjectionFragment::Context),
            key: key.clone(),
            descending: false,
        };
        let result = eval(&ascending, &people).unwrap().into_list().unwrap();
        let ages: Vec<i64> = result.iter().map(|p| p.get_field("age").unwrap().as_i64().unwrap()).collect();
        assert_eq!(ages, vec![36, 41, 85]);

        let descending = ProjectionFragment::OrderBy {
            base: Box::new(ProjectionFragment::Context),
            key,
            descending: true,
        };
        let result = eval(&descending, &people).unwrap().into_list().unwrap();
        let ages: Vec<i64> = result.iter().map(|p| p.get_field("age").unwrap().as_i64().unwrap()).collect();
        assert_eq!(ages, vec![85, 41, 36]);
    }

    #[test]
    fn skip_and_take_compose() {
        let items = HostValue::List((0..5).map(HostValue::Int).collect());
        let expr = ProjectionFragment::Take {
            base: Box::new(ProjectionFragment::Skip {
                base: Box::new(ProjectionFragment::Context),
                count: Box::new(literal_usize(1)),
            }),
            count: Box::new(literal_usize(2)),
        };
        let result = eval(&expr, &items).unwrap().into_list().unwrap();
        let values: Vec<i64> = result.iter().map(|v| v.as_i64().unwrap()).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn let_binds_a_variable_visible_inside_nested_select() {
        let items = HostValue::List(vec![HostValue::Int(1), HostValue::Int(2)]);
        let expr = ProjectionFragment::Let {
            name: "bonus".to_string(),
            value: Box::new(ProjectionFragment::Literal(Literal::Int(10))),
            body: Box::new(ProjectionFragment::Select {
                base: Box::new(ProjectionFragment::Context),
                project: Box::new(ProjectionFragment::BinOp {
                    op: BinOp::Add,
                    lhs: Box::new(ProjectionFragment::Context),
                    rhs: Box::new(ProjectionFragment::Var("bonus".to_string())),
                }),
            }),
        };
        let result = eval(&expr, &items).unwrap().into_list().unwrap();
        let values: Vec<i64> = result.iter().map(|v| v.as_i64().unwrap()).collect();
        assert_eq!(values, vec![11, 12]);
    }

    #[test]
    fn element_index_tracks_position_within_select() {
        let items = HostValue::List(vec![HostValue::Int(10), HostValue::Int(20)]);
        let expr = ProjectionFragment::Select {
            base: Box::new(ProjectionFragment::Context),
            project: Box::new(ProjectionFragment::ElementIndex),
        };
        let result = eval(&expr, &items).unwrap().into_list().unwrap();
        let indices: Vec<i64> = result.iter().map(|v| v.as_i64().unwrap()).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn element_index_outside_select_is_an_error() {
        let result = eval(&ProjectionFragment::ElementIndex, &HostValue::Null);
        assert!(result.is_err());
    }

    #[test]
    fn first_returns_null_when_nothing_matches() {
        let items = HostValue::List(vec![HostValue::Int(1), HostValue::Int(2)]);
        let expr = ProjectionFragment::First {
            base: Box::new(ProjectionFragment::Context),
            predicate: Some(Box::new(ProjectionFragment::BinOp {
                op: BinOp::Gt,
                lhs: Box::new(ProjectionFragment::Context),
                rhs: Box::new(ProjectionFragment::Literal(Literal::Int(5))),
            })),
        };
        assert!(eval(&expr, &items).unwrap().is_null());
    }

    #[test]
    fn cursor_base64_encodes_an_integer_offset() {
        let expr = ProjectionFragment::Cursor(Box::new(ProjectionFragment::Literal(Literal::Int(3))));
        let result = eval(&expr, &HostValue::Null).unwrap();
        assert_eq!(result.as_str(), Some(crate::cursor::encode(3).as_str()));
    }

    #[test]
    fn arithmetic_stays_int_for_int_operands_but_floats_for_div() {
        let add = ProjectionFragment::BinOp {
            op: BinOp::Add,
            lhs: Box::new(ProjectionFragment::Literal(Literal::Int(2))),
            rhs: Box::new(ProjectionFragment::Literal(Literal::Int(3))),
        };
        assert!(matches!(eval(&add, &HostValue::Null).unwrap(), HostValue::Int(5)));

        let div = ProjectionFragment::BinOp {
            op: BinOp::Div,
            lhs: Box::new(ProjectionFragment::Literal(Literal::Int(5))),
            rhs: Box::new(ProjectionFragment::Literal(Literal::Int(2))),
        };
        match eval(&div, &HostValue::Null).unwrap() {
            HostValue::Float(f) => assert!((f - 2.5).abs() < f64::EPSILON),
            other => panic!("expected a float, got {other:?}"),
        }
    }

    #[test]
    fn comparison_across_incompatible_types_is_an_error() {
        let expr = ProjectionFragment::BinOp {
            op: BinOp::Lt,
            lhs: Box::new(ProjectionFragment::Literal(Literal::String("a".to_string()))),
            rhs: Box::new(ProjectionFragment::Literal(Literal::Int(1))),
        };
        assert!(eval(&expr, &HostValue::Null).is_err());
    }

    #[test]
    fn if_branches_on_truthiness() {
        let expr = ProjectionFragment::If {
            cond: Box::new(ProjectionFragment::Literal(Literal::Bool(true))),
            then: Box::new(ProjectionFragment::Literal(Literal::Int(1))),
            els: Box::new(ProjectionFragment::Literal(Literal::Int(2))),
        };
        assert!(matches!(eval(&expr, &HostValue::Null).unwrap(), HostValue::Int(1)));
    }
}

fn eval_binop(op: BinOp, l: &HostValue, r: &HostValue) -> Result<HostValue, ExecutionError> {
    use BinOp::*;
    match op {
        And => return Ok(HostValue::Bool(l.truthy() && r.truthy())),
        Or => return Ok(HostValue::Bool(l.truthy() || r.truthy())),
        Eq => return Ok(HostValue::Bool(l.value_eq(r))),
        Ne => return Ok(HostValue::Bool(!l.value_eq(r))),
        _ => {}
    }
    match op {
        Lt | Le | Gt | Ge => {
            let ord = l
                .partial_compare(r)
                .ok_or_else(|| ExecutionError::Internal(format!("cannot compare {l} and {r}")))?;
            let result = match op {
                Lt => ord == Ordering::Less,
                Le => ord != Ordering::Greater,
                Gt => ord == Ordering::Greater,
                Ge => ord != Ordering::Less,
                _ => unreachable!(),
            };
            Ok(HostValue::Bool(result))
        }
        Add | Sub | Mul | Div | Mod | Pow => {
            let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
                return Err(ExecutionError::Internal(format!(
                    "arithmetic on non-numeric values {l} and {r}"
                )));
            };
            let result = match op {
                Add => a + b,
                Sub => a - b,
                Mul => a * b,
                Div => a / b,
                Mod => a % b,
                Pow => a.powf(b),
                _ => unreachable!(),
            };
            if matches!((l, r), (HostValue::Int(_), HostValue::Int(_))) && op != Div && op != Pow {
                Ok(HostValue::Int(result as i64))
            } else {
                Ok(HostValue::Float(result))
            }
        }
        And | Or | Eq | Ne => unreachable!("handled above"),
    }
}
