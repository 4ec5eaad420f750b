//! Filter extension (`UseFilter`) and the filter sub-language it parses: a
//! small hand-written lexer/recursive-descent parser, in the spirit of a
//! hand-rolled GraphQL lexer, compiling a filter string directly into a
//! [`ProjectionFragment`] predicate over the collection's element type.

use crate::compile::error::CompileError;
use crate::expr::{BinOp, Literal, ProjectionFragment};
use crate::extension::{ExtensionContext, FieldExtension};
use crate::schema::builder::{SchemaBuilder, SchemaConflict};
use crate::schema::model::{Argument, TypeAnnotation};

#[derive(Debug, Default)]
pub struct UseFilter;

impl FieldExtension for UseFilter {
    fn configure(&self, schema: &mut SchemaBuilder, type_name: &str, field_name: &str) -> Result<(), SchemaConflict> {
        schema.add_argument(
            type_name,
            field_name,
            Argument::new("filter", TypeAnnotation::named("String")),
        )
    }

    fn build_expression(
        &self,
        ctx: &ExtensionContext<'_>,
        current: ProjectionFragment,
    ) -> Result<ProjectionFragment, CompileError> {
        let Some(filter_value) = ctx.argument_values.get("filter") else {
            return Ok(current);
        };
        let Some(filter_src) = filter_value.as_str() else {
            return Ok(current);
        };

        let predicate = parse_filter(filter_src).map_err(|reason| CompileError::InvalidArgument {
            field: ctx.field.name.clone(),
            argument: "filter".to_string(),
            reason,
            location: crate::loc::SourceLocation::BuiltIn,
        })?;

        Ok(ProjectionFragment::Where {
            base: Box::new(current),
            predicate: Box::new(predicate),
        })
    }
}

pub fn parse_filter(src: &str) -> Result<ProjectionFragment, String> {
    let tokens = lex(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(expr)
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Symbol(&'static str),
}

fn lex(src: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '"' {
            let mut s = String::new();
            i += 1;
            loop {
                if i >= chars.len() {
                    return Err("unterminated string literal".to_string());
                }
                match chars[i] {
                    '"' => {
                        i += 1;
                        break;
                    }
                    '\\' => {
                        i += 1;
                        if i >= chars.len() {
                            return Err("unterminated escape sequence".to_string());
                        }
                        s.push(match chars[i] {
                            'n' => '\n',
                            't' => '\t',
                            '"' => '"',
                            '\\' => '\\',
                            other => other,
                        });
                        i += 1;
                    }
                    other => {
                        s.push(other);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(s));
            continue;
        }
        if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            i += 1;
            let mut is_float = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                if chars[i] == '.' {
                    is_float = true;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            if is_float {
                tokens.push(Token::Float(text.parse().map_err(|_| format!("invalid number '{text}'"))?));
            } else {
                tokens.push(Token::Int(text.parse().map_err(|_| format!("invalid number '{text}'"))?));
            }
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(match text.as_str() {
                "true" => Token::Bool(true),
                "false" => Token::Bool(false),
                "null" => Token::Null,
                "and" => Token::Symbol("&&"),
                "or" => Token::Symbol("||"),
                _ => Token::Ident(text),
            });
            continue;
        }

        let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        if let Some(sym) = ["==", "!=", "<=", ">=", "&&", "||"].iter().find(|s| **s == two) {
            tokens.push(Token::Symbol(sym));
            i += 2;
            continue;
        }
        if let Some(sym) = ["^", "*", "/", "%", "+", "-", "<", ">", "(", ")", ".", ","]
            .iter()
            .find(|s| s.chars().next() == Some(c))
        {
            tokens.push(Token::Symbol(sym));
            i += 1;
            continue;
        }
        return Err(format!("unexpected character '{c}'"));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn eat_symbol(&mut self, sym: &str) -> bool {
        if matches!(self.peek(), Some(Token::Symbol(s)) if *s == sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_eof(&self) -> Result<(), String> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(format!("unexpected trailing input at token {}", self.pos))
        }
    }

    fn parse_or(&mut self) -> Result<ProjectionFragment, String> {
        let mut lhs = self.parse_and()?;
        while self.eat_symbol("||") {
            let rhs = self.parse_and()?;
            lhs = binop(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<ProjectionFragment, String> {
        let mut lhs = self.parse_eq()?;
        while self.eat_symbol("&&") {
            let rhs = self.parse_eq()?;
            lhs = binop(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_eq(&mut self) -> Result<ProjectionFragment, String> {
        let mut lhs = self.parse_rel()?;
        loop {
            let op = if self.eat_symbol("==") {
                BinOp::Eq
            } else if self.eat_symbol("!=") {
                BinOp::Ne
            } else {
                break;
            };
            let rhs = self.parse_rel()?;
            lhs = binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_rel(&mut self) -> Result<ProjectionFragment, String> {
        let mut lhs = self.parse_add()?;
        loop {
            let op = if self.eat_symbol("<=") {
                BinOp::Le
            } else if self.eat_symbol(">=") {
                BinOp::Ge
            } else if self.eat_symbol("<") {
                BinOp::Lt
            } else if self.eat_symbol(">") {
                BinOp::Gt
            } else {
                break;
            };
            let rhs = self.parse_add()?;
            lhs = binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> Result<ProjectionFragment, String> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = if self.eat_symbol("+") {
                BinOp::Add
            } else if self.eat_symbol("-") {
                BinOp::Sub
            } else {
                break;
            };
            let rhs = self.parse_mul()?;
            lhs = binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<ProjectionFragment, String> {
        let mut lhs = self.parse_pow()?;
        loop {
            let op = if self.eat_symbol("*") {
                BinOp::Mul
            } else if self.eat_symbol("/") {
                BinOp::Div
            } else if self.eat_symbol("%") {
                BinOp::Mod
            } else {
                break;
            };
            let rhs = self.parse_pow()?;
            lhs = binop(op, lhs, rhs);
        }
        Ok(lhs)
    }

    // Right-associative.
    fn parse_pow(&mut self) -> Result<ProjectionFragment, String> {
        let lhs = self.parse_unary()?;
        if self.eat_symbol("^") {
            let rhs = self.parse_pow()?;
            return Ok(binop(BinOp::Pow, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ProjectionFragment, String> {
        if self.eat_symbol("-") {
            let inner = self.parse_unary()?;
            return Ok(binop(BinOp::Sub, ProjectionFragment::Literal(Literal::Int(0)), inner));
        }
        if matches!(self.peek(), Some(Token::Ident(name)) if name == "not") {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(ProjectionFragment::Not(Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<ProjectionFragment, String> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_symbol(".") {
                let name = self.expect_ident()?;
                if self.eat_symbol("(") {
                    expr = self.parse_method_call(expr, &name)?;
                } else {
                    expr = ProjectionFragment::Member {
                        base: Box::new(expr),
                        name,
                    };
                }
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_method_call(&mut self, base: ProjectionFragment, name: &str) -> Result<ProjectionFragment, String> {
        let result = match name {
            "where" | "filter" => {
                let predicate = self.parse_or()?;
                ProjectionFragment::Where {
                    base: Box::new(base),
                    predicate: Box::new(predicate),
                }
            }
            "any" => {
                let predicate = self.parse_or()?;
                ProjectionFragment::Any {
                    base: Box::new(base),
                    predicate: Box::new(predicate),
                }
            }
            "first" | "last" => {
                let predicate = if matches!(self.peek(), Some(Token::Symbol(")"))) {
                    None
                } else {
                    Some(Box::new(self.parse_or()?))
                };
                let base = if name == "last" {
                    ProjectionFragment::OrderBy {
                        base: Box::new(base),
                        key: Box::new(ProjectionFragment::Context),
                        descending: true,
                    }
                } else {
                    base
                };
                ProjectionFragment::First {
                    base: Box::new(base),
                    predicate,
                }
            }
            "count" => {
                let predicate = if matches!(self.peek(), Some(Token::Symbol(")"))) {
                    None
                } else {
                    Some(self.parse_or()?)
                };
                let filtered = match predicate {
                    Some(p) => ProjectionFragment::Where {
                        base: Box::new(base),
                        predicate: Box::new(p),
                    },
                    None => base,
                };
                ProjectionFragment::Count(Box::new(filtered))
            }
            "take" => ProjectionFragment::Take {
                base: Box::new(base),
                count: Box::new(crate::expr::literal_usize(self.expect_int()? as usize)),
            },
            "skip" => ProjectionFragment::Skip {
                base: Box::new(base),
                count: Box::new(crate::expr::literal_usize(self.expect_int()? as usize)),
            },
            "orderby" => ProjectionFragment::OrderBy {
                base: Box::new(base),
                key: Box::new(self.parse_path_arg()?),
                descending: false,
            },
            "orderbydesc" => ProjectionFragment::OrderBy {
                base: Box::new(base),
                key: Box::new(self.parse_path_arg()?),
                descending: true,
            },
            other => return Err(format!("unknown filter method '{other}'")),
        };
        self.expect_symbol(")")?;
        Ok(result)
    }

    fn parse_path_arg(&mut self) -> Result<ProjectionFragment, String> {
        self.parse_postfix()
    }

    fn parse_primary(&mut self) -> Result<ProjectionFragment, String> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(ProjectionFragment::Literal(Literal::Int(n))),
            Some(Token::Float(n)) => Ok(ProjectionFragment::Literal(Literal::Float(n))),
            Some(Token::Str(s)) => Ok(ProjectionFragment::Literal(Literal::String(s))),
            Some(Token::Bool(b)) => Ok(ProjectionFragment::Literal(Literal::Bool(b))),
            Some(Token::Null) => Ok(ProjectionFragment::Literal(Literal::Null)),
            Some(Token::Ident(name)) => Ok(ProjectionFragment::Member {
                base: Box::new(ProjectionFragment::Context),
                name,
            }),
            Some(Token::Symbol("(")) => {
                let inner = self.parse_or()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }

    fn expect_ident(&mut self) -> Result<String, String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name.to_ascii_lowercase()),
            other => Err(format!("expected identifier, found {other:?}")),
        }
    }

    fn expect_int(&mut self) -> Result<i64, String> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(n),
            other => Err(format!("expected integer argument, found {other:?}")),
        }
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<(), String> {
        if self.eat_symbol(sym) {
            Ok(())
        } else {
            Err(format!("expected '{sym}', found {:?}", self.peek()))
        }
    }
}

fn binop(op: BinOp, lhs: ProjectionFragment, rhs: ProjectionFragment) -> ProjectionFragment {
    ProjectionFragment::BinOp {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::value::HostValue;

    fn person(id: i64) -> HostValue {
        let mut map = indexmap::IndexMap::new();
        map.insert("id".to_string(), HostValue::Int(id));
        HostValue::Record(map)
    }

    #[test]
    fn parses_and_evaluates_equality_or() {
        let expr = parse_filter("id == 12 || id == 10").unwrap();
        assert!(crate::expr::eval(&expr, &person(12)).unwrap().truthy());
        assert!(crate::expr::eval(&expr, &person(10)).unwrap().truthy());
        assert!(!crate::expr::eval(&expr, &person(7)).unwrap().truthy());
    }

    #[test]
    fn parses_parenthesised_precedence() {
        let expr = parse_filter("(id + 1) * 2 == 26").unwrap();
        assert!(crate::expr::eval(&expr, &person(12)).unwrap().truthy());
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(parse_filter("id == \"oops").is_err());
    }
}
