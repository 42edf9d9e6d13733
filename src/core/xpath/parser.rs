//! XPath parser
//!
//! Recursive descent over the token stream, one method per grammar level
//! from `or` down to location steps. Prefixes and function names are
//! resolved here so a bad expression fails before any document is read.

use crate::core::error::{PruneError, PruneResult};
use crate::core::namespace::NamespaceMap;
use crate::core::xpath::ast::{Axis, BinaryOp, Call, Expr, LocationPath, NodeTest, Step};
use crate::core::xpath::functions::{build_regex, Function};
use crate::core::xpath::lexer::{tokenize, Token};

/// Compile an expression, resolving prefixes through `namespaces`
pub fn compile(source: &str, namespaces: &NamespaceMap) -> PruneResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        namespaces,
    };
    if parser.tokens.is_empty() {
        return Err(parser.error("empty expression"));
    }
    let expr = parser.or_expr()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error(&format!("unexpected {:?}", token)));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    namespaces: &'a NamespaceMap,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> PruneResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {:?}", token)))
        }
    }

    fn error(&self, message: &str) -> PruneError {
        PruneError::Query(format!("Invalid XPath '{}': {}", self.source, message))
    }

    fn binary_level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> PruneResult<Expr>,
    ) -> PruneResult<Expr> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn or_expr(&mut self) -> PruneResult<Expr> {
        self.binary_level(&[(Token::Or, BinaryOp::Or)], Self::and_expr)
    }

    fn and_expr(&mut self) -> PruneResult<Expr> {
        self.binary_level(&[(Token::And, BinaryOp::And)], Self::equality_expr)
    }

    fn equality_expr(&mut self) -> PruneResult<Expr> {
        self.binary_level(
            &[(Token::Eq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
            Self::relational_expr,
        )
    }

    fn relational_expr(&mut self) -> PruneResult<Expr> {
        self.binary_level(
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::LtEq, BinaryOp::LtEq),
                (Token::Gt, BinaryOp::Gt),
                (Token::GtEq, BinaryOp::GtEq),
            ],
            Self::additive_expr,
        )
    }

    fn additive_expr(&mut self) -> PruneResult<Expr> {
        self.binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::multiplicative_expr,
        )
    }

    fn multiplicative_expr(&mut self) -> PruneResult<Expr> {
        self.binary_level(
            &[
                (Token::Multiply, BinaryOp::Mul),
                (Token::Div, BinaryOp::Div),
                (Token::Mod, BinaryOp::Mod),
            ],
            Self::unary_expr,
        )
    }

    fn unary_expr(&mut self) -> PruneResult<Expr> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Negate(Box::new(self.unary_expr()?)));
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> PruneResult<Expr> {
        let mut left = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn path_expr(&mut self) -> PruneResult<Expr> {
        if !self.starts_primary() {
            return Ok(Expr::Path(self.location_path()?));
        }

        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        let steps = self.trailing_steps()?;
        if predicates.is_empty() && steps.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter {
                primary: Box::new(primary),
                predicates,
                steps,
            })
        }
    }

    /// Whether the next tokens begin a filter expression rather than a path
    fn starts_primary(&self) -> bool {
        match self.peek() {
            Some(Token::Literal(_) | Token::Number(_) | Token::LeftParen | Token::Dollar) => true,
            Some(Token::Name { local, .. }) => {
                self.peek_at(1) == Some(&Token::LeftParen) && !is_node_type(local)
            }
            _ => false,
        }
    }

    fn primary_expr(&mut self) -> PruneResult<Expr> {
        match self.next() {
            Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LeftParen) => {
                let expr = self.or_expr()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            Some(Token::Dollar) => Err(self.error("Variables are not supported")),
            Some(Token::Name { prefix, local }) => self.function_call(prefix, local),
            other => Err(self.error(&format!("unexpected {:?}", other))),
        }
    }

    fn function_call(&mut self, prefix: Option<String>, local: String) -> PruneResult<Expr> {
        let namespace = self.resolve_prefix(prefix.as_deref())?;
        let function = Function::lookup(namespace.as_deref(), &local).ok_or_else(|| {
            self.error(&format!("unknown function '{}'", qualified(&prefix, &local)))
        })?;

        self.expect(&Token::LeftParen)?;
        let mut args = Vec::new();
        if !self.eat(&Token::RightParen) {
            loop {
                args.push(self.or_expr()?);
                if self.eat(&Token::RightParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }

        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(self.error(&format!(
                "wrong number of arguments for '{}': {}",
                qualified(&prefix, &local),
                args.len()
            )));
        }

        let regex = if function.takes_pattern() {
            match (args.get(1), args.get(2)) {
                (Some(Expr::Literal(pattern)), None) => Some(build_regex(pattern, "")?),
                (Some(Expr::Literal(pattern)), Some(Expr::Literal(flags))) => {
                    Some(build_regex(pattern, flags)?)
                }
                _ => None,
            }
        } else {
            None
        };

        Ok(Expr::Call(Call {
            function,
            args,
            regex,
        }))
    }

    fn predicates(&mut self) -> PruneResult<Vec<Expr>> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.or_expr()?);
            self.expect(&Token::RightBracket)?;
        }
        Ok(predicates)
    }

    /// Steps after a filter expression (`(//a)[1]//b`)
    fn trailing_steps(&mut self) -> PruneResult<Vec<Step>> {
        let mut steps = Vec::new();
        loop {
            if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
            } else if !self.eat(&Token::Slash) {
                return Ok(steps);
            }
            steps.push(self.step()?);
        }
    }

    fn location_path(&mut self) -> PruneResult<LocationPath> {
        let mut steps = Vec::new();
        let absolute = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if !self.starts_step() {
                    // `/` alone selects the document node
                    return Ok(LocationPath {
                        absolute: true,
                        steps,
                    });
                }
                true
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                true
            }
            _ => false,
        };

        steps.push(self.step()?);
        steps.extend(self.trailing_steps()?);
        Ok(LocationPath { absolute, steps })
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name { .. } | Token::Star | Token::At | Token::Dot | Token::DoubleDot)
        )
    }

    fn step(&mut self) -> PruneResult<Step> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfAxis,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DoubleDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if self.peek_at(1) == Some(&Token::DoubleColon) {
            let name = match self.next() {
                Some(Token::Name { prefix: None, local }) => local,
                other => return Err(self.error(&format!("expected an axis name, got {:?}", other))),
            };
            self.pos += 1;
            Axis::from_name(&name).ok_or_else(|| self.error(&format!("unknown axis '{}'", name)))?
        } else {
            Axis::Child
        };

        let test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn node_test(&mut self) -> PruneResult<NodeTest> {
        match self.next() {
            Some(Token::Star) => Ok(NodeTest::Wildcard),
            Some(Token::Name { prefix: None, local })
                if is_node_type(&local) && self.peek() == Some(&Token::LeftParen) =>
            {
                self.pos += 1;
                let test = match local.as_str() {
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    "node" => NodeTest::Node,
                    _ => {
                        // processing-instruction('target')
                        if matches!(self.peek(), Some(Token::Literal(_))) {
                            self.pos += 1;
                        }
                        NodeTest::ProcessingInstruction
                    }
                };
                self.expect(&Token::RightParen)?;
                Ok(test)
            }
            Some(Token::Name { prefix, local }) => {
                let namespace = self.resolve_prefix(prefix.as_deref())?;
                match (namespace, local.as_str()) {
                    (Some(uri), "*") => Ok(NodeTest::NamespaceWildcard(uri)),
                    (namespace, _) => Ok(NodeTest::Name { namespace, local }),
                }
            }
            other => Err(self.error(&format!("expected a node test, got {:?}", other))),
        }
    }

    fn resolve_prefix(&self, prefix: Option<&str>) -> PruneResult<Option<String>> {
        match prefix {
            None => Ok(None),
            Some(prefix) => self
                .namespaces
                .get_uri(prefix)
                .map(|uri| Some(uri.to_string()))
                .ok_or_else(|| self.error(&format!("undefined namespace prefix '{}'", prefix))),
        }
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "text" | "comment" | "node" | "processing-instruction")
}

fn qualified(prefix: &Option<String>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::namespace::ns;

    fn parse(source: &str) -> PruneResult<Expr> {
        compile(source, &NamespaceMap::defaults())
    }

    #[test]
    fn test_descendant_path() {
        let Expr::Path(path) = parse("//ns:relatedLists").unwrap() else {
            panic!("expected a location path");
        };
        assert!(path.absolute);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(
            path.steps[1].test,
            NodeTest::Name {
                namespace: Some(ns::METADATA.to_string()),
                local: "relatedLists".to_string(),
            }
        );
    }

    #[test]
    fn test_predicates_and_axes() {
        let parsed = parse("ns:fields[ns:fullName = 'A']/following-sibling::*[1]").unwrap();
        let Expr::Path(path) = parsed else {
            panic!("expected a location path");
        };
        assert!(!path.absolute);
        assert_eq!(path.steps[0].predicates.len(), 1);
        assert_eq!(path.steps[1].axis, Axis::FollowingSibling);
        assert_eq!(path.steps[1].test, NodeTest::Wildcard);
    }

    #[test]
    fn test_regex_is_precompiled() {
        let Expr::Path(path) = parse("//ns:fields[re:test(ns:fullName, 'a$', 'i')]").unwrap() else {
            panic!("expected a location path");
        };
        let Expr::Call(call) = &path.steps[1].predicates[0] else {
            panic!("expected a call");
        };
        assert_eq!(call.function, Function::RegexTest);
        assert!(call.regex.as_ref().unwrap().is_match("A"));
    }

    #[test]
    fn test_filter_expression() {
        assert!(matches!(parse("(//ns:a)[1]/ns:b").unwrap(), Expr::Filter { .. }));
        assert!(matches!(
            parse("count(//ns:a) > 1").unwrap(),
            Expr::Binary {
                op: BinaryOp::Gt,
                ..
            }
        ));
        assert!(matches!(parse("text()").unwrap(), Expr::Path(_)));
    }

    #[test]
    fn test_compile_errors() {
        for source in [
            "",
            "//ns:a[",
            "//x:a",
            "//ns:a)",
            "unknown(1)",
            "contains('a')",
            "$var",
            "bogus::a",
            "re:test(., '(')",
        ] {
            let err = parse(source).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Query, "{}", source);
        }
    }
}
