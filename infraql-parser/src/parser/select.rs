#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use infraql_ast::*;
use infraql_core::{Keyword, TokenKind};

use crate::{
    error::ParserError,
    parser::{aggregate_func, Parser, AGGREGATE_KEYWORDS},
};

impl Parser {
    /// Parses a `SELECT` statement.
    ///
    /// ```txt
    /// SELECT proj (',' proj)* FROM ident joins? where? group? having? order? limit? offset?
    /// ```
    pub fn parse_select_stmt(&mut self) -> Result<SelectStmt, ParserError> {
        self.expect_keyword(Keyword::SELECT)?;
        let columns = self.parse_comma_separated(Self::parse_select_column)?;
        self.expect_keyword(Keyword::FROM)?;
        let from = self.parse_identifier()?;

        let joins = self.parse_joins()?;

        let where_clause = if self.parse_keyword(Keyword::WHERE) {
            Some(self.parse_predicate()?)
        } else {
            None
        };

        let group_by = if self.parse_keyword(Keyword::GROUP) {
            self.expect_keyword(Keyword::BY)?;
            self.parse_comma_separated(Self::parse_qualified_name)?
        } else {
            Vec::new()
        };

        let having = if self.parse_keyword(Keyword::HAVING) {
            Some(self.parse_predicate()?)
        } else {
            None
        };

        let order_by = if self.parse_keyword(Keyword::ORDER) {
            self.expect_keyword(Keyword::BY)?;
            self.parse_comma_separated(Self::parse_order_by_key)?
        } else {
            Vec::new()
        };

        let limit = if self.parse_keyword(Keyword::LIMIT) {
            Some(self.parse_integer("LIMIT")?)
        } else {
            None
        };
        let offset = if self.parse_keyword(Keyword::OFFSET) {
            Some(self.parse_integer("OFFSET")?)
        } else {
            None
        };

        Ok(SelectStmt {
            columns,
            from,
            joins,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    /// Parses one projection item: `*`, a column, or an aggregate call,
    /// optionally aliased with `AS`.
    fn parse_select_column(&mut self) -> Result<SelectColumn, ParserError> {
        if self.next_token_if_kind(&TokenKind::Asterisk) {
            return Ok(SelectColumn::plain("*"));
        }

        let (name, aggregate) = match self.parse_one_of_keywords(AGGREGATE_KEYWORDS) {
            Some(keyword) => {
                self.expect_token(&TokenKind::LeftParen)?;
                let argument = if self.next_token_if_kind(&TokenKind::Asterisk) {
                    String::from("*")
                } else {
                    self.parse_qualified_name()?
                };
                self.expect_token(&TokenKind::RightParen)?;
                (argument, Some(aggregate_func(keyword)))
            }
            None => (self.parse_qualified_name()?, None),
        };

        let alias = if self.parse_keyword(Keyword::AS) {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        Ok(SelectColumn {
            name,
            alias,
            aggregate,
        })
    }

    /// Parses the join list, if any.
    ///
    /// ```txt
    /// joins := (jointype 'JOIN' ident 'ON' qname cmpop qname)+
    /// jointype := 'INNER' | 'LEFT' ['OUTER'] | 'RIGHT' ['OUTER'] | (implicit INNER)
    /// ```
    fn parse_joins(&mut self) -> Result<Vec<Join>, ParserError> {
        let mut joins = Vec::new();
        loop {
            let kind = if self.parse_keyword(Keyword::INNER) {
                JoinKind::Inner
            } else if self.parse_keyword(Keyword::LEFT) {
                self.parse_keyword(Keyword::OUTER);
                JoinKind::Left
            } else if self.parse_keyword(Keyword::RIGHT) {
                self.parse_keyword(Keyword::OUTER);
                JoinKind::Right
            } else if matches!(
                self.peek_token().map(|token| &token.kind),
                Some(TokenKind::Keyword(Keyword::JOIN, _))
            ) {
                JoinKind::Inner
            } else {
                break;
            };
            self.expect_keyword(Keyword::JOIN)?;
            let table = self.parse_identifier()?;
            self.expect_keyword(Keyword::ON)?;
            let left_field = self.parse_qualified_name()?;
            let op = self.parse_compare_symbol()?;
            let right_field = self.parse_qualified_name()?;
            joins.push(Join {
                kind,
                table,
                on: JoinCondition {
                    left_field,
                    op,
                    right_field,
                },
            });
        }
        Ok(joins)
    }

    /// Parses a predicate block.
    ///
    /// The whole block collapses to one combinator; when AND and OR are both
    /// present the last combinator token wins.
    pub(crate) fn parse_predicate(&mut self) -> Result<Predicate, ParserError> {
        let mut conditions = Vec::new();
        let mut combinator = Combinator::And;
        loop {
            conditions.push(self.parse_condition()?);
            if self.parse_keyword(Keyword::AND) {
                combinator = Combinator::And;
            } else if self.parse_keyword(Keyword::OR) {
                combinator = Combinator::Or;
            } else {
                break;
            }
        }
        Ok(Predicate {
            conditions,
            combinator,
        })
    }

    /// Parses one condition.
    ///
    /// ```txt
    /// cond := qname (cmpop literal | 'BETWEEN' literal 'AND' literal
    ///               | 'IN' '(' literal (',' literal)* ')' | 'LIKE' literal)
    /// ```
    fn parse_condition(&mut self) -> Result<Condition, ParserError> {
        let field = self.parse_qualified_name()?;

        if self.parse_keyword(Keyword::LIKE) {
            let value = self.parse_literal()?;
            return Ok(Condition {
                field,
                op: CompareOp::Like,
                value,
                second_value: None,
            });
        }
        if self.parse_keyword(Keyword::IN) {
            self.expect_token(&TokenKind::LeftParen)?;
            let items = self.parse_comma_separated(Self::parse_literal)?;
            self.expect_token(&TokenKind::RightParen)?;
            return Ok(Condition {
                field,
                op: CompareOp::In,
                value: Literal::List(items),
                second_value: None,
            });
        }
        if self.parse_keyword(Keyword::BETWEEN) {
            let lower = self.parse_literal()?;
            self.expect_keyword(Keyword::AND)?;
            let upper = self.parse_literal()?;
            return Ok(Condition {
                field,
                op: CompareOp::Between,
                value: lower,
                second_value: Some(upper),
            });
        }

        let op = self.parse_compare_symbol()?;
        let value = self.parse_literal()?;
        Ok(Condition {
            field,
            op,
            value,
            second_value: None,
        })
    }

    /// Parses one of the symbolic comparison operators.
    fn parse_compare_symbol(&mut self) -> Result<CompareOp, ParserError> {
        let op = match self.peek_token().map(|token| &token.kind) {
            Some(TokenKind::Equal) => CompareOp::Eq,
            Some(TokenKind::NotEqual) => CompareOp::NotEq,
            Some(TokenKind::GreaterThan) => CompareOp::Gt,
            Some(TokenKind::LessThan) => CompareOp::Lt,
            Some(TokenKind::GreaterThanOrEqual) => CompareOp::GtEq,
            Some(TokenKind::LessThanOrEqual) => CompareOp::LtEq,
            _ => {
                let found = self.peek_token().cloned();
                return self.expected("comparison operator", found);
            }
        };
        self.next_token();
        Ok(op)
    }

    /// Parses a literal value.
    pub(crate) fn parse_literal(&mut self) -> Result<Literal, ParserError> {
        let literal = match self.peek_token().map(|token| token.kind.clone()) {
            Some(TokenKind::String(value)) => Literal::String(value),
            Some(TokenKind::Number(value)) => Literal::Number(value),
            Some(TokenKind::Keyword(Keyword::TRUE, _)) => Literal::Boolean(true),
            Some(TokenKind::Keyword(Keyword::FALSE, _)) => Literal::Boolean(false),
            Some(TokenKind::Keyword(Keyword::NULL, _)) => Literal::Null,
            _ => {
                let found = self.peek_token().cloned();
                return self.expected("literal", found);
            }
        };
        self.next_token();
        Ok(literal)
    }

    /// Parses one `ORDER BY` key with its optional direction.
    fn parse_order_by_key(&mut self) -> Result<OrderBy, ParserError> {
        let field = self.parse_qualified_name()?;
        let direction = if self.parse_keyword(Keyword::DESC) {
            OrderDirection::Desc
        } else {
            // ASC is the default and may be omitted
            self.parse_keyword(Keyword::ASC);
            OrderDirection::Asc
        };
        Ok(OrderBy { field, direction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParserError;
    use infraql_ast::Statement;

    fn parse_select(text: &str) -> SelectStmt {
        match crate::parse(text).unwrap() {
            Statement::Select(stmt) => stmt,
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn parse_star_projection() {
        let stmt = parse_select("SELECT * FROM services");
        assert_eq!(stmt.columns, vec![SelectColumn::plain("*")]);
        assert_eq!(stmt.from, "services");
        assert!(stmt.joins.is_empty());
        assert!(stmt.where_clause.is_none());
    }

    #[test]
    fn parse_projection_with_aliases_and_aggregates() {
        let stmt = parse_select(
            "SELECT name, COUNT(*) AS total, SUM(replicas) AS s, services.id FROM services",
        );
        assert_eq!(
            stmt.columns,
            vec![
                SelectColumn::plain("name"),
                SelectColumn {
                    name: "*".into(),
                    alias: Some("total".into()),
                    aggregate: Some(AggregateFunc::Count),
                },
                SelectColumn {
                    name: "replicas".into(),
                    alias: Some("s".into()),
                    aggregate: Some(AggregateFunc::Sum),
                },
                SelectColumn::plain("services.id"),
            ]
        );
    }

    #[test]
    fn parse_where_predicate() {
        let stmt = parse_select("SELECT * FROM services WHERE environment = 'production'");
        assert_eq!(
            stmt.where_clause,
            Some(Predicate {
                conditions: vec![Condition {
                    field: "environment".into(),
                    op: CompareOp::Eq,
                    value: Literal::String("production".into()),
                    second_value: None,
                }],
                combinator: Combinator::And,
            })
        );
    }

    #[test]
    fn parse_where_between_in_like() {
        let stmt = parse_select(
            "SELECT * FROM services \
             WHERE cpu_usage BETWEEN 10 AND 90 \
             AND name LIKE 'api' \
             AND environment IN ('production', 'staging')",
        );
        let predicate = stmt.where_clause.unwrap();
        assert_eq!(predicate.combinator, Combinator::And);
        assert_eq!(predicate.conditions.len(), 3);
        assert_eq!(predicate.conditions[0].op, CompareOp::Between);
        assert_eq!(
            predicate.conditions[0].second_value,
            Some(Literal::Number("90".into()))
        );
        assert_eq!(predicate.conditions[1].op, CompareOp::Like);
        assert_eq!(
            predicate.conditions[2].value,
            Literal::List(vec![
                Literal::String("production".into()),
                Literal::String("staging".into()),
            ])
        );
    }

    #[test]
    fn last_combinator_wins_in_mixed_predicates() {
        let stmt = parse_select(
            "SELECT * FROM services WHERE a = 1 AND b = 2 OR c = 3",
        );
        assert_eq!(stmt.where_clause.unwrap().combinator, Combinator::Or);

        let stmt = parse_select(
            "SELECT * FROM services WHERE a = 1 OR b = 2 AND c = 3",
        );
        assert_eq!(stmt.where_clause.unwrap().combinator, Combinator::And);
    }

    #[test]
    fn parse_join_variants() {
        let stmt = parse_select(
            "SELECT * FROM services \
             INNER JOIN deployments ON services.id = deployments.service_id \
             LEFT OUTER JOIN incidents ON services.id = incidents.service_id \
             JOIN deployments ON id != service_id",
        );
        assert_eq!(stmt.joins.len(), 3);
        assert_eq!(stmt.joins[0].kind, JoinKind::Inner);
        assert_eq!(stmt.joins[0].on.left_field, "services.id");
        assert_eq!(stmt.joins[0].on.right_field, "deployments.service_id");
        assert_eq!(stmt.joins[1].kind, JoinKind::Left);
        assert_eq!(stmt.joins[2].kind, JoinKind::Inner);
        assert_eq!(stmt.joins[2].on.op, CompareOp::NotEq);
    }

    #[test]
    fn parse_group_having_order_limit_offset() {
        let stmt = parse_select(
            "SELECT status, COUNT(*) AS count FROM services \
             GROUP BY status HAVING count > 1 \
             ORDER BY status DESC, name LIMIT 10 OFFSET 5",
        );
        assert_eq!(stmt.group_by, vec!["status".to_string()]);
        // "count" is a keyword, but keeps its source case as an identifier
        let having = stmt.having.unwrap();
        assert_eq!(having.conditions[0].field, "count");
        assert_eq!(
            stmt.order_by,
            vec![
                OrderBy {
                    field: "status".into(),
                    direction: OrderDirection::Desc,
                },
                OrderBy {
                    field: "name".into(),
                    direction: OrderDirection::Asc,
                },
            ]
        );
        assert_eq!(stmt.limit, Some(10));
        assert_eq!(stmt.offset, Some(5));
    }

    #[test]
    fn having_may_reference_aggregate_keyword_aliases() {
        let stmt = parse_select(
            "SELECT status, COUNT(*) AS count FROM services GROUP BY status HAVING COUNT > 1",
        );
        assert_eq!(stmt.having.unwrap().conditions[0].field, "COUNT");
    }

    #[test]
    fn parser_is_deterministic() {
        let text = "SELECT name, status FROM services \
                    WHERE environment = 'production' OR status = 'degraded' \
                    ORDER BY name LIMIT 3";
        assert_eq!(crate::parse(text).unwrap(), crate::parse(text).unwrap());
    }

    #[test]
    fn reject_malformed_selects() {
        assert!(crate::parse("SELECT FROM services").is_err());
        assert!(crate::parse("SELECT * services").is_err());
        assert!(crate::parse("SELECT * FROM services WHERE").is_err());
        assert!(crate::parse("SELECT * FROM services LIMIT 1.5").is_err());
        assert!(crate::parse("SELECT * FROM services LIMIT abc").is_err());
        assert!(crate::parse("SELECT COUNT(* FROM services").is_err());
    }

    #[test]
    fn parse_errors_carry_the_offending_location() {
        let err = crate::parse("SELECT *\nFROM services WHERE").unwrap_err();
        match err {
            ParserError::Parse { location, .. } => assert!(location.is_none()),
            other => panic!("unexpected error: {:?}", other),
        }

        let err = crate::parse("SELECT * FROM services LIMIT x").unwrap_err();
        match err {
            ParserError::Parse {
                location: Some(location),
                ..
            } => {
                assert_eq!(location.line, 1);
                assert_eq!(location.column, 30);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
