#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use infraql_ast::*;
use infraql_core::{Keyword, TokenKind};

use crate::{error::ParserError, parser::Parser};

impl Parser {
    /// Parses a `TRACE` statement.
    ///
    /// ```txt
    /// TRACE ident '=' literal THROUGH ident (',' ident)*
    /// ```
    pub fn parse_trace_stmt(&mut self) -> Result<TraceStmt, ParserError> {
        self.expect_keyword(Keyword::TRACE)?;
        let identifier = self.parse_identifier()?;
        self.expect_token(&TokenKind::Equal)?;
        let value = self.parse_literal()?;
        self.expect_keyword(Keyword::THROUGH)?;
        let through = self.parse_comma_separated(Self::parse_identifier)?;
        Ok(TraceStmt {
            identifier,
            value,
            through,
        })
    }

    /// Parses a `DESCRIBE <table>` statement.
    pub fn parse_describe_stmt(&mut self) -> Result<DescribeStmt, ParserError> {
        self.expect_keyword(Keyword::DESCRIBE)?;
        let table = self.parse_identifier()?;
        Ok(DescribeStmt { table })
    }

    /// Parses a `SHOW` statement.
    ///
    /// `SHOW CACHE` is a cache statement, so the choice of statement needs
    /// one token of lookahead after the `SHOW` keyword.
    pub fn parse_show_stmt(&mut self) -> Result<Statement, ParserError> {
        self.expect_keyword(Keyword::SHOW)?;
        if self.parse_keyword(Keyword::CACHE) {
            return Ok(Statement::Cache(CacheStmt {
                action: CacheAction::Show,
                table: None,
                ttl_ms: None,
            }));
        }
        let what = match self.expect_one_of_keywords(&[
            Keyword::TABLES,
            Keyword::PLUGINS,
            Keyword::SOURCES,
        ])? {
            Keyword::TABLES => ShowTarget::Tables,
            Keyword::PLUGINS => ShowTarget::Plugins,
            Keyword::SOURCES => ShowTarget::Sources,
            _ => unreachable!(),
        };
        Ok(Statement::Show(ShowStmt { what }))
    }

    /// Parses a cache-control statement.
    ///
    /// ```txt
    /// CACHE SHOW
    /// CACHE CLEAR [ ident ]
    /// CACHE SET TTL [ ident ] number
    /// ```
    pub fn parse_cache_stmt(&mut self) -> Result<CacheStmt, ParserError> {
        self.expect_keyword(Keyword::CACHE)?;
        match self.expect_one_of_keywords(&[Keyword::SHOW, Keyword::CLEAR, Keyword::SET])? {
            Keyword::SHOW => Ok(CacheStmt {
                action: CacheAction::Show,
                table: None,
                ttl_ms: None,
            }),
            Keyword::CLEAR => {
                let table = self.parse_optional_table_name();
                Ok(CacheStmt {
                    action: CacheAction::Clear,
                    table,
                    ttl_ms: None,
                })
            }
            Keyword::SET => {
                self.expect_keyword(Keyword::TTL)?;
                let table = self.parse_optional_table_name();
                let ttl_ms = self.parse_integer("TTL")?;
                Ok(CacheStmt {
                    action: CacheAction::SetTtl,
                    table,
                    ttl_ms: Some(ttl_ms),
                })
            }
            _ => unreachable!(),
        }
    }

    /// Consumes an identifier naming a table if one is next.
    fn parse_optional_table_name(&mut self) -> Option<String> {
        match self.peek_token().map(|token| token.kind.clone()) {
            Some(TokenKind::Ident(value)) => {
                self.next_token();
                Some(value)
            }
            _ => None,
        }
    }
}
