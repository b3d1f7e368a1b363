//! SQL Parser
//!
//! This module parses SQL tokens into an AST. It is a recursive-descent
//! parser with one token of lookahead over the supported grammar:
//!
//! ```text
//! script      := (statement ';')* statement? EOF
//! statement   := create_table | create_index | insert | select | update | delete
//! ```
//!
//! Comparison operators other than `=` are lexed but rejected here with a
//! not-implemented error, so callers see a clear message instead of a
//! confusing syntax error.

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::catalog::DataType;
use crate::error::{Error, Result};

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse exactly one SQL statement
    pub fn parse(&mut self) -> Result<Statement> {
        let mut statements = self.parse_script()?;
        match statements.pop() {
            Some(stmt) if statements.is_empty() => Ok(stmt),
            _ => Err(Error::ParseError(
                "expected a single statement".to_string(),
            )),
        }
    }

    /// Parse a script: one or more statements separated by semicolons.
    /// Stray semicolons are tolerated; empty input is an error.
    pub fn parse_script(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.check(&Token::Semicolon) {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
            if self.check(&Token::Semicolon) {
                self.advance();
            }
        }

        if statements.is_empty() {
            return Err(Error::ParseError("empty input".to_string()));
        }
        Ok(statements)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Create => self.parse_create(),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Update => self.parse_update().map(Statement::Update),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            _ => Err(Error::UnexpectedToken {
                expected: "SELECT, INSERT, UPDATE, DELETE, or CREATE".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    // ========== CREATE Statements ==========

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(&Token::Create)?;

        match self.current() {
            Token::Table => self.parse_create_table().map(Statement::CreateTable),
            Token::Index => self.parse_create_index().map(Statement::CreateIndex),
            _ => Err(Error::UnexpectedToken {
                expected: "TABLE or INDEX".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Table)?;
        let table_name = self.expect_identifier()?;
        self.expect(&Token::LParen)?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_def()?);
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect(&Token::RParen)?;

        Ok(CreateTableStatement {
            table_name,
            columns,
        })
    }

    fn parse_create_index(&mut self) -> Result<CreateIndexStatement> {
        self.expect(&Token::Index)?;
        let index_name = self.expect_identifier()?;
        self.expect(&Token::On)?;
        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;
        let column_name = self.expect_identifier()?;
        self.expect(&Token::RParen)?;

        Ok(CreateIndexStatement {
            index_name,
            table_name,
            column_name,
        })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier()?;
        let data_type = self.parse_data_type()?;

        let mut not_null = false;
        let mut unique = false;
        let mut primary_key = false;

        // Column flags in any order
        loop {
            if self.check(&Token::Not) {
                self.advance();
                self.expect(&Token::Null)?;
                not_null = true;
            } else if self.check(&Token::Unique) {
                self.advance();
                unique = true;
            } else if self.check(&Token::Primary) {
                self.advance();
                self.expect(&Token::Key)?;
                primary_key = true;
            } else {
                break;
            }
        }

        Ok(ColumnDef {
            name,
            data_type,
            not_null,
            unique,
            primary_key,
        })
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let dt = match self.current() {
            Token::Integer => {
                self.advance();
                DataType::Integer
            }
            Token::Varchar => {
                self.advance();
                self.expect(&Token::LParen)?;
                let len = self.expect_integer()?;
                self.expect(&Token::RParen)?;
                DataType::Varchar(len as usize)
            }
            Token::Text => {
                self.advance();
                DataType::Text
            }
            Token::Date => {
                self.advance();
                DataType::Date
            }
            Token::Boolean => {
                self.advance();
                DataType::Boolean
            }
            _ => {
                return Err(Error::UnexpectedToken {
                    expected: "data type".to_string(),
                    found: format!("{}", self.current()),
                });
            }
        };

        Ok(dt)
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;
        let columns = self.parse_identifier_list()?;
        self.expect(&Token::RParen)?;

        self.expect(&Token::Values)?;

        self.expect(&Token::LParen)?;
        let values = self.parse_literal_list()?;
        self.expect(&Token::RParen)?;

        if columns.len() != values.len() {
            return Err(Error::ParseError(format!(
                "INSERT lists {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }

        Ok(InsertStatement {
            table_name,
            columns,
            values,
        })
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let columns = if self.check(&Token::Asterisk) {
            self.advance();
            None
        } else {
            let mut refs = Vec::new();
            loop {
                refs.push(self.parse_column_ref()?);
                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
            Some(refs)
        };

        self.expect(&Token::From)?;
        let from = self.expect_identifier()?;

        let mut joins = Vec::new();
        while self.check(&Token::Join) {
            joins.push(self.parse_join()?);
        }

        let where_clause = self.parse_optional_where()?;

        Ok(SelectStatement {
            columns,
            from,
            joins,
            where_clause,
        })
    }

    fn parse_join(&mut self) -> Result<JoinClause> {
        self.expect(&Token::Join)?;
        let table = self.expect_identifier()?;
        self.expect(&Token::On)?;

        let left = self.parse_column_ref()?;
        self.expect_eq_operator()?;
        let right = self.parse_column_ref()?;

        Ok(JoinClause { table, left, right })
    }

    // ========== UPDATE Statement ==========

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect(&Token::Update)?;
        let table_name = self.expect_identifier()?;
        self.expect(&Token::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier()?;
            self.expect_eq_operator()?;
            let value = self.parse_literal()?;
            assignments.push(Assignment { column, value });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        let where_clause = self.parse_optional_where()?;

        Ok(UpdateStatement {
            table_name,
            assignments,
            where_clause,
        })
    }

    // ========== DELETE Statement ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_optional_where()?;

        Ok(DeleteStatement {
            table_name,
            where_clause,
        })
    }

    // ========== WHERE Clause ==========

    fn parse_optional_where(&mut self) -> Result<Option<WhereClause>> {
        if !self.check(&Token::Where) {
            return Ok(None);
        }
        self.advance();

        let mut conditions = Vec::new();
        loop {
            let column = self.parse_column_ref()?;
            self.expect_eq_operator()?;
            let value = self.parse_literal()?;
            conditions.push(Condition { column, value });

            if !self.check(&Token::And) {
                break;
            }
            self.advance();
        }

        Ok(Some(WhereClause { conditions }))
    }

    /// Expect `=`; other comparison operators are recognized but unsupported
    fn expect_eq_operator(&mut self) -> Result<()> {
        match self.current() {
            Token::Eq => {
                self.advance();
                Ok(())
            }
            op @ (Token::Neq | Token::Lt | Token::Gt | Token::Lte | Token::Gte) => {
                Err(Error::NotImplemented(format!(
                    "comparison operator '{}'; only '=' is supported",
                    op
                )))
            }
            _ => Err(Error::UnexpectedToken {
                expected: "=".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    // ========== Helper functions ==========

    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.expect_identifier()?;

        if self.check(&Token::Dot) {
            self.advance();
            let column = self.expect_identifier()?;
            Ok(ColumnRef {
                table: Some(first),
                column,
            })
        } else {
            Ok(ColumnRef {
                table: None,
                column: first,
            })
        }
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        match self.current().clone() {
            Token::IntegerLiteral(n) => {
                self.advance();
                Ok(Literal::Integer(n))
            }
            Token::Minus => {
                self.advance();
                let n = self.expect_integer()?;
                Ok(Literal::Integer(-n))
            }
            Token::StringLiteral(s) => {
                self.advance();
                Ok(Literal::String(s))
            }
            Token::True => {
                self.advance();
                Ok(Literal::Boolean(true))
            }
            Token::False => {
                self.advance();
                Ok(Literal::Boolean(false))
            }
            Token::Null => {
                self.advance();
                Ok(Literal::Null)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "literal".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    fn parse_literal_list(&mut self) -> Result<Vec<Literal>> {
        let mut literals = Vec::new();

        loop {
            literals.push(self.parse_literal()?);
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(literals)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();

        loop {
            identifiers.push(self.expect_identifier()?);
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("{}", token),
                found: format!("{}", self.current()),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "identifier".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    fn expect_integer(&mut self) -> Result<i64> {
        match self.current().clone() {
            Token::IntegerLiteral(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "integer".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }
}
