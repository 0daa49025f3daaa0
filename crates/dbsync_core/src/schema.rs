//! Schema catalog: turns a `CREATE TABLE` statement into a [`Schema`].
//!
//! Parsing is pure. It rejects statements that are not a single table
//! definition, tables without a primary key (or with more than one),
//! duplicate column names, and primary keys naming unknown columns.
//! Identifiers are compared case-insensitively, as SQLite does.

use crate::error::{CoreError, CoreResult};
use crate::value::Affinity;
use sqlparser::ast::{ColumnOption, Statement, TableConstraint};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use std::collections::HashSet;

/// Type given to untyped columns before parsing. It has the same (blob)
/// affinity SQLite assigns to a column without a declared type.
const PLACEHOLDER_TYPE: &str = "BLOB";

/// A column of the synchronized table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name as declared.
    pub name: String,
    /// Declared type, empty when the column is untyped.
    pub declared_type: String,
    /// Type affinity derived from the declared type.
    pub affinity: Affinity,
}

/// Parsed table definition.
///
/// Immutable once built. The primary key is stored as column indices in
/// key order (the order of the `PRIMARY KEY (...)` list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    table: String,
    columns: Vec<Column>,
    primary_key: Vec<usize>,
    definition: String,
}

impl Schema {
    /// Parses a table definition.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Schema`] if the statement is not exactly one
    /// `CREATE TABLE`, declares no primary key or more than one, repeats a
    /// column name, or keys on an unknown column.
    pub fn parse(definition: &str) -> CoreResult<Self> {
        let dialect = SQLiteDialect {};
        let tokens = Tokenizer::new(&dialect, definition)
            .tokenize()
            .map_err(|e| CoreError::schema(format!("unparsable table definition: {e}")))?;
        let (tokens, untyped) = type_untyped_columns(tokens);
        let statements = Parser::new(&dialect)
            .with_tokens(tokens)
            .parse_statements()
            .map_err(|e| CoreError::schema(format!("unparsable table definition: {e}")))?;

        let statement = match statements.as_slice() {
            [statement] => statement,
            [] => return Err(CoreError::schema("empty table definition")),
            _ => return Err(CoreError::schema("expected a single CREATE TABLE statement")),
        };

        let Statement::CreateTable {
            name,
            columns: column_defs,
            constraints,
            ..
        } = statement
        else {
            return Err(CoreError::schema("statement is not a CREATE TABLE"));
        };

        let table = name
            .0
            .last()
            .map(|ident| ident.value.clone())
            .ok_or_else(|| CoreError::schema("missing table name"))?;

        if column_defs.is_empty() {
            return Err(CoreError::schema(format!("table {table} declares no columns")));
        }

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(column_defs.len());
        let mut key_declarations: Vec<Vec<String>> = Vec::new();

        for def in column_defs {
            let name = def.name.value.clone();
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(CoreError::schema(format!("duplicate column {name}")));
            }

            for option in &def.options {
                if let ColumnOption::Unique {
                    is_primary: true, ..
                } = option.option
                {
                    key_declarations.push(vec![name.clone()]);
                }
            }

            let declared_type = if untyped.contains(&name.to_ascii_lowercase()) {
                String::new()
            } else {
                def.data_type.to_string()
            };
            columns.push(Column {
                affinity: Affinity::from_declared_type(&declared_type),
                declared_type,
                name,
            });
        }

        for constraint in constraints {
            if let TableConstraint::Unique {
                columns: key_columns,
                is_primary: true,
                ..
            } = constraint
            {
                key_declarations.push(key_columns.iter().map(|c| c.value.clone()).collect());
            }
        }

        let key_names = match key_declarations.len() {
            0 => return Err(CoreError::schema(format!("table {table} has no primary key"))),
            1 => key_declarations.remove(0),
            _ => {
                return Err(CoreError::schema(format!(
                    "table {table} declares more than one primary key"
                )))
            }
        };

        let mut primary_key = Vec::with_capacity(key_names.len());
        for key_name in &key_names {
            let index = columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(key_name))
                .ok_or_else(|| {
                    CoreError::schema(format!("primary key references unknown column {key_name}"))
                })?;
            if primary_key.contains(&index) {
                return Err(CoreError::schema(format!(
                    "column {key_name} repeated in primary key"
                )));
            }
            primary_key.push(index);
        }

        Ok(Self {
            table,
            columns,
            primary_key,
            definition: definition.to_owned(),
        })
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Primary-key column indices in key order.
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    /// The original statement.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Returns true if the column at `index` is part of the primary key.
    pub fn is_key_column(&self, index: usize) -> bool {
        self.primary_key.contains(&index)
    }

    /// Looks up a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Primary-key column names in key order.
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.primary_key
            .iter()
            .map(move |&i| self.columns[i].name.as_str())
    }
}

/// Inserts [`PLACEHOLDER_TYPE`] after every column declared without a type,
/// which SQLite accepts and the parser does not. Returns the rewritten
/// tokens and the lowercased names of the untyped columns.
fn type_untyped_columns(tokens: Vec<Token>) -> (Vec<Token>, HashSet<String>) {
    let mut out = Vec::with_capacity(tokens.len() + 2);
    let mut untyped = HashSet::new();
    let mut depth = 0usize;
    let mut list_opened = false;
    let mut element_start = false;
    let mut column: Option<String> = None;

    for token in tokens {
        if matches!(token, Token::Whitespace(_)) {
            out.push(token);
            continue;
        }

        if let Some(name) = column.take() {
            if ends_column_name(&token) {
                out.push(Token::Whitespace(Whitespace::Space));
                out.push(Token::make_word(PLACEHOLDER_TYPE, None));
                untyped.insert(name);
            }
        }

        if element_start {
            element_start = false;
            if let Token::Word(word) = &token {
                if !starts_table_constraint(word.keyword) {
                    column = Some(word.value.to_ascii_lowercase());
                }
            }
        }

        match &token {
            Token::LParen => {
                depth += 1;
                if depth == 1 && !list_opened {
                    list_opened = true;
                    element_start = true;
                }
            }
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 1 => element_start = true,
            _ => {}
        }
        out.push(token);
    }

    (out, untyped)
}

fn starts_table_constraint(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::CONSTRAINT | Keyword::PRIMARY | Keyword::UNIQUE | Keyword::CHECK | Keyword::FOREIGN
    )
}

fn ends_column_name(token: &Token) -> bool {
    match token {
        Token::Comma | Token::RParen | Token::EOF => true,
        Token::Word(word) => matches!(
            word.keyword,
            Keyword::PRIMARY
                | Keyword::NOT
                | Keyword::NULL
                | Keyword::UNIQUE
                | Keyword::CHECK
                | Keyword::DEFAULT
                | Keyword::COLLATE
                | Keyword::REFERENCES
                | Keyword::CONSTRAINT
                | Keyword::GENERATED
                | Keyword::AS
        ),
        _ => false,
    }
}
