//! SQL toolkit over the plan database

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

use advisor_provider::{ChatParams, Provider};

use super::{strip_code_fence, ToolError, ToolTrait};

/// Longest string value shown in query results
const MAX_STRING_LENGTH: usize = 300;

/// Longest value shown in schema sample rows
const MAX_SAMPLE_LENGTH: usize = 100;

#[derive(Error, Debug)]
pub enum SqlError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("table_names {0:?} not found in database")]
    UnknownTables(Vec<String>),
}

/// SQLite database handle shared by the SQL tools
pub struct SqlDatabase {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    sample_rows: usize,
}

impl SqlDatabase {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>, sample_rows: usize) -> rusqlite::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        debug!("Opened database {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path),
            sample_rows,
        })
    }

    pub fn open_in_memory(sample_rows: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            path: None,
            sample_rows,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn dialect(&self) -> &'static str {
        "sqlite"
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a batch of statements, e.g. to seed a database
    pub fn execute_batch(&self, sql: &str) -> rusqlite::Result<()> {
        self.lock().execute_batch(sql)
    }

    /// User tables, sorted by name
    pub fn table_names(&self) -> rusqlite::Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// `CREATE TABLE` statements plus a few sample rows for each table
    pub fn table_info(&self, tables: &[String]) -> Result<String, SqlError> {
        let known = self.table_names()?;
        let missing: Vec<String> = tables
            .iter()
            .filter(|t| !known.contains(t))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SqlError::UnknownTables(missing));
        }

        let requested: &[String] = if tables.is_empty() { &known } else { tables };

        let conn = self.lock();
        let mut blocks = Vec::with_capacity(requested.len());
        for table in requested {
            let create: String = conn.query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )?;

            let mut block = create.trim_end().to_string();
            if self.sample_rows > 0 {
                block.push_str(&format!(
                    "\n\n/*\n{}\n*/",
                    sample_rows(&conn, table, self.sample_rows)?
                ));
            }
            blocks.push(block);
        }

        Ok(blocks.join("\n\n"))
    }

    /// Execute one statement and format its rows as a list of tuples
    pub fn run(&self, sql: &str) -> rusqlite::Result<String> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Ok(String::new());
        }

        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let width = stmt.column_count();
        if width == 0 {
            let affected = stmt.execute([])?;
            return Ok(format!("{} rows affected", affected));
        }

        let mut rows = stmt.query([])?;
        let mut formatted = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(repr(row.get_ref(i)?, MAX_STRING_LENGTH));
            }
            formatted.push(tuple(&values));
        }

        if formatted.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("[{}]", formatted.join(", ")))
        }
    }

    /// Like `run`, but errors come back as an `Error: ...` observation
    pub fn run_no_throw(&self, sql: &str) -> String {
        match self.run(sql) {
            Ok(result) => result,
            Err(e) => format!("Error: {}", e),
        }
    }
}

fn sample_rows(conn: &Connection, table: &str, limit: usize) -> rusqlite::Result<String> {
    let query = format!("SELECT * FROM {} LIMIT {}", quote_ident(table), limit);
    let mut stmt = conn.prepare(&query)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut lines = vec![
        format!("{} rows from {} table:", limit, table),
        columns.join("\t"),
    ];

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(plain(row.get_ref(i)?, MAX_SAMPLE_LENGTH));
        }
        lines.push(values.join("\t"));
    }

    Ok(lines.join("\n"))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Shorten to at most `max` chars, breaking at the last space and ending in "..."
fn truncate_words(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    let head = match kept.rsplit_once(' ') {
        Some((head, _)) => head,
        None => kept.as_str(),
    };
    format!("{}...", head)
}

fn cut(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn fmt_real(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// Value as it appears inside a result tuple
fn repr(value: ValueRef<'_>, max: usize) -> String {
    match value {
        ValueRef::Null => "None".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => fmt_real(r),
        ValueRef::Text(bytes) => {
            let text = truncate_words(&String::from_utf8_lossy(bytes), max);
            format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
        }
        ValueRef::Blob(bytes) => format!("<blob {} bytes>", bytes.len()),
    }
}

/// Value as it appears in sample rows
fn plain(value: ValueRef<'_>, max: usize) -> String {
    match value {
        ValueRef::Null => "None".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => fmt_real(r),
        ValueRef::Text(bytes) => cut(&String::from_utf8_lossy(bytes), max),
        ValueRef::Blob(bytes) => format!("<blob {} bytes>", bytes.len()),
    }
}

fn tuple(values: &[String]) -> String {
    match values {
        [single] => format!("({},)", single),
        _ => format!("({})", values.join(", ")),
    }
}

async fn blocking<T, F>(db: &Arc<SqlDatabase>, f: F) -> Result<T, ToolError>
where
    F: FnOnce(&SqlDatabase) -> T + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(db);
    Ok(tokio::task::spawn_blocking(move || f(&db)).await?)
}

/// Execute a query against the database
pub struct QueryTool {
    db: Arc<SqlDatabase>,
}

impl QueryTool {
    pub fn new(db: Arc<SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ToolTrait for QueryTool {
    fn name(&self) -> &str {
        "sql_db_query"
    }
    fn description(&self) -> &str {
        "Input to this tool is a detailed and correct SQL query, output is a result from the database. \
         If the query is not correct, an error message will be returned. \
         If an error is returned, rewrite the query, check the query, and try again. \
         If you encounter an issue with Unknown column 'xxxx' in 'field list', \
         use sql_db_schema to query the correct table fields."
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let sql = strip_code_fence(input, "sql");
        debug!("Running query: {}", sql);
        blocking(&self.db, move |db| db.run_no_throw(&sql)).await
    }
}

/// Describe tables with sample rows
pub struct SchemaTool {
    db: Arc<SqlDatabase>,
}

impl SchemaTool {
    pub fn new(db: Arc<SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ToolTrait for SchemaTool {
    fn name(&self) -> &str {
        "sql_db_schema"
    }
    fn description(&self) -> &str {
        "Input to this tool is a comma-separated list of tables, \
         output is the schema and sample rows for those tables. \
         Be sure that the tables actually exist by calling sql_db_list_tables first! \
         Example Input: table1, table2, table3"
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let tables: Vec<String> = input
            .split(',')
            .map(|t| t.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`'))
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        blocking(&self.db, move |db| match db.table_info(&tables) {
            Ok(info) => info,
            Err(e) => format!("Error: {}", e),
        })
        .await
    }
}

/// List the tables in the database
pub struct ListTablesTool {
    db: Arc<SqlDatabase>,
}

impl ListTablesTool {
    pub fn new(db: Arc<SqlDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ToolTrait for ListTablesTool {
    fn name(&self) -> &str {
        "sql_db_list_tables"
    }
    fn description(&self) -> &str {
        "Input is an empty string, output is a comma-separated list of tables in the database."
    }
    async fn execute(&self, _input: &str) -> Result<String, ToolError> {
        let names = blocking(&self.db, |db| db.table_names()).await??;
        Ok(names.join(", "))
    }
}

const QUERY_CHECKER: &str = "
{query}
Double check the {dialect} query above for common mistakes, including:
- Using NOT IN with NULL values
- Using UNION when UNION ALL should have been used
- Using BETWEEN for exclusive ranges
- Data type mismatch in predicates
- Properly quoting identifiers
- Using the correct number of arguments for functions
- Casting to the correct data type
- Using the proper columns for joins

If there are any of the above mistakes, rewrite the query. If there are no mistakes, just reproduce the original query.

Output the final SQL query only.

SQL Query: ";

/// Ask the model to double check a query before it runs
pub struct QueryCheckerTool {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    dialect: &'static str,
}

impl QueryCheckerTool {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        dialect: &'static str,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            dialect,
        }
    }

    fn prompt(&self, query: &str) -> String {
        QUERY_CHECKER
            .replace("{dialect}", self.dialect)
            .replacen("{query}", query, 1)
    }
}

#[async_trait]
impl ToolTrait for QueryCheckerTool {
    fn name(&self) -> &str {
        "sql_db_query_checker"
    }
    fn description(&self) -> &str {
        "Use this tool to double check if your query is correct before executing it. \
         Always use this tool before executing a query with sql_db_query!"
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let params = ChatParams {
            temperature: self.temperature,
            ..ChatParams::prompt(&self.model, self.prompt(input.trim()))
        };
        let response = self.provider.chat(params).await?;
        Ok(response.text_or_empty().trim().to_string())
    }
}
