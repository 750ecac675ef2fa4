//! Orchestrator for the SQL Server keyword-data and column-name searches.

use crate::error::Result;
use crate::export;
use crate::models::{
    ColumnNameResult, DatabaseRunReport, DatabaseSearchParameters, KeywordDataResult, RunStatus,
};
use crate::mssql::SqlServerSession;
use crate::progress::{ProgressSink, ResultSink};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Coordinates the database search: server session setup, the two optional
/// phases, the result summaries, and the export prompts.
#[derive(Debug, Default)]
pub struct DatabaseSearchOrchestrator;

impl DatabaseSearchOrchestrator {
    /// Creates the orchestrator.
    pub fn new() -> Self {
        Self
    }

    /// Runs one search to a terminal state.
    ///
    /// Per-database and per-table failures are downgraded to warnings so a
    /// broken catalog never stops the sweep of its neighbors. Summaries and
    /// export prompts are only produced for a run that completed.
    pub async fn run(
        &self,
        params: &DatabaseSearchParameters,
        progress: Arc<dyn ProgressSink>,
        sink: Arc<dyn ResultSink>,
        token: CancellationToken,
    ) -> DatabaseRunReport {
        let violations = params.validate();
        if !violations.is_empty() {
            for violation in &violations {
                progress.report(&format!("[!] Invalid parameters - {violation}"));
            }
            return DatabaseRunReport {
                status: RunStatus::Failed,
                keyword_results: Vec::new(),
                column_results: Vec::new(),
            };
        }

        let session = match SqlServerSession::from_address(&params.server, &params.credentials) {
            Ok(session) => session,
            Err(error) => {
                progress.report(&format!("[!] Invalid server address: {error}"));
                return DatabaseRunReport {
                    status: RunStatus::Failed,
                    keyword_results: Vec::new(),
                    column_results: Vec::new(),
                };
            }
        };

        let mut keyword_results = Vec::new();
        let mut column_results = Vec::new();
        let status = match self
            .run_inner(
                params,
                &session,
                &progress,
                &token,
                &mut keyword_results,
                &mut column_results,
            )
            .await
        {
            Ok(status) => status,
            Err(error) => {
                progress.report(&format!(
                    "[!] An unexpected application error occurred: {error}"
                ));
                RunStatus::Failed
            }
        };
        debug!(
            ?status,
            keyword_results = keyword_results.len(),
            column_results = column_results.len(),
            "database search finished"
        );

        match status {
            RunStatus::Cancelled => {
                progress.report("[!] Search was cancelled by the user.");
            }
            RunStatus::Completed => {
                if params.search_data {
                    summarize_keyword_results(&keyword_results, progress.as_ref());
                    if !keyword_results.is_empty() {
                        progress.report("[*] Prompting to save keyword data results...");
                        export::save_report(
                            &export::render_keyword_results(&keyword_results),
                            &export::default_file_name(
                                "KeywordDataSearchResults",
                                Some(session.host()),
                            ),
                            sink.as_ref(),
                            progress.as_ref(),
                        );
                    }
                }
                if params.search_columns {
                    summarize_column_results(&column_results, progress.as_ref());
                    if !column_results.is_empty() {
                        progress.report("[*] Prompting to save column name results...");
                        export::save_report(
                            &export::render_column_results(&column_results),
                            &export::default_file_name(
                                "ColumnNameSearchResults",
                                Some(session.host()),
                            ),
                            sink.as_ref(),
                            progress.as_ref(),
                        );
                    }
                }
            }
            RunStatus::Failed => {}
        }

        DatabaseRunReport {
            status,
            keyword_results,
            column_results,
        }
    }

    async fn run_inner(
        &self,
        params: &DatabaseSearchParameters,
        session: &SqlServerSession,
        progress: &Arc<dyn ProgressSink>,
        token: &CancellationToken,
        keyword_results: &mut Vec<KeywordDataResult>,
        column_results: &mut Vec<ColumnNameResult>,
    ) -> Result<RunStatus> {
        if token.is_cancelled() {
            return Ok(RunStatus::Cancelled);
        }

        if params.search_data {
            let status = self
                .search_data(params, session, progress, token, keyword_results)
                .await?;
            if status == RunStatus::Cancelled {
                return Ok(status);
            }
        }

        if token.is_cancelled() {
            return Ok(RunStatus::Cancelled);
        }

        if params.search_columns {
            let status = self
                .search_columns(params, session, progress, token, column_results)
                .await?;
            if status == RunStatus::Cancelled {
                return Ok(status);
            }
        }

        Ok(RunStatus::Completed)
    }

    /// Keyword-data phase: one query per table per keyword, per database.
    async fn search_data(
        &self,
        params: &DatabaseSearchParameters,
        session: &SqlServerSession,
        progress: &Arc<dyn ProgressSink>,
        token: &CancellationToken,
        out: &mut Vec<KeywordDataResult>,
    ) -> Result<RunStatus> {
        progress.report("--- Starting keyword data search ---");
        let keywords_lower: Vec<String> = params
            .data_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();

        let databases = session.list_databases(progress.as_ref()).await?;
        for database in &databases {
            if token.is_cancelled() {
                return Ok(RunStatus::Cancelled);
            }
            progress.report(&format!("-- Searching database for data: {database} --"));
            match self
                .search_one_database_data(params, session, database, &keywords_lower, progress, token, out)
                .await
            {
                Ok(RunStatus::Cancelled) => return Ok(RunStatus::Cancelled),
                Ok(_) => {}
                Err(error) => {
                    progress.report(&format!(
                        "[!] Error processing database {database} for data search: {error}"
                    ));
                }
            }
        }
        Ok(RunStatus::Completed)
    }

    #[allow(clippy::too_many_arguments)]
    async fn search_one_database_data(
        &self,
        params: &DatabaseSearchParameters,
        session: &SqlServerSession,
        database: &str,
        keywords_lower: &[String],
        progress: &Arc<dyn ProgressSink>,
        token: &CancellationToken,
        out: &mut Vec<KeywordDataResult>,
    ) -> Result<RunStatus> {
        let tables = session.list_tables_and_columns(database, true).await?;

        'tables: for table in &tables {
            if token.is_cancelled() {
                return Ok(RunStatus::Cancelled);
            }
            if table.columns.is_empty() {
                continue;
            }
            progress.report(&format!(
                "  -> Searching table: {}.{}",
                table.schema, table.table
            ));
            // A timed-out query leaves unread response packets on the TDS
            // stream, so no client is reused past a failed table.
            let mut client = session.open_database(database).await?;
            for keyword_lower in keywords_lower {
                if token.is_cancelled() {
                    return Ok(RunStatus::Cancelled);
                }
                if let Err(error) = session
                    .search_table_for_keyword(
                        &mut client,
                        table,
                        keyword_lower,
                        params.match_mode,
                        out,
                    )
                    .await
                {
                    progress.report(&format!(
                        "[!] Error searching table {}.{}: {error}",
                        table.schema, table.table
                    ));
                    continue 'tables;
                }
            }
        }
        Ok(RunStatus::Completed)
    }

    /// Column-name phase: catalog discovery plus in-memory exact matching.
    async fn search_columns(
        &self,
        params: &DatabaseSearchParameters,
        session: &SqlServerSession,
        progress: &Arc<dyn ProgressSink>,
        token: &CancellationToken,
        out: &mut Vec<ColumnNameResult>,
    ) -> Result<RunStatus> {
        progress.report("--- Starting column name search ---");
        let targets_lower: Vec<String> = params
            .column_names
            .iter()
            .map(|c| c.to_lowercase())
            .collect();

        let databases = session.list_databases(progress.as_ref()).await?;
        for database in &databases {
            if token.is_cancelled() {
                return Ok(RunStatus::Cancelled);
            }
            progress.report(&format!("-- Searching database for columns: {database} --"));
            match session.list_tables_and_columns(database, false).await {
                Ok(tables) => {
                    crate::mssql::match_column_names(&tables, &targets_lower, out);
                }
                Err(error) => {
                    progress.report(&format!(
                        "[!] Error processing database {database} for column search: {error}"
                    ));
                }
            }
        }
        Ok(RunStatus::Completed)
    }
}

fn summarize_keyword_results(results: &[KeywordDataResult], progress: &dyn ProgressSink) {
    progress.report(&format!(
        "--- Results: {} items found in keyword data search. ---",
        results.len()
    ));
    for result in results {
        progress.report(&format!(
            "    FOUND keyword '{}' in DB: {}, table: {}.{}",
            result.keyword, result.database, result.schema, result.table
        ));
    }
}

fn summarize_column_results(results: &[ColumnNameResult], progress: &dyn ProgressSink) {
    progress.report(&format!(
        "--- Results: {} items found in column name search. ---",
        results.len()
    ));
    for result in results {
        progress.report(&format!(
            "    FOUND column '{}' in DB: {}, table: {}.{}",
            result.found, result.database, result.schema, result.table
        ));
    }
}
