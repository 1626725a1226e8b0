//! Export workflow: start the task, poll, download the artifacts
//!
//! Top-level orchestration, invoked once per process. Validation happens
//! before any network call; the terminal status dispatch produces a tagged
//! [`ExportOutcome`] that the binary renders for the user.

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::poller::TaskPoller;
use crate::transport::Transport;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Method;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::OnceLock;

/// API prefix shared by all insights endpoints
const BASE_PATH: &str = "/api/v1";

/// Upper bound on rows per generated export file, passed as `maxFileLength`
const MAX_FILE_LENGTH: u32 = 100_000;

/// Server-side status of an export task
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Accepted, not yet running
    Submitted,
    /// Running
    InProgress,
    /// Finished with output files
    ExportSucceeded,
    /// Finished with an error
    ExportFailed,
    /// Finished, nothing matched the requested window
    NoData,
    /// A status string this client does not recognize
    Other(String),
}

impl TaskStatus {
    /// True while the task may still change state on its own
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Submitted | TaskStatus::InProgress)
    }

    /// The wire form of the status
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::ExportSucceeded => "EXPORT_SUCCEEDED",
            TaskStatus::ExportFailed => "EXPORT_FAILED",
            TaskStatus::NoData => "NO_DATA",
            TaskStatus::Other(s) => s,
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        match s {
            "SUBMITTED" => TaskStatus::Submitted,
            "IN_PROGRESS" => TaskStatus::InProgress,
            "EXPORT_SUCCEEDED" => TaskStatus::ExportSucceeded,
            "EXPORT_FAILED" => TaskStatus::ExportFailed,
            "NO_DATA" => TaskStatus::NoData,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(TaskStatus::from(s.as_str()))
    }
}

/// An export task as reported by the server
///
/// Created server-side on the start request; this client only ever reads it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTask {
    /// Server-assigned opaque identifier
    pub id: String,
    /// Current status
    pub status: TaskStatus,
    /// Output file names, populated on EXPORT_SUCCEEDED
    #[serde(default)]
    pub file_names: Vec<String>,
    /// Error detail, populated on EXPORT_FAILED
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Validated-on-entry parameters of one export invocation
#[derive(Clone, Debug)]
pub struct ExportParams {
    /// Bot/skill identifier whose insights are exported
    pub bot_id: String,
    /// Export task name; generated from a timestamp when absent
    pub task_name: Option<String>,
    /// Inclusive start of the export window, `YYYY-MM-DD`
    pub begin_date: Option<String>,
    /// Inclusive end of the export window, `YYYY-MM-DD`
    pub end_date: Option<String>,
    /// Existing directory the output files are written to
    pub output_dir: PathBuf,
}

impl ExportParams {
    /// Validate everything local before the first network call
    pub fn validate(&self) -> Result<()> {
        if !self.output_dir.is_dir() {
            return Err(Error::Validation(format!(
                "output path {} does not exist or is not a directory",
                self.output_dir.display()
            )));
        }
        if let Some(date) = &self.begin_date {
            validate_date(date)?;
        }
        if let Some(date) = &self.end_date {
            validate_date(date)?;
        }
        Ok(())
    }

    fn date_filtered(&self) -> bool {
        self.begin_date.is_some() || self.end_date.is_some()
    }
}

/// Check that `input` is `YYYY-MM-DD` and a real calendar date
pub fn validate_date(input: &str) -> Result<NaiveDate> {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    let shape = SHAPE.get_or_init(date_shape);

    if !shape.is_match(input) {
        return Err(Error::Validation(format!(
            "date '{input}' must use the YYYY-MM-DD format"
        )));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("date '{input}' is not a valid calendar date")))
}

/// Terminal result of the workflow, rendered by the binary
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// All output files were downloaded
    Completed {
        /// Directory the files were written to
        output_dir: PathBuf,
        /// Downloaded file names, in download order
        files: Vec<String>,
    },
    /// The server reported the export failed
    Failed {
        /// The task's embedded error detail
        detail: String,
    },
    /// No data existed for the requested window
    NoData {
        /// Whether a begin/end date filter was supplied
        date_filtered: bool,
    },
    /// The task ended polling in a state this client cannot act on
    StillRunning {
        /// Task id for later manual retrieval
        task_id: String,
        /// The status observed when polling stopped
        status: TaskStatus,
    },
}

impl ExportOutcome {
    /// Human-readable summary of the outcome, as printed by the binary
    ///
    /// Every outcome here is a normal completion; fatal paths travel as
    /// errors instead.
    pub fn summary(&self) -> String {
        match self {
            ExportOutcome::Completed { output_dir, files } => format!(
                "Export complete: {} file(s) written to {}",
                files.len(),
                output_dir.display()
            ),
            ExportOutcome::Failed { detail } => {
                format!("The export task failed: {detail}")
            }
            ExportOutcome::NoData { date_filtered } => {
                let mut message = "No insights data existed for the requested window.".to_string();
                if *date_filtered {
                    message.push_str("\nTry a different date range.");
                }
                message
            }
            ExportOutcome::StillRunning { task_id, status } => format!(
                "The export task {task_id} ended polling in status {status}; \
                 check back later and retrieve the results using this task id."
            ),
        }
    }
}

/// Drives one export workflow end to end
pub struct Exporter {
    transport: Transport,
    retry: RetryConfig,
}

impl Exporter {
    /// Create an exporter over a signed transport
    pub fn new(transport: Transport, retry: RetryConfig) -> Self {
        Self { transport, retry }
    }

    /// Run the workflow: validate, start, poll, dispatch on terminal status
    pub async fn run(&self, params: &ExportParams) -> Result<ExportOutcome> {
        params.validate()?;

        let task = self.start_task(params).await?;
        tracing::info!(task_id = %task.id, "export task started");

        let poller = TaskPoller::new(&self.transport, self.retry.clone());
        let task = poller.wait_for_completion(&task.id).await?;

        match task.status {
            TaskStatus::ExportSucceeded => {
                let files = self.download_all(&task, params).await?;
                Ok(ExportOutcome::Completed {
                    output_dir: params.output_dir.clone(),
                    files,
                })
            }
            TaskStatus::ExportFailed => Ok(ExportOutcome::Failed {
                detail: task
                    .error_message
                    .unwrap_or_else(|| "the server reported no error detail".to_string()),
            }),
            TaskStatus::NoData => Ok(ExportOutcome::NoData {
                date_filtered: params.date_filtered(),
            }),
            status => Ok(ExportOutcome::StillRunning {
                task_id: task.id,
                status,
            }),
        }
    }

    async fn start_task(&self, params: &ExportParams) -> Result<ExportTask> {
        let name = params
            .task_name
            .clone()
            .unwrap_or_else(default_task_name);
        let body = serde_json::json!({
            "name": name,
            "taskType": "EXPORT",
            "insightsDataExport": true,
        });

        let path = exports_path(&params.bot_id, params.begin_date.as_deref(), params.end_date.as_deref());
        self.transport
            .send(Method::POST, &path, Some(serde_json::to_vec(&body)?))
            .await?
            .into_typed()
    }

    /// Download every listed output file, sequentially and fail-fast
    ///
    /// One file at a time; the first failure aborts the rest.
    async fn download_all(&self, task: &ExportTask, params: &ExportParams) -> Result<Vec<String>> {
        let mut downloaded = Vec::with_capacity(task.file_names.len());
        for file in &task.file_names {
            // Server-supplied names land inside the output directory only
            if file.contains('/') || file.contains('\\') || file.contains("..") {
                return Err(Error::Validation(format!(
                    "refusing to write output file with suspicious name '{file}'"
                )));
            }

            let dest = params.output_dir.join(file);
            self.transport
                .send_to_file(&file_path(&task.id, file), &dest)
                .await
                .map_err(|e| Error::Download {
                    file: file.clone(),
                    dest: dest.clone(),
                    source: Box::new(e),
                })?;
            tracing::info!(file = %file, dest = %dest.display(), "output file downloaded");
            downloaded.push(file.clone());
        }
        Ok(downloaded)
    }
}

#[allow(clippy::expect_used)]
fn date_shape() -> Regex {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid")
}

fn default_task_name() -> String {
    format!(
        "insights-export-{}",
        chrono::Utc::now().format("%Y%m%d%H%M%S")
    )
}

fn exports_path(bot_id: &str, since: Option<&str>, until: Option<&str>) -> String {
    let mut path = format!(
        "{BASE_PATH}/bots/insights/dataExports?botId={}&maxFileLength={MAX_FILE_LENGTH}",
        urlencoding::encode(bot_id)
    );
    if let Some(since) = since {
        path.push_str(&format!("&since={since}"));
    }
    if let Some(until) = until {
        path.push_str(&format!("&until={until}"));
    }
    path
}

/// Status endpoint for a task
pub(crate) fn status_path(task_id: &str) -> String {
    format!(
        "{BASE_PATH}/bots/insights/dataExports/{}",
        urlencoding::encode(task_id)
    )
}

fn file_path(task_id: &str, filename: &str) -> String {
    format!(
        "{BASE_PATH}/bots/insights/dataExports/{}/files/{}",
        urlencoding::encode(task_id),
        urlencoding::encode(filename)
    )
}
