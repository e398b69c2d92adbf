use serde::{Deserialize, Serialize};

use super::test::SampleCaseDto;
use crate::domain::models::{ExecutionReport, SampleTestCase, TestCaseResult};
use crate::domain::types::ExecutionStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExecutionRequest {
    pub code: String,
    pub language: String,
    pub test_cases: Vec<SampleCaseDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExecutionResponse {
    #[serde(default, alias = "testResults")]
    pub results: Vec<CaseResultDto>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "passedCount")]
    pub passed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "totalCount")]
    pub total: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResultDto {
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    #[serde(default, alias = "output")]
    pub actual_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "executionTime")]
    pub execution_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "error")]
    pub error_message: Option<String>,
}

impl CodeExecutionRequest {
    pub fn new(code: &str, language: &str, cases: &[SampleTestCase]) -> Self {
        Self {
            code: code.to_string(),
            language: language.to_string(),
            test_cases: cases
                .iter()
                .map(|case| SampleCaseDto {
                    input: case.input.clone(),
                    expected_output: case.expected_output.clone(),
                })
                .collect(),
        }
    }
}

impl CodeExecutionResponse {
    /// Counts are recomputed from the per-case rows when the service omits
    /// them, so the aggregate never disagrees with the table.
    pub fn into_report(self) -> ExecutionReport {
        let results: Vec<TestCaseResult> = self
            .results
            .into_iter()
            .map(|case| TestCaseResult {
                status: case.status,
                input: case.input,
                expected_output: case.expected_output,
                actual_output: case.actual_output,
                execution_time_ms: case.execution_time_ms,
                error_message: case.error_message,
            })
            .collect();

        let counted =
            results.iter().filter(|case| case.status == ExecutionStatus::Passed).count();
        let total = self.total.unwrap_or(results.len()).max(results.len());
        let passed = self.passed.unwrap_or(counted).min(total);

        ExecutionReport { results, passed, total }
    }
}
