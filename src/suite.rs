//! JSON-Schema-Test-Suite runner
//!
//! Case files live at `<root>/tests/<draft>/*.json`; each holds an array of
//! groups, and every group pairs one schema with the instances it must accept
//! or reject. Schemas are compiled with `jsonschema`, fetching remote
//! references through the [`CompositeResolver`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonschema::{Draft, JSONSchema};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::fixture::DecodedFixture;
use crate::loader::ValidatorResolver;
use crate::reference::DEFAULT_MAX_DEPTH;
use crate::resolver::CompositeResolver;

/// Draft versions the suite ships case directories for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteDraft {
    Draft3,
    Draft4,
    Draft6,
    Draft7,
}

impl SuiteDraft {
    /// Directory under `tests/`
    pub fn dir_name(&self) -> &'static str {
        match self {
            SuiteDraft::Draft3 => "draft3",
            SuiteDraft::Draft4 => "draft4",
            SuiteDraft::Draft6 => "draft6",
            SuiteDraft::Draft7 => "draft7",
        }
    }

    pub fn meta_schema_uri(&self) -> &'static str {
        match self {
            SuiteDraft::Draft3 => "http://json-schema.org/draft-03/schema",
            SuiteDraft::Draft4 => "http://json-schema.org/draft-04/schema",
            SuiteDraft::Draft6 => "http://json-schema.org/draft-06/schema",
            SuiteDraft::Draft7 => "http://json-schema.org/draft-07/schema",
        }
    }

    /// Draft understood by the validator; draft-03 has no keyword support
    pub fn validator_draft(&self) -> Option<Draft> {
        match self {
            SuiteDraft::Draft3 => None,
            SuiteDraft::Draft4 => Some(Draft::Draft4),
            SuiteDraft::Draft6 => Some(Draft::Draft6),
            SuiteDraft::Draft7 => Some(Draft::Draft7),
        }
    }
}

impl fmt::Display for SuiteDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for SuiteDraft {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft3" | "draft-03" | "3" => Ok(SuiteDraft::Draft3),
            "draft4" | "draft-04" | "4" => Ok(SuiteDraft::Draft4),
            "draft6" | "draft-06" | "6" => Ok(SuiteDraft::Draft6),
            "draft7" | "draft-07" | "7" => Ok(SuiteDraft::Draft7),
            other => Err(format!("unknown draft '{}'", other)),
        }
    }
}

/// One schema and the instances it is checked against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestGroup {
    pub description: String,
    pub schema: Value,
    pub tests: Vec<TestCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub description: String,
    pub data: Value,
    pub valid: bool,
}

/// Result of a single case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub file: String,
    pub group: String,
    pub case: String,
    pub expected: bool,
    /// Validator verdict; `None` when the schema could not be compiled
    pub actual: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.actual == Some(self.expected)
    }
}

/// Outcomes of a suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub draft: SuiteDraft,
    pub generated_at: DateTime<Utc>,
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    /// Cases that ran but disagreed with the expected verdict
    pub fn failures(&self) -> Vec<&CaseOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.actual.is_some() && !o.passed())
            .collect()
    }

    /// Cases whose schema failed to compile
    pub fn errors(&self) -> Vec<&CaseOutcome> {
        self.outcomes.iter().filter(|o| o.actual.is_none()).collect()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(CaseOutcome::passed)
    }
}

/// Case files for `draft`, sorted. `optional/` is only included on request.
pub fn discover_case_files(suite_root: &Path, draft: SuiteDraft, include_optional: bool) -> Result<Vec<PathBuf>> {
    let draft_dir = suite_root.join("tests").join(draft.dir_name());
    if !draft_dir.is_dir() {
        return Err(HarnessError::ResourceNotFound { path: draft_dir });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(&draft_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .filter(|p| {
            include_optional
                || !p
                    .strip_prefix(&draft_dir)
                    .map(|rel| rel.starts_with("optional"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Parse a case file
pub fn load_case_file(path: &Path) -> Result<Vec<TestGroup>> {
    let content = fs::read_to_string(path).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Compiles group schemas and checks every case
pub struct SuiteRunner {
    resolver: Arc<CompositeResolver>,
    draft: SuiteDraft,
    max_depth: usize,
    include_optional: bool,
    filter: Option<Regex>,
}

impl SuiteRunner {
    pub fn new(resolver: Arc<CompositeResolver>, draft: SuiteDraft) -> Self {
        Self {
            resolver,
            draft,
            max_depth: DEFAULT_MAX_DEPTH,
            include_optional: false,
            filter: None,
        }
    }

    /// Build a runner from configuration, resolver included
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let resolver = CompositeResolver::from_config(config)?;
        let mut runner = Self::new(Arc::new(resolver), config.suite.draft)
            .with_max_depth(config.resolver.max_depth)
            .with_optional(config.suite.include_optional);
        if let Some(pattern) = &config.suite.filter {
            runner = runner.with_filter(Regex::new(pattern)?);
        }
        Ok(runner)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_optional(mut self, include_optional: bool) -> Self {
        self.include_optional = include_optional;
        self
    }

    /// Only run groups whose description matches `filter`
    pub fn with_filter(mut self, filter: Regex) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn draft(&self) -> SuiteDraft {
        self.draft
    }

    fn compile(&self, schema: &Value) -> Result<JSONSchema> {
        let draft = self.draft.validator_draft().ok_or_else(|| {
            HarnessError::Compile(format!("{} is not supported by the validator", self.draft))
        })?;
        let resolver = ValidatorResolver::new(Arc::clone(&self.resolver), self.max_depth);
        JSONSchema::options()
            .with_draft(draft)
            .with_resolver(resolver)
            .compile(schema)
            .map_err(|e| HarnessError::Compile(e.to_string()))
    }

    /// Run every case of one group
    pub fn run_group(&self, file: &str, group: &TestGroup) -> Vec<CaseOutcome> {
        if let Some(filter) = &self.filter {
            if !filter.is_match(&group.description) {
                return Vec::new();
            }
        }

        let compiled = self.compile(&group.schema);
        if let Err(e) = &compiled {
            warn!(file, group = %group.description, error = %e, "schema did not compile");
        }

        group
            .tests
            .iter()
            .map(|case| {
                let (actual, error) = match &compiled {
                    Ok(schema) => (Some(schema.is_valid(&case.data)), None),
                    Err(e) => (None, Some(e.to_string())),
                };
                CaseOutcome {
                    file: file.to_string(),
                    group: group.description.clone(),
                    case: case.description.clone(),
                    expected: case.valid,
                    actual,
                    error,
                }
            })
            .collect()
    }

    /// Run every group in one case file
    pub fn run_file(&self, path: &Path) -> Result<Vec<CaseOutcome>> {
        let groups = load_case_file(path)?;
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let outcomes: Vec<_> = groups
            .iter()
            .flat_map(|group| self.run_group(&file, group))
            .collect();
        debug!(file = %file, cases = outcomes.len(), "ran case file");
        Ok(outcomes)
    }

    /// Run the whole draft directory under `suite_root`
    pub fn run(&self, suite_root: &Path) -> Result<SuiteReport> {
        let files = discover_case_files(suite_root, self.draft, self.include_optional)?;
        let mut outcomes = Vec::new();
        for path in &files {
            outcomes.extend(self.run_file(path)?);
        }

        let report = SuiteReport {
            draft: self.draft,
            generated_at: Utc::now(),
            outcomes,
        };
        info!(
            draft = %self.draft,
            files = files.len(),
            total = report.total(),
            passed = report.passed(),
            "suite run complete"
        );
        Ok(report)
    }

    /// Validate a decoded fixture document against its schema
    pub fn check_fixture(&self, fixture: &DecodedFixture) -> Result<bool> {
        Ok(self.compile(&fixture.schema)?.is_valid(&fixture.document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UriRegistry;
    use crate::remote::FsRemoteResolver;
    use crate::resolver::ResolverRoute;
    use serde_json::json;
    use tempfile::tempdir;

    fn runner(root: &Path, draft: SuiteDraft) -> SuiteRunner {
        let resolver = CompositeResolver::new(
            Arc::new(UriRegistry::with_meta_schemas().unwrap()),
            FsRemoteResolver::new(root).unwrap(),
            ResolverRoute::default(),
        );
        SuiteRunner::new(Arc::new(resolver), draft)
    }

    fn group(description: &str, schema: Value, cases: &[(Value, bool)]) -> TestGroup {
        TestGroup {
            description: description.to_string(),
            schema,
            tests: cases
                .iter()
                .enumerate()
                .map(|(i, (data, valid))| TestCase {
                    description: format!("case {}", i),
                    data: data.clone(),
                    valid: *valid,
                })
                .collect(),
        }
    }

    #[test]
    fn test_draft_parsing() {
        assert_eq!("draft7".parse::<SuiteDraft>().unwrap(), SuiteDraft::Draft7);
        assert_eq!("Draft-04".parse::<SuiteDraft>().unwrap(), SuiteDraft::Draft4);
        assert_eq!("6".parse::<SuiteDraft>().unwrap(), SuiteDraft::Draft6);
        assert!("draft5".parse::<SuiteDraft>().is_err());
        assert!(SuiteDraft::Draft3.validator_draft().is_none());
    }

    #[test]
    fn test_every_draft_has_a_registered_meta_schema() {
        let registry = UriRegistry::with_meta_schemas().unwrap();
        for draft in [SuiteDraft::Draft3, SuiteDraft::Draft4, SuiteDraft::Draft6, SuiteDraft::Draft7] {
            assert!(registry.contains(draft.meta_schema_uri()), "{}", draft);
        }
    }

    #[test]
    fn test_remote_ref_group() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("remotes")).unwrap();
        fs::write(dir.path().join("remotes/integer.json"), br#"{"type": "integer"}"#).unwrap();

        let runner = runner(dir.path(), SuiteDraft::Draft7);
        let outcomes = runner.run_group(
            "refRemote.json",
            &group(
                "remote ref",
                json!({"$ref": "http://localhost:1234/integer.json"}),
                &[(json!(1), true), (json!("a"), false)],
            ),
        );
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(CaseOutcome::passed), "{:?}", outcomes);
    }

    #[test]
    fn test_draft3_cases_are_errors() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path(), SuiteDraft::Draft3);
        let outcomes = runner.run_group("type.json", &group("integer", json!({"type": "integer"}), &[(json!(1), true)]));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].actual, None);
        assert!(outcomes[0].error.is_some());
        assert!(!outcomes[0].passed());
    }

    #[test]
    fn test_filter_skips_groups() {
        let dir = tempdir().unwrap();
        let runner = runner(dir.path(), SuiteDraft::Draft7).with_filter(Regex::new("^string").unwrap());
        let skipped = runner.run_group("type.json", &group("integer type", json!({"type": "integer"}), &[(json!(1), true)]));
        assert!(skipped.is_empty());
        let kept = runner.run_group("type.json", &group("string type", json!({"type": "string"}), &[(json!("x"), true)]));
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_discover_skips_optional() {
        let dir = tempdir().unwrap();
        let draft_dir = dir.path().join("tests/draft7");
        fs::create_dir_all(draft_dir.join("optional")).unwrap();
        fs::write(draft_dir.join("type.json"), "[]").unwrap();
        fs::write(draft_dir.join("enum.json"), "[]").unwrap();
        fs::write(draft_dir.join("README.md"), "").unwrap();
        fs::write(draft_dir.join("optional/format.json"), "[]").unwrap();

        let files = discover_case_files(dir.path(), SuiteDraft::Draft7, false).unwrap();
        assert_eq!(files, vec![draft_dir.join("enum.json"), draft_dir.join("type.json")]);

        let files = discover_case_files(dir.path(), SuiteDraft::Draft7, true).unwrap();
        assert_eq!(files.len(), 3);

        assert!(matches!(
            discover_case_files(dir.path(), SuiteDraft::Draft4, false),
            Err(HarnessError::ResourceNotFound { .. })
        ));
    }

    #[test]
    fn test_report_counts() {
        let outcome = |actual: Option<bool>| CaseOutcome {
            file: "f.json".into(),
            group: "g".into(),
            case: "c".into(),
            expected: true,
            actual,
            error: None,
        };
        let report = SuiteReport {
            draft: SuiteDraft::Draft7,
            generated_at: Utc::now(),
            outcomes: vec![outcome(Some(true)), outcome(Some(false)), outcome(None)],
        };
        assert_eq!(report.total(), 3);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.errors().len(), 1);
        assert!(!report.all_passed());
    }
}
