//! Validation report and its renderers
//!
//! The reconciler produces one [`ValidationReport`]; this module turns it
//! into terminal text, machine-readable JSON, or a CI-pasteable Markdown
//! table. Entries stay sorted by route key in every format so reports diff
//! cleanly across runs.
//!
//! Matched and informational entries never appear in the JSON error/warning
//! buckets; they still count toward `total_routes`.

use serde::Serialize;
use serde_json::json;

use crate::error::{DriftError, Result};
use crate::reconcile::{Classification, ReconciliationEntry, Severity};
use crate::routes::ScanWarning;

/// Outcome of one full reconciliation run
#[derive(Debug)]
pub struct ValidationReport {
    /// One entry per route key, sorted by key
    pub entries: Vec<ReconciliationEntry>,
    /// Extraction-layer warnings (unparseable files, empty annotation
    /// lists), folded into the warnings bucket
    pub scan_warnings: Vec<ScanWarning>,
}

/// One error/warning line as it appears in serialized output
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub severity: Severity,
    pub issue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationReport {
    pub fn new(mut entries: Vec<ReconciliationEntry>) -> Self {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            entries,
            scan_warnings: Vec::new(),
        }
    }

    pub fn push_scan_warning(&mut self, warning: ScanWarning) {
        self.scan_warnings.push(warning);
    }

    /// Passed iff no entry is error-level; warnings do not fail a run
    pub fn passed(&self) -> bool {
        self.error_count() == 0
    }

    pub fn status(&self) -> &'static str {
        if self.passed() {
            "passed"
        } else {
            "failed"
        }
    }

    pub fn total_routes(&self) -> usize {
        self.entries.len()
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .count()
            + self.scan_warnings.len()
    }

    fn findings(&self, severity: Severity) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self
            .entries
            .iter()
            .filter(|e| e.severity == severity)
            .map(entry_finding)
            .collect();
        if severity == Severity::Warning {
            findings.extend(self.scan_warnings.iter().map(|w| Finding {
                file: w.file.display().to_string(),
                line: w.line,
                severity: Severity::Warning,
                issue: w.message.clone(),
                suggestion: None,
            }));
        }
        findings
    }

    pub fn render_text(&self, verbose: bool) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "API contract validation: {}\n",
            self.status().to_uppercase()
        ));
        out.push_str(&format!(
            "  {} routes checked, {} errors, {} warnings\n",
            self.total_routes(),
            self.error_count(),
            self.warning_count()
        ));

        for entry in &self.entries {
            if entry.severity == Severity::Info && !verbose {
                continue;
            }
            let location = entry_location(entry)
                .map(|(file, line)| match line {
                    Some(l) => format!("{file}:{l}"),
                    None => file,
                })
                .unwrap_or_default();
            out.push_str(&format!(
                "\n  [{}] {} ({})\n      {}\n",
                entry.severity.as_str().to_uppercase(),
                entry.key,
                entry.classification.as_str(),
                entry.issue,
            ));
            if !location.is_empty() {
                out.push_str(&format!("      at {location}\n"));
            }
            if let Some(s) = &entry.suggestion {
                out.push_str(&format!(
                    "      did you mean '{}'? (similarity {:.2})\n",
                    s.key, s.similarity
                ));
            }
        }

        if !self.scan_warnings.is_empty() {
            out.push_str("\n  Scan warnings:\n");
            for w in &self.scan_warnings {
                let line = w.line.map(|l| format!(":{l}")).unwrap_or_default();
                out.push_str(&format!("    {}{}: {}\n", w.file.display(), line, w.message));
            }
        }

        out
    }

    pub fn render_json(&self) -> Result<String> {
        let value = json!({
            "status": self.status(),
            "errors": self.findings(Severity::Error),
            "warnings": self.findings(Severity::Warning),
            "summary": {
                "total_routes": self.total_routes(),
                "error_count": self.error_count(),
                "warning_count": self.warning_count(),
            },
        });
        serde_json::to_string_pretty(&value).map_err(|e| DriftError::ReportFailure {
            message: e.to_string(),
        })
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("## API contract validation: {}\n\n", self.status()));
        out.push_str(&format!(
            "{} routes checked, {} errors, {} warnings\n\n",
            self.total_routes(),
            self.error_count(),
            self.warning_count()
        ));

        let flagged: Vec<&ReconciliationEntry> = self
            .entries
            .iter()
            .filter(|e| e.severity != Severity::Info)
            .collect();
        if flagged.is_empty() && self.scan_warnings.is_empty() {
            out.push_str("No drift detected.\n");
            return out;
        }

        out.push_str("| Severity | Route | Classification | Location | Issue |\n");
        out.push_str("|----------|-------|----------------|----------|-------|\n");
        for entry in flagged {
            let location = entry_location(entry)
                .map(|(file, line)| match line {
                    Some(l) => format!("{file}:{l}"),
                    None => file,
                })
                .unwrap_or_default();
            let mut issue = entry.issue.clone();
            if let Some(s) = &entry.suggestion {
                issue.push_str(&format!(" (did you mean `{}`?)", s.key));
            }
            out.push_str(&format!(
                "| {} | `{}` | {} | {} | {} |\n",
                entry.severity.as_str(),
                entry.key,
                entry.classification.as_str(),
                location,
                issue.replace('|', "\\|"),
            ));
        }
        for w in &self.scan_warnings {
            let line = w.line.map(|l| format!(":{l}")).unwrap_or_default();
            out.push_str(&format!(
                "| warning | | scan | {}{} | {} |\n",
                w.file.display(),
                line,
                w.message.replace('|', "\\|"),
            ));
        }
        out
    }
}

fn entry_finding(entry: &ReconciliationEntry) -> Finding {
    let (file, line) = entry_location(entry).unwrap_or_default();
    Finding {
        file,
        line,
        severity: entry.severity,
        issue: format!("{}: {}", entry.classification.as_str(), entry.issue),
        suggestion: entry
            .suggestion
            .as_ref()
            .map(|s| format!("did you mean '{}'?", s.key)),
    }
}

/// File and line a finding points at. Live-mode gateway records carry a
/// synthetic origin with line 0, which renders without a line number.
fn entry_location(entry: &ReconciliationEntry) -> Option<(String, Option<usize>)> {
    if let Some(rec) = entry.primary_record() {
        let line = (rec.line > 0).then_some(rec.line);
        return Some((rec.file.display().to_string(), line));
    }
    if entry.classification == Classification::StaleAnnotation {
        if let Some(c) = entry.components.first() {
            return Some((c.file.display().to_string(), Some(c.line)));
        }
    }
    None
}
