//! JSON exporter for run traces.
//!
//! Writes the run report and the stage timeline of one scenario so a
//! run can be inspected or diffed after the fact.

use crate::controller::RunReport;
use crate::runner::ScenarioResult;
use crate::timeline::TimelineEvent;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Whether the harness reported what the scenario expects
    pub as_expected: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Controller report
    pub report: RunReport,

    /// Stage events in record order
    pub timeline: Vec<TimelineEvent>,

    /// Stage events recorded past the timeline limit and not exported
    #[serde(default)]
    pub timeline_dropped: u64,
}

impl RunExport {
    /// Builds an export from a scenario result.
    pub fn from_result(result: &ScenarioResult) -> Self {
        Self {
            scenario: result.scenario.name().to_string(),
            seed: result.seed,
            as_expected: result.as_expected,
            failure_reason: result.failure_reason.clone(),
            report: result.report.clone(),
            timeline: result.timeline.clone(),
            timeline_dropped: result.timeline_dropped,
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::runner::ScenarioRunner;
    use crate::scenarios::ScenarioId;
    use crate::timeline::Stage;

    #[tokio::test]
    async fn test_export_writes_timeline() {
        let result = ScenarioRunner::new(HarnessConfig::default())
            .run(ScenarioId::Smoke)
            .await
            .unwrap();
        let export = RunExport::from_result(&result);

        let name = format!("tbench-export-{}.json", uuid::Uuid::new_v4());
        let path = std::env::temp_dir().join(name);
        let path = path.to_str().unwrap().to_string();
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let parsed: RunExport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.scenario, "smoke");
        assert_eq!(parsed.timeline.len(), 4);
        assert_eq!(parsed.timeline_dropped, 0);
        assert_eq!(parsed.timeline[0].stage, Stage::Generate);
        assert!(parsed.failure_reason.is_none());
        assert!(text.contains("\"verdict\""));
    }
}
