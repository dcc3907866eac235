//! Common types for the GridLab engine abstraction.

use gridlab_core::PageIndex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a simulation held by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationId(pub Uuid);

impl SimulationId {
    /// Creates a new random SimulationId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a SimulationId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SimulationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SimulationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SimulationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Address of one compressed page: the wire-level request key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageKey {
    pub simulation: SimulationId,
    pub page: PageIndex,
}

impl PageKey {
    pub fn new(simulation: SimulationId, page: PageIndex) -> Self {
        Self { simulation, page }
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars of the id for readability
        write!(f, "{}#{}", &self.simulation.to_string()[..8], self.page)
    }
}

/// Progress reported by a running simulation.
///
/// The engine streams server-sent events: `data: {"progress": 0.42}` while
/// iterating, plain status text while post-processing, and finally
/// `data: Simulation completed!`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunEvent {
    /// Fraction of iterations done, within `0.0..=1.0`
    Progress(f64),

    /// Free-text status line
    Status(String),

    /// Run finished; history and results are available
    Completed,
}

#[derive(Deserialize)]
struct ProgressPayload {
    progress: f64,
}

const COMPLETED_LINE: &str = "Simulation completed!";

impl RunEvent {
    /// Parses one server-sent event data line (`data: ...`).
    ///
    /// Returns `None` for comments, other fields and empty data.
    pub fn from_sse_line(line: &str) -> Option<Self> {
        let data = line.strip_prefix("data:")?.trim();
        if data.is_empty() {
            return None;
        }
        if data.eq_ignore_ascii_case(COMPLETED_LINE) {
            return Some(RunEvent::Completed);
        }
        match serde_json::from_str::<ProgressPayload>(data) {
            Ok(payload) if payload.progress.is_finite() => Some(RunEvent::Progress(payload.progress.clamp(0.0, 1.0))),
            _ => Some(RunEvent::Status(data.to_string())),
        }
    }

    /// Formats the event as the engine puts it on the wire.
    pub fn to_sse_line(&self) -> String {
        match self {
            RunEvent::Progress(fraction) => format!("data: {}", serde_json::json!({ "progress": fraction })),
            RunEvent::Status(text) => format!("data: {}", text),
            RunEvent::Completed => format!("data: {}", COMPLETED_LINE),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::Completed)
    }
}

impl std::fmt::Display for RunEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunEvent::Progress(fraction) => write!(f, "{:.1}%", fraction * 100.0),
            RunEvent::Status(text) => write!(f, "{}", text),
            RunEvent::Completed => write!(f, "{}", COMPLETED_LINE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_id_parse() {
        let id = SimulationId::new();
        let parsed: SimulationId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SimulationId>().is_err());
    }

    #[test]
    fn test_page_key_display() {
        let id = SimulationId::from_uuid(Uuid::nil());
        assert_eq!(PageKey::new(id, PageIndex(3)).to_string(), "00000000#3");
    }

    #[test]
    fn test_sse_lines() {
        assert_eq!(
            RunEvent::from_sse_line("data: {\"progress\": 0.42}"),
            Some(RunEvent::Progress(0.42))
        );
        assert_eq!(
            RunEvent::from_sse_line("data: Calculations completed, processing results..."),
            Some(RunEvent::Status("Calculations completed, processing results...".to_string()))
        );
        assert_eq!(RunEvent::from_sse_line("data: Simulation completed!"), Some(RunEvent::Completed));
        assert_eq!(RunEvent::from_sse_line(": keep-alive"), None);
        assert_eq!(RunEvent::from_sse_line("data:"), None);
        assert!(RunEvent::Completed.is_terminal());
        assert!(!RunEvent::Progress(1.0).is_terminal());
    }

    #[test]
    fn test_progress_payload_is_typed() {
        // Out-of-range fractions are clamped
        assert_eq!(RunEvent::from_sse_line("data: {\"progress\": 1.7}"), Some(RunEvent::Progress(1.0)));
        assert_eq!(RunEvent::from_sse_line("data:{\"progress\":0}"), Some(RunEvent::Progress(0.0)));

        // JSON without a numeric progress field stays status text
        assert_eq!(
            RunEvent::from_sse_line("data: {\"stage\": \"csv\"}"),
            Some(RunEvent::Status("{\"stage\": \"csv\"}".to_string()))
        );
        assert_eq!(
            RunEvent::from_sse_line("data: {\"progress\": \"half\"}"),
            Some(RunEvent::Status("{\"progress\": \"half\"}".to_string()))
        );
    }

    #[test]
    fn test_events_survive_the_wire() {
        let events = [
            RunEvent::Progress(0.25),
            RunEvent::Status("Calculations completed, processing results...".to_string()),
            RunEvent::Completed,
        ];
        for event in events {
            assert_eq!(RunEvent::from_sse_line(&event.to_sse_line()), Some(event));
        }
        assert_eq!(RunEvent::Progress(0.25).to_string(), "25.0%");
    }
}
