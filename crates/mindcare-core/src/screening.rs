//! Self-administered screening instruments and their scoring rule.
//!
//! The score is the plain sum of item responses. Risk bands:
//!
//! | tool  | high | moderate |
//! |-------|------|----------|
//! | PHQ-9 | ≥ 20 | ≥ 10     |
//! | GAD-7 | ≥ 15 | ≥ 10     |
//! | GHQ   | -    | -        |
//!
//! GHQ results are recorded but always banded `low`.

use crate::config::Config;
use crate::directory;
use crate::error::{CareError, Result};
use crate::policy::Actor;
use crate::store::{Records, Store};
use crate::types::{RiskLevel, ScreeningTool};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest answer on every supported instrument's Likert scale.
pub const MAX_ITEM_SCORE: u32 = 3;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub institution_id: Uuid,
    pub tool_type: ScreeningTool,
    pub score: u32,
    pub responses: Vec<u32>,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of a result copied onto an appointment when a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningSummary {
    pub result_id: Uuid,
    pub tool_type: ScreeningTool,
    pub score: u32,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ScreeningResult> for ScreeningSummary {
    fn from(r: &ScreeningResult) -> Self {
        Self {
            result_id: r.id,
            tool_type: r.tool_type,
            score: r.score,
            risk_level: r.risk_level,
            recommendations: r.recommendations.clone(),
            created_at: r.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub score: u32,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

pub fn assess(tool: ScreeningTool, responses: &[u32]) -> Assessment {
    let score: u32 = responses.iter().sum();
    let risk_level = risk_for(tool, score);
    Assessment {
        score,
        risk_level,
        recommendations: recommendations(tool, risk_level)
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

pub fn risk_for(tool: ScreeningTool, score: u32) -> RiskLevel {
    let (high, moderate) = match tool {
        ScreeningTool::Phq9 => (20, 10),
        ScreeningTool::Gad7 => (15, 10),
        ScreeningTool::Ghq => return RiskLevel::Low,
    };
    if score >= high {
        RiskLevel::High
    } else if score >= moderate {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

fn recommendations(tool: ScreeningTool, risk: RiskLevel) -> &'static [&'static str] {
    match (tool, risk) {
        (ScreeningTool::Phq9, RiskLevel::High) => &[
            "Consider speaking with a mental health professional immediately",
            "Contact your institution's counseling center",
            "Reach out to a trusted friend or family member",
        ],
        (ScreeningTool::Phq9, RiskLevel::Moderate) => &[
            "Consider scheduling an appointment with a counselor",
            "Practice self-care activities",
            "Monitor your symptoms",
        ],
        (ScreeningTool::Phq9, RiskLevel::Low) => &[
            "Continue maintaining good mental health habits",
            "Stay connected with friends and family",
        ],
        (ScreeningTool::Gad7, RiskLevel::High) => &[
            "Consider speaking with a mental health professional",
            "Practice relaxation techniques",
            "Limit caffeine intake",
        ],
        (ScreeningTool::Gad7, RiskLevel::Moderate) => &[
            "Try stress management techniques",
            "Consider counseling if symptoms persist",
            "Maintain regular sleep schedule",
        ],
        (ScreeningTool::Gad7, RiskLevel::Low) => &[
            "Continue current coping strategies",
            "Practice mindfulness when feeling anxious",
        ],
        (ScreeningTool::Ghq, _) => &[],
    }
}

pub fn validate_responses(tool: ScreeningTool, responses: &[u32]) -> Result<()> {
    if responses.is_empty() {
        return Err(CareError::Validation("no responses submitted".into()));
    }
    if let Some(expected) = tool.item_count() {
        if responses.len() != expected {
            return Err(CareError::Validation(format!(
                "{tool} expects {expected} responses, got {}",
                responses.len()
            )));
        }
    }
    if let Some(bad) = responses.iter().find(|r| **r > MAX_ITEM_SCORE) {
        return Err(CareError::Validation(format!(
            "response {bad} out of range 0..={MAX_ITEM_SCORE}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Score and store a screening for the actor. Users without an institution
/// are assigned one first.
pub fn submit(
    store: &Store,
    cfg: &Config,
    actor: &Actor,
    tool: ScreeningTool,
    responses: Vec<u32>,
    is_anonymous: bool,
) -> Result<ScreeningResult> {
    validate_responses(tool, &responses)?;
    let assessment = assess(tool, &responses);

    store.write(|tx| {
        let mut user = tx.require_user(actor.user_id)?;
        let institution_id = directory::ensure_institution(tx, cfg, &mut user)?;

        let result = ScreeningResult {
            id: Uuid::new_v4(),
            user_id: user.id,
            institution_id,
            tool_type: tool,
            score: assessment.score,
            responses,
            risk_level: assessment.risk_level,
            recommendations: assessment.recommendations,
            is_anonymous,
            created_at: Utc::now(),
        };
        tx.insert_screening(&result)?;
        tracing::info!(user = %user.id, tool = %tool, risk = %result.risk_level, "screening recorded");
        Ok(result)
    })
}

/// The actor's own screening history, newest first.
pub fn list_for_user(store: &Store, actor: &Actor) -> Result<Vec<ScreeningResult>> {
    let mut results = store.snapshot()?.screenings_for_user(actor.user_id)?;
    results.reverse();
    Ok(results)
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskCounts {
    pub low: usize,
    pub moderate: usize,
    pub high: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerTool<T> {
    pub phq9: T,
    pub gad7: T,
    pub ghq: T,
}

impl<T> PerTool<T> {
    fn get_mut(&mut self, tool: ScreeningTool) -> &mut T {
        match tool {
            ScreeningTool::Phq9 => &mut self.phq9,
            ScreeningTool::Gad7 => &mut self.gad7,
            ScreeningTool::Ghq => &mut self.ghq,
        }
    }
}

/// Aggregate, identity-free statistics for one institution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionAnalytics {
    pub total_screenings: usize,
    pub risk_levels: RiskCounts,
    pub tool_usage: PerTool<usize>,
    pub average_scores: PerTool<f64>,
}

pub fn summarize(results: &[ScreeningResult]) -> InstitutionAnalytics {
    let mut out = InstitutionAnalytics {
        total_screenings: results.len(),
        ..Default::default()
    };
    let mut totals = PerTool::<u64>::default();

    for r in results {
        match r.risk_level {
            RiskLevel::Low => out.risk_levels.low += 1,
            RiskLevel::Moderate => out.risk_levels.moderate += 1,
            RiskLevel::High => out.risk_levels.high += 1,
        }
        *out.tool_usage.get_mut(r.tool_type) += 1;
        *totals.get_mut(r.tool_type) += u64::from(r.score);
    }

    for &tool in ScreeningTool::all() {
        let count = *out.tool_usage.get_mut(tool);
        let total = *totals.get_mut(tool);
        if count > 0 {
            *out.average_scores.get_mut(tool) = total as f64 / count as f64;
        }
    }
    out
}

pub fn institution_analytics(
    store: &Store,
    actor: &Actor,
    institution_id: Uuid,
) -> Result<InstitutionAnalytics> {
    actor.require_admin("view institution analytics")?;
    let snap = store.snapshot()?;
    let results: Vec<ScreeningResult> = snap
        .screenings()?
        .into_iter()
        .filter(|r| r.institution_id == institution_id)
        .collect();
    Ok(summarize(&results))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
