//! Action recommender: flattens issue actions into a ranked, bounded list.

use crate::types::{EstimatedImpact, Issue, Recommendation, RecommendationScope};

#[derive(Debug, Clone, Copy, Default)]
pub struct ActionRecommender;

impl ActionRecommender {
    /// Rank every recommended action across `issues`.
    ///
    /// Ordering is by priority (1 first), then by descending confidence;
    /// ties keep detection order. Ids use a running index over all actions
    /// considered, so they stay stable under truncation.
    pub fn recommend(
        &self,
        issues: &[Issue],
        scope: RecommendationScope,
        limit: usize,
    ) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = Vec::new();

        for issue in issues.iter().filter(|i| in_scope(i, scope)) {
            let priority = issue.severity.priority();
            for action in &issue.recommended_actions {
                let justification = if action.reasoning.is_empty() {
                    issue.reason.clone()
                } else {
                    action.reasoning.clone()
                };
                recommendations.push(Recommendation {
                    id: format!("{}_action_{}", issue.id, recommendations.len()),
                    priority,
                    action: action.action.clone(),
                    estimated_impact: EstimatedImpact {
                        mva: action.estimated_mva_change,
                        loading_pct: action.estimated_pct_change,
                    },
                    confidence: action.confidence,
                    justification,
                });
            }
        }

        // sort_by is stable
        recommendations.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });
        recommendations.truncate(limit);
        recommendations
    }
}

fn in_scope(issue: &Issue, scope: RecommendationScope) -> bool {
    match scope {
        RecommendationScope::Line => issue.is_line_specific(),
        RecommendationScope::Area | RecommendationScope::Grid => true,
    }
}
