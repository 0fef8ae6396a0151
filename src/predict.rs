//! Chain inference and ensemble aggregation.
use crate::chain::ChainMember;
use crate::config::{Aggregation, TieBreak};
use crate::error::ChainError;

/// A multi-label prediction: one boolean decision and one confidence
/// (probability of the label being present) per label, indexed by label.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLabelOutput {
    pub bipartition: Vec<bool>,
    pub confidences: Vec<f32>,
}

/// Apply one trained chain to a row of covariates.
///
/// Walks the member's chain order, rebuilding each slot's recorded
/// feature-view shape from the decisions already made for earlier chain
/// positions and feeding each new decision forward. This path is strictly
/// sequential; there is no concurrency hazard at inference time.
///
/// The model's two output classes may be reported in either order, so the
/// decision comes from the class value at the distribution's argmax and
/// the confidence from whichever entry corresponds to class "1".
pub fn predict_member(member: &ChainMember, row: &[f32]) -> Result<MultiLabelOutput, ChainError> {
    let n_labels = member.chain.len();
    let mut label_values = vec![0.0f32; n_labels];
    let mut bipartition = vec![false; n_labels];
    let mut confidences = vec![0.0f32; n_labels];

    for slot in &member.slots {
        let mut features = row.to_vec();
        features.extend(slot.visible_labels.iter().map(|&l| label_values[l]));

        let dist = slot.model.distribution(&features)?;
        let classes = slot.model.classes();
        let max_idx = if dist[0] > dist[1] { 0 } else { 1 };
        let one_idx = if classes[0] == 1 { 0 } else { 1 };

        let decision = classes[max_idx] == 1;
        bipartition[slot.label] = decision;
        confidences[slot.label] = dist[one_idx];
        label_values[slot.label] = if decision { 1.0 } else { 0.0 };
    }

    Ok(MultiLabelOutput {
        bipartition,
        confidences,
    })
}

/// Combine per-member chain outputs into one multi-label prediction.
///
/// For each label the members' binary votes or confidences are averaged,
/// then thresholded. Deterministic given the member outputs.
pub fn combine(
    outputs: &[MultiLabelOutput],
    aggregation: Aggregation,
    threshold: f32,
    tie_break: TieBreak,
) -> MultiLabelOutput {
    let n_labels = outputs.first().map_or(0, |o| o.confidences.len());
    let n_members = outputs.len() as f32;

    let mut confidences = vec![0.0f32; n_labels];
    for output in outputs {
        for j in 0..n_labels {
            confidences[j] += match aggregation {
                Aggregation::Vote => {
                    if output.bipartition[j] {
                        1.0
                    } else {
                        0.0
                    }
                }
                Aggregation::Confidence => output.confidences[j],
            };
        }
    }
    for c in confidences.iter_mut() {
        *c /= n_members;
    }

    let bipartition = confidences
        .iter()
        .map(|&c| match tie_break {
            TieBreak::Exclude => c > threshold,
            TieBreak::Include => c >= threshold,
        })
        .collect();

    MultiLabelOutput {
        bipartition,
        confidences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(bits: &[bool], confs: &[f32]) -> MultiLabelOutput {
        MultiLabelOutput {
            bipartition: bits.to_vec(),
            confidences: confs.to_vec(),
        }
    }

    #[test]
    fn vote_confidence_is_vote_fraction() {
        let outputs = vec![
            output(&[true, false], &[0.9, 0.1]),
            output(&[true, true], &[0.8, 0.6]),
            output(&[false, true], &[0.2, 0.7]),
            output(&[true, false], &[0.7, 0.4]),
        ];
        let combined = combine(&outputs, Aggregation::Vote, 0.5, TieBreak::Exclude);
        assert_eq!(combined.confidences, vec![0.75, 0.5]);
        // 3/4 passes, 2/4 ties and rounds down.
        assert_eq!(combined.bipartition, vec![true, false]);
    }

    #[test]
    fn tie_break_include_keeps_exact_threshold() {
        let outputs = vec![
            output(&[true], &[1.0]),
            output(&[false], &[0.0]),
        ];
        let excluded = combine(&outputs, Aggregation::Vote, 0.5, TieBreak::Exclude);
        let included = combine(&outputs, Aggregation::Vote, 0.5, TieBreak::Include);
        assert_eq!(excluded.bipartition, vec![false]);
        assert_eq!(included.bipartition, vec![true]);
    }

    #[test]
    fn confidence_mode_averages_confidences() {
        let outputs = vec![output(&[true], &[0.9]), output(&[false], &[0.3])];
        let combined = combine(&outputs, Aggregation::Confidence, 0.5, TieBreak::Exclude);
        assert!((combined.confidences[0] - 0.6).abs() < 1e-6);
        assert_eq!(combined.bipartition, vec![true]);
    }
}
