use super::grouping::{normalize_line_endings, ContentGroup};
use super::types::SwipeOccurrence;

/// An alternate generation offered for a content group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwipeCandidate {
    /// Line-ending normalized swipe text
    pub text: String,
    /// Sessions carrying this swipe, the first one being the source
    pub occurrences: Vec<SwipeOccurrence>,
}

impl SwipeCandidate {
    /// Session the swipe was first seen in
    pub fn source_session(&self) -> &str {
        self.occurrences
            .first()
            .map(|o| o.session_id.as_str())
            .unwrap_or_default()
    }

    /// Index of the swipe in the source session's swipe list
    pub fn original_index(&self) -> usize {
        self.occurrences.first().map(|o| o.index).unwrap_or_default()
    }
}

/// Collect the distinct swipes of a content group, excluding its own text.
///
/// Swipes on the first message of a chat are not offered.
pub fn extract_swipes(position: usize, group: &ContentGroup<'_>) -> Vec<SwipeCandidate> {
    if position == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<SwipeCandidate> = Vec::new();
    for member in &group.members {
        for (index, swipe) in member.message.swipes.iter().enumerate() {
            let text = normalize_line_endings(swipe);
            if text == group.text {
                continue;
            }

            let occurrence = SwipeOccurrence {
                session_id: member.session_id.to_string(),
                index,
            };
            match candidates.iter_mut().find(|c| c.text == text) {
                Some(candidate) => {
                    if !candidate
                        .occurrences
                        .iter()
                        .any(|o| o.session_id == occurrence.session_id)
                    {
                        candidate.occurrences.push(occurrence);
                    }
                }
                None => candidates.push(SwipeCandidate {
                    text,
                    occurrences: vec![occurrence],
                }),
            }
        }
    }

    candidates
}
