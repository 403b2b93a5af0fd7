use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use super::grouping::ContentGroup;
use crate::chat::ChatSessions;

/// Text of the system notice older chat versions wrote when a checkpoint
/// was created
pub const LEGACY_CHECKPOINT_MARKER: &str =
    "Bookmark created! Click here to open the bookmark chat";

static LEGACY_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"file_name="(.*?)""#).expect("valid legacy target pattern"));

/// Checkpoint classification of a content group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointInfo {
    pub is_checkpoint: bool,
    /// Chat the checkpoint branches into
    pub target_name: Option<String>,
    /// Session opened when the node is activated
    pub source_session: Option<String>,
}

impl CheckpointInfo {
    fn plain(group: &ContentGroup<'_>) -> Self {
        Self {
            is_checkpoint: false,
            target_name: None,
            source_session: group.members.first().map(|m| m.session_id.to_string()),
        }
    }
}

/// Extract the target chat name from a legacy checkpoint notice
pub fn legacy_target(text: &str) -> Option<&str> {
    LEGACY_TARGET
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Decide whether a content group is a checkpoint.
///
/// The first member that is either a system message carrying the legacy
/// notice or a message with a checkpoint link decides. A link takes
/// precedence over the notice; with a link the member's own session is the
/// source, with a legacy notice the target chat is. A target that names no
/// known session demotes the group to a plain message.
pub fn detect_checkpoint(group: &ContentGroup<'_>, known: &ChatSessions) -> CheckpointInfo {
    let is_legacy = group.text.contains(LEGACY_CHECKPOINT_MARKER);
    let Some(member) = group.members.iter().find(|m| {
        (m.message.is_system && is_legacy) || m.message.bookmark_link().is_some()
    }) else {
        return CheckpointInfo::plain(group);
    };

    let (target, source) = match member.message.bookmark_link() {
        Some(link) => (Some(link.to_string()), Some(member.session_id.to_string())),
        None => {
            let target = legacy_target(&group.text).map(str::to_string);
            (target.clone(), target)
        }
    };

    match target {
        Some(target) if known.has_chat(&target) => CheckpointInfo {
            is_checkpoint: true,
            target_name: Some(target),
            source_session: source,
        },
        target => {
            info!(
                session_id = %member.session_id,
                position = member.position,
                target = target.as_deref().unwrap_or(""),
                "Checkpoint target chat not found, treating as plain message"
            );
            CheckpointInfo::plain(group)
        }
    }
}
