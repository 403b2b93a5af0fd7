use tracing::error;

use super::transpose::PositionedMessage;
use crate::chat::Message;

/// Convert CRLF line endings to LF
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// One session's message inside a content group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMember<'a> {
    pub session_id: &'a str,
    pub position: usize,
    pub session_length: usize,
    /// Index of the message among all messages at this position
    pub index_in_group: usize,
    pub message: &'a Message,
}

/// Messages at one position sharing the same normalized text
#[derive(Debug, Clone, PartialEq)]
pub struct ContentGroup<'a> {
    pub text: String,
    pub members: Vec<GroupMember<'a>>,
}

impl<'a> ContentGroup<'a> {
    /// The first member, whose message supplies the node's display fields
    pub fn representative(&self) -> &GroupMember<'a> {
        &self.members[0]
    }

    /// Member session ids in group order
    pub fn session_ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.members.iter().map(|m| m.session_id)
    }
}

/// Partition the messages of one position by normalized text.
///
/// Groups are ordered by first appearance. Messages whose text is not a
/// string are logged and left out.
pub fn group_by_content<'a>(entries: &[PositionedMessage<'a>]) -> Vec<ContentGroup<'a>> {
    let mut groups: Vec<ContentGroup<'a>> = Vec::new();

    for (index_in_group, entry) in entries.iter().enumerate() {
        let Some(raw) = entry.message.text() else {
            error!(
                session_id = %entry.session_id,
                position = entry.position,
                "Skipping message without string text"
            );
            continue;
        };
        let text = normalize_line_endings(raw);

        let group = match groups.iter().position(|g| g.text == text) {
            Some(i) => &mut groups[i],
            None => {
                groups.push(ContentGroup {
                    text,
                    members: Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };

        group.members.push(GroupMember {
            session_id: entry.session_id,
            position: entry.position,
            session_length: entry.session_length,
            index_in_group,
            message: entry.message,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry<'a>(session_id: &'a str, message: &'a Message) -> PositionedMessage<'a> {
        PositionedMessage {
            session_id,
            position: 1,
            session_length: 3,
            message,
        }
    }

    #[test]
    fn test_group_by_content_first_appearance_order() {
        let x = Message::new("C", "x");
        let y = Message::new("C", "y");
        let x2 = Message::new("C", "x");
        let entries = vec![entry("A", &x), entry("B", &y), entry("C", &x2)];

        let groups = group_by_content(&entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].text, "x");
        assert_eq!(groups[0].session_ids().collect::<Vec<_>>(), vec!["A", "C"]);
        assert_eq!(groups[0].members[1].index_in_group, 2);
        assert_eq!(groups[1].representative().session_id, "B");
    }

    #[test]
    fn test_group_by_content_merges_line_endings() {
        let crlf = Message::new("C", "line one\r\nline two");
        let lf = Message::new("C", "line one\nline two");
        let entries = vec![entry("A", &crlf), entry("B", &lf)];

        let groups = group_by_content(&entries);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].text, "line one\nline two");
        assert_eq!(groups[0].members.len(), 2);
    }

    #[test]
    fn test_group_by_content_skips_non_string_text() {
        let broken = Message {
            mes: None,
            ..Message::new("C", "")
        };
        let ok = Message::new("C", "fine");
        let entries = vec![entry("A", &broken), entry("B", &ok)];

        let groups = group_by_content(&entries);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].representative().session_id, "B");
        assert_eq!(groups[0].representative().index_in_group, 1);
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\nc\r"), "a\nb\nc\r");
    }
}
