use crate::chat::{ChatSessions, Message};

/// A message together with the session and position it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedMessage<'a> {
    pub session_id: &'a str,
    pub position: usize,
    /// Number of messages in the session
    pub session_length: usize,
    pub message: &'a Message,
}

/// Rearrange sessions into one list per message position.
///
/// Entry `i` holds the `i`-th message of every session long enough to have
/// one, in session insertion order. The outer list is as long as the longest
/// session.
pub fn transpose_sessions(sessions: &ChatSessions) -> Vec<Vec<PositionedMessage<'_>>> {
    let longest = sessions.iter().map(|s| s.messages.len()).max().unwrap_or(0);
    let mut positions: Vec<Vec<PositionedMessage<'_>>> = vec![Vec::new(); longest];

    for session in sessions.iter() {
        let session_length = session.messages.len();
        for (position, message) in session.messages.iter().enumerate() {
            positions[position].push(PositionedMessage {
                session_id: &session.id,
                position,
                session_length,
                message,
            });
        }
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<'a>(entries: &[PositionedMessage<'a>]) -> Vec<&'a str> {
        entries.iter().map(|e| e.session_id).collect()
    }

    #[test]
    fn test_transpose_uneven_sessions() {
        let sessions: ChatSessions = vec![
            ("A", vec![Message::new("C", "1"), Message::new("C", "2")]),
            (
                "B",
                vec![Message::new("C", "1"), Message::new("C", "2"), Message::new("C", "3")],
            ),
        ]
        .into_iter()
        .collect();

        let positions = transpose_sessions(&sessions);
        assert_eq!(positions.len(), 3);
        assert_eq!(ids(&positions[0]), vec!["A", "B"]);
        assert_eq!(ids(&positions[2]), vec!["B"]);
        assert_eq!(positions[2][0].position, 2);
        assert_eq!(positions[2][0].session_length, 3);
        assert_eq!(positions[1][0].message.text(), Some("2"));
    }

    #[test]
    fn test_transpose_empty() {
        assert!(transpose_sessions(&ChatSessions::new()).is_empty());

        let sessions: ChatSessions = vec![("A", vec![])].into_iter().collect();
        assert!(transpose_sessions(&sessions).is_empty());
    }
}
