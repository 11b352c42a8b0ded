//! Append-only conversation log.

use crate::models::Message;

/// Ordered record of user and assistant messages.
///
/// There is no way to edit, reorder or remove an entry once it has been
/// pushed.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_push_preserves_order() {
        let mut t = Transcript::new();
        t.push(Message::user("q"));
        t.push(Message::assistant("a"));
        let roles: Vec<Role> = t.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(t.last().unwrap().content, "a");
    }

    #[test]
    fn test_empty() {
        let t = Transcript::new();
        assert!(t.is_empty());
        assert!(t.last().is_none());
    }
}
