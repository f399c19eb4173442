use crate::types::{Content, Message, Role};

/// Merges maximal runs of same-role messages for the configured roles
#[derive(Debug)]
pub struct Squash {
    roles: Vec<Role>,
    separator: String,
}

impl Squash {
    pub const fn new(roles: Vec<Role>, separator: String) -> Self {
        Self { roles, separator }
    }

    pub(super) fn apply(&self, messages: Vec<Message>) -> Vec<Message> {
        let mut out: Vec<Message> = Vec::with_capacity(messages.len());
        let mut run: Vec<Message> = Vec::new();

        for message in messages {
            if run.first().is_some_and(|first| first.role != message.role) {
                self.flush(&mut run, &mut out);
            }
            run.push(message);
        }
        self.flush(&mut run, &mut out);

        out
    }

    fn flush(&self, run: &mut Vec<Message>, out: &mut Vec<Message>) {
        let Some(role) = run.first().map(|m| m.role) else {
            return;
        };

        if !self.roles.contains(&role) {
            out.append(run);
            return;
        }

        let text = run
            .iter()
            .flat_map(|m| m.content.texts())
            .collect::<Vec<_>>()
            .join(&self.separator);

        out.push(Message {
            role,
            content: Content::Text(text),
            name: None,
        });
        run.clear();
    }
}

/// Inserts one fixed message at a configured position
#[derive(Debug)]
pub struct InsertMessage {
    role: Role,
    content: String,
    position: i64,
}

impl InsertMessage {
    pub const fn new(role: Role, content: String, position: i64) -> Self {
        Self {
            role,
            content,
            position,
        }
    }

    /// Where the message lands in a list of `len` messages
    ///
    /// Negative positions count from the end, `-1` meaning "after the last".
    fn resolve(&self, len: usize) -> usize {
        let len = i64::try_from(len).unwrap_or(i64::MAX);
        let position = if self.position < 0 {
            len + 1 + self.position
        } else {
            self.position
        };

        usize::try_from(position.clamp(0, len)).unwrap_or(0)
    }

    pub(super) fn apply(&self, messages: &mut Vec<Message>) {
        let index = self.resolve(messages.len());
        messages.insert(index, Message::text(self.role, self.content.clone()));
    }
}
