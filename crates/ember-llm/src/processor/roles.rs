use crate::types::{Message, Role};

/// Once a user or assistant message has appeared, demote every later
/// non-conversational message to `user`
pub(super) fn no_dangling_sys(messages: &mut [Message]) {
    let mut conversation_started = false;

    for message in messages {
        if message.role.is_conversational() {
            conversation_started = true;
        } else if conversation_started {
            message.role = Role::User;
        }
    }
}

pub(super) fn no_sys(messages: &mut [Message]) {
    for message in messages.iter_mut().filter(|m| !m.role.is_conversational()) {
        message.role = Role::User;
    }
}

/// Give every message from the first assistant turn onward the same role
pub(super) fn noass(messages: &mut [Message], role: Role) {
    let Some(start) = messages.iter().position(|m| m.role == Role::Assistant) else {
        return;
    };

    for message in &mut messages[start..] {
        message.role = role;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(messages: &[Message]) -> Vec<Role> {
        messages.iter().map(|m| m.role).collect()
    }

    #[test]
    fn dangling_system_messages_become_user() {
        let mut messages = vec![
            Message::text(Role::System, "s"),
            Message::text(Role::User, "u"),
            Message::text(Role::System, "s2"),
            Message::text(Role::Assistant, "a"),
        ];
        no_dangling_sys(&mut messages);
        assert_eq!(
            roles(&messages),
            vec![Role::System, Role::User, Role::User, Role::Assistant]
        );
    }

    #[test]
    fn leading_instructions_are_kept() {
        let mut messages = vec![
            Message::text(Role::System, "s"),
            Message::text(Role::Developer, "d"),
            Message::text(Role::Assistant, "a"),
            Message::text(Role::Developer, "d2"),
        ];
        no_dangling_sys(&mut messages);
        assert_eq!(
            roles(&messages),
            vec![Role::System, Role::Developer, Role::Assistant, Role::User]
        );
    }

    #[test]
    fn no_sys_demotes_everything_instructional() {
        let mut messages = vec![
            Message::text(Role::System, "s"),
            Message::text(Role::Developer, "d"),
            Message::text(Role::Assistant, "a"),
        ];
        no_sys(&mut messages);
        assert_eq!(roles(&messages), vec![Role::User, Role::User, Role::Assistant]);
    }

    #[test]
    fn noass_rewrites_from_first_assistant() {
        let mut messages = vec![
            Message::text(Role::System, "s"),
            Message::text(Role::User, "u"),
            Message::text(Role::Assistant, "a"),
            Message::text(Role::User, "u2"),
        ];
        noass(&mut messages, Role::User);
        assert_eq!(roles(&messages), vec![Role::System, Role::User, Role::User, Role::User]);
    }

    #[test]
    fn noass_without_assistant_is_a_no_op() {
        let mut messages = vec![Message::text(Role::System, "s"), Message::text(Role::User, "u")];
        noass(&mut messages, Role::Developer);
        assert_eq!(roles(&messages), vec![Role::System, Role::User]);
    }
}
