use crate::{Event, Recipient};

/// Decides whether `event` may be delivered to `recipient`.
///
/// The rules, in order:
/// - `adminOnly` events go to admins and nobody else, regardless of any
///   `userId` on the event.
/// - Targeted events go only to the recipient whose id matches, admin or not.
///   An event targeted at someone else stays private even from other admins.
/// - Untargeted events go to admins only; a regular user never receives an
///   event that was not explicitly addressed to them.
pub fn should_forward(event: &Event, recipient: &Recipient) -> bool {
    if event.admin_only {
        return recipient.role.is_admin();
    }
    match &event.user_id {
        Some(target) => *target == recipient.id,
        None => recipient.role.is_admin(),
    }
}
