use skein::{Execution, Message};

use crate::entities::{article::Article, comment::Comment, user::User};

/// Dispatches a `complete` call to the concrete entity type named by
/// `entity_type`. The host never constructs an `Execution<E>` directly —
/// it only knows type names, the same way the engine only knows method
/// names.
pub fn complete_for_type(entity_type: &str, inputs: Vec<Message>) -> anyhow::Result<Vec<Message>> {
    match entity_type {
        "User" => Ok(Execution::<User>::new().complete(inputs)),
        "Article" => Ok(Execution::<Article>::new().complete(inputs)),
        "Comment" => Ok(Execution::<Comment>::new().complete(inputs)),
        other => anyhow::bail!("no entity type registered under the name {other}"),
    }
}
