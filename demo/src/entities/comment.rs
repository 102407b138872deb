use anyhow::Context;
use serde::{Deserialize, Serialize};
use skein::{ArgValue, Args, CallContext, Entity, EntityRef, Kwargs, MethodError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CommentState {
    author: Option<EntityRef>,
    text: String,
}

/// A remark left on an [`crate::entities::article::Article`]. Has no
/// behavior of its own beyond construction and a read accessor — most of
/// what makes a comment interesting happens in `Article::add_comment`.
#[derive(Default)]
pub struct Comment {
    state: CommentState,
}

impl Entity for Comment {
    fn entity_type(&self) -> &'static str {
        "Comment"
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&self.state).expect("CommentState always serializes")
    }

    fn restore(&mut self, state: &serde_json::Value) -> Result<(), MethodError> {
        self.state = serde_json::from_value(state.clone()).context("invalid Comment snapshot")?;
        Ok(())
    }

    fn invoke(
        &mut self,
        _ctx: &mut CallContext<'_>,
        method: &str,
        args: &Args,
        _kwargs: &Kwargs,
    ) -> Result<ArgValue, MethodError> {
        match method {
            "new" => self.new_comment(args),
            "text" => Ok(ArgValue::json(self.state.text.clone())),
            other => Err(anyhow::anyhow!("Comment has no method named {other}").into()),
        }
    }
}

impl Comment {
    fn new_comment(&mut self, args: &Args) -> Result<ArgValue, MethodError> {
        let author = match args.first() {
            Some(ArgValue::Subject) => EntityRef::Subject,
            Some(ArgValue::Entity(id)) => EntityRef::Entity(id.clone()),
            _ => return Err(anyhow::anyhow!("new requires an author reference").into()),
        };
        let text = args
            .get(1)
            .and_then(ArgValue::as_json)
            .and_then(|v| v.as_str())
            .context("new requires comment text")?
            .to_string();
        self.state.author = Some(author);
        self.state.text = text;
        Ok(ArgValue::Unit)
    }
}
