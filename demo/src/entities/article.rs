use anyhow::Context;
use serde::{Deserialize, Serialize};
use skein::{ArgValue, Args, CallContext, Entity, EntityId, EntityRef, Kwargs, MethodError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArticleState {
    author: Option<EntityRef>,
    title: String,
    body: String,
    comments: Vec<EntityId>,
    deleted: bool,
}

/// A published piece of writing that other users may comment on.
#[derive(Default)]
pub struct Article {
    state: ArticleState,
}

impl Entity for Article {
    fn entity_type(&self) -> &'static str {
        "Article"
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&self.state).expect("ArticleState always serializes")
    }

    fn restore(&mut self, state: &serde_json::Value) -> Result<(), MethodError> {
        self.state = serde_json::from_value(state.clone()).context("invalid Article snapshot")?;
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
            "new" => self.new_article(args),
            "add_comment" => self.add_comment(args),
            "delete" => self.delete(),
            other => Err(anyhow::anyhow!("Article has no method named {other}").into()),
        }
    }
}

impl Article {
    /// Constructor dispatch used by the host right after it materializes
    /// a freshly created Article (see `Host::pump`'s handling of
    /// `CreateEntityRequestSent`). Not callable once the article exists.
    fn new_article(&mut self, args: &Args) -> Result<ArgValue, MethodError> {
        let author = as_entity_ref(args.first().context("new requires an author")?)?;
        let title = args
            .get(1)
            .and_then(ArgValue::as_json)
            .and_then(|v| v.as_str())
            .context("new requires a title")?
            .to_string();
        let body = args
            .get(2)
            .and_then(ArgValue::as_json)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        self.state.author = Some(author);
        self.state.title = title;
        self.state.body = body;
        Ok(ArgValue::Unit)
    }

    /// The comment itself is already built by the time this runs
    /// (`User::write_comment` creates it before calling here); this just
    /// attaches it to the article.
    fn add_comment(&mut self, args: &Args) -> Result<ArgValue, MethodError> {
        if self.state.deleted {
            return Err(anyhow::anyhow!("cannot comment on a deleted article").into());
        }
        let comment_id = args
            .first()
            .and_then(ArgValue::as_entity)
            .cloned()
            .context("add_comment requires a comment reference")?;
        self.state.comments.push(comment_id);
        Ok(ArgValue::Unit)
    }

    fn delete(&mut self) -> Result<ArgValue, MethodError> {
        self.state.deleted = true;
        Ok(ArgValue::Unit)
    }
}

fn as_entity_ref(value: &ArgValue) -> anyhow::Result<EntityRef> {
    match value {
        ArgValue::Subject => Ok(EntityRef::Subject),
        ArgValue::Entity(id) => Ok(EntityRef::Entity(id.clone())),
        other => anyhow::bail!("expected an entity reference, got {other:?}"),
    }
}
