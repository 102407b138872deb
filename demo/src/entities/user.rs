use anyhow::Context;
use serde::{Deserialize, Serialize};
use skein::{ArgValue, Args, CallContext, Entity, EntityRef, Kwargs, MethodError, MethodRef};

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserState {
    display_name: String,
    articles_written: u64,
}

/// A person who writes articles and leaves comments on other people's.
#[derive(Default)]
pub struct User {
    state: UserState,
}

impl Entity for User {
    fn entity_type(&self) -> &'static str {
        "User"
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&self.state).expect("UserState always serializes")
    }

    fn restore(&mut self, state: &serde_json::Value) -> Result<(), MethodError> {
        self.state = serde_json::from_value(state.clone()).context("invalid User snapshot")?;
        Ok(())
    }

    fn invoke(
        &mut self,
        ctx: &mut CallContext<'_>,
        method: &str,
        args: &Args,
        _kwargs: &Kwargs,
    ) -> Result<ArgValue, MethodError> {
        match method {
            "write_article" => self.write_article(ctx, args),
            "write_comment" => self.write_comment(ctx, args),
            other => Err(anyhow::anyhow!("User has no method named {other}").into()),
        }
    }
}

impl User {
    fn write_article(
        &mut self,
        ctx: &mut CallContext<'_>,
        args: &Args,
    ) -> Result<ArgValue, MethodError> {
        let title = args
            .first()
            .and_then(ArgValue::as_json)
            .and_then(|v| v.as_str())
            .context("write_article requires a title")?
            .to_string();
        let body = args
            .get(1)
            .and_then(ArgValue::as_json)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let subject = ctx.subject();
        let article_id = ctx.create_entity(
            "Article",
            vec![subject.into(), ArgValue::json(title), ArgValue::json(body)],
            Kwargs::default(),
        )?;
        self.state.articles_written += 1;
        Ok(ArgValue::Entity(article_id))
    }

    fn write_comment(
        &mut self,
        ctx: &mut CallContext<'_>,
        args: &Args,
    ) -> Result<ArgValue, MethodError> {
        let article = args
            .first()
            .and_then(ArgValue::as_entity)
            .cloned()
            .context("write_comment requires an article reference")?;
        let text = args
            .get(1)
            .and_then(ArgValue::as_json)
            .and_then(|v| v.as_str())
            .context("write_comment requires comment text")?
            .to_string();

        if !is_clean(&text) {
            return Err(anyhow::anyhow!("comment rejected by moderation").into());
        }

        let subject = ctx.subject();
        let comment_id = ctx.create_entity(
            "Comment",
            vec![subject.into(), ArgValue::json(text)],
            Kwargs::default(),
        )?;
        ctx.call_method(
            EntityRef::Entity(article),
            MethodRef::new("Article", "add_comment"),
            vec![ArgValue::Entity(comment_id)],
            Kwargs::default(),
        )
    }
}

/// A rough moderation pass run before a comment is ever created, not a
/// suspending service call: it keeps the create-entity request the
/// first thing `write_comment` emits.
fn is_clean(text: &str) -> bool {
    !text.to_lowercase().contains("spam")
}
