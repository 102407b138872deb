use skein::{ArgValue, Kwargs, MethodRef};
use skein_demo::config::load_config;
use skein_demo::host::Host;

fn main() -> anyhow::Result<()> {
    let config = load_config(std::path::Path::new("demo.toml"))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    tracing::info!(scenario = %config.scenario, "starting demo");

    let mut host = Host::new();
    let author = host.create("User");

    let article = host.call(
        &author,
        MethodRef::new("User", "write_article"),
        vec![
            ArgValue::json("Replay-driven execution, briefly"),
            ArgValue::json("Every suspension is just a call that hasn't been answered yet."),
        ],
        Kwargs::default(),
    )?;
    let article_id = article
        .as_entity()
        .expect("write_article always returns an entity handle")
        .clone();
    println!("published article: {article_id}");

    let commenter = host.create("User");
    let comment = host.call(
        &commenter,
        MethodRef::new("User", "write_comment"),
        vec![ArgValue::Entity(article_id.clone()), ArgValue::json("Nicely put.")],
        Kwargs::default(),
    )?;
    println!("posted comment: {comment:?}");

    let rejected = host.call(
        &commenter,
        MethodRef::new("User", "write_comment"),
        vec![
            ArgValue::Entity(article_id.clone()),
            ArgValue::json("this is spam, buy now"),
        ],
        Kwargs::default(),
    );
    match rejected {
        Ok(value) => println!("unexpected success: {value:?}"),
        Err(err) => println!("comment correctly rejected: {err}"),
    }

    Ok(())
}
