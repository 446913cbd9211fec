use crate::cmd::{load_config, notion, runtime};
use crate::output::print_json;
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let notion = notion(&config)?;
    let page = runtime()?
        .block_on(notion.page(id))
        .with_context(|| format!("failed to fetch page {id}"))?;

    if json {
        print_json(&page)?;
    } else {
        println!("{}", page.title);
        if !page.content.is_empty() {
            println!();
            println!("{}", page.content);
        }
    }
    Ok(())
}
