use crate::cmd::{load_config, runtime, shortcut, unbound_jj};
use crate::output::print_json;
use anyhow::Context;
use dtree_core::workflow::bookmark_story;
use dtree_core::ShortcutStory;
use std::path::Path;

pub fn run(root: &Path, id: u64, bookmark: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let shortcut = shortcut(&config)?;
    let rt = runtime()?;

    let story = rt.block_on(async {
        if bookmark {
            let mut jj = unbound_jj(&config);
            bookmark_story(&mut jj, &shortcut, id, root)
                .await
                .with_context(|| format!("failed to bookmark story {id}"))
        } else {
            shortcut
                .story(id)
                .await
                .with_context(|| format!("failed to fetch story {id}"))
        }
    })?;

    if json {
        print_json(&story)?;
    } else {
        print_story(&story);
        if bookmark {
            println!();
            println!("Bookmarked current change as '{}'", story.branch_name);
        }
    }
    Ok(())
}

fn print_story(story: &ShortcutStory) {
    println!("sc-{}  {}", story.id, story.name);
    if let Some(state) = &story.state {
        println!("State:   {state}");
    }
    println!("Branch:  {}", story.branch_name);
    if !story.app_url.is_empty() {
        println!("URL:     {}", story.app_url);
    }
    if !story.description.is_empty() {
        println!();
        println!("{}", story.description);
    }
}
