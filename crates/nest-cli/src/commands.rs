use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use nest_sdk::{
    Author, ClientConfig, FeedClient, FeedKey, IgnoreReason, InMemoryFeedBackend, MutationOutcome,
    PostRecord, ScrollOutcome, SubmitPost,
};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Demo(args) => cmd_demo(args, &cli.format).await,
        Command::Config(args) => cmd_config(args, &cli.format),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<ClientConfig> {
    Ok(match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    })
}

fn cmd_config(args: ConfigArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = load_config(args.path.as_deref())?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => {
            if let Some(path) = &args.path {
                println!("{} {} is valid", "✓".green().bold(), path.display());
            }
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}

async fn cmd_demo(args: DemoArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let me = Author::new(args.user.as_str(), args.user.as_str(), args.user.to_uppercase());
    let others = [
        Author::new("alice", "alice", "Alice"),
        Author::new("bob", "bob", "Bob"),
    ];

    let backend = Arc::new(InMemoryFeedBackend::with_page_size(me.clone(), args.page_size));
    for i in 0..args.seed {
        let author = if i % 3 == 2 { &me } else { &others[i % 3] };
        backend.publish(author, format!("{} says hi (#{})", author.display_name, i + 1))?;
    }
    let client = FeedClient::in_memory(config, backend.clone())?;

    let feeds = [FeedKey::home(), FeedKey::profile(me.id.as_str()), FeedKey::profile("alice")];
    for key in &feeds {
        report_scroll(&client.load(key).await);
    }
    for _ in 0..args.scrolls {
        report_scroll(&client.near_bottom(&FeedKey::home()).await);
    }

    if matches!(format, OutputFormat::Text) {
        println!();
        for key in &feeds {
            print_feed(&client, key)?;
        }
    }

    backend.set_fail_creates(args.fail);
    backend.set_latency(Duration::from_millis(args.latency_ms));
    let submit = SubmitPost::new(me, args.message).with_media(args.media);
    let outcome = client.submit(submit).await;

    match format {
        OutputFormat::Json => {
            let mut out = serde_json::Map::new();
            out.insert("settled".into(), outcome.is_settled().into());
            for key in &feeds {
                out.insert(key.to_string(), serde_json::to_value(client.posts(key)?)?);
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!();
            report_mutation(&outcome);
            println!();
            for key in &feeds {
                print_feed(&client, key)?;
            }
        }
    }
    Ok(())
}

fn report_scroll(outcome: &ScrollOutcome) {
    match outcome {
        ScrollOutcome::FirstPageLoaded { key, post_count, has_next_page } => {
            println!("{} loaded {} ({} posts{})", "↓".cyan(), key.to_string().bold(), post_count,
                if *has_next_page { ", more available" } else { "" });
        }
        ScrollOutcome::PageAppended { key, posts_added, has_next_page } => {
            println!("{} appended {} posts to {}{}", "↓".cyan(), posts_added, key.to_string().bold(),
                if *has_next_page { "" } else { " (end of feed)" });
        }
        ScrollOutcome::FetchFailed { key, error } => {
            println!("{} fetch for {} failed: {}", "✗".red().bold(), key.to_string().bold(), error);
        }
        ScrollOutcome::Ignored(IgnoreReason::EndOfFeed) => println!("{} end of feed", "·".dimmed()),
        ScrollOutcome::Ignored(reason) => println!("{} scroll ignored: {:?}", "·".dimmed(), reason),
        ScrollOutcome::Cancelled { key } => println!("{} fetch for {} cancelled", "·".dimmed(), key),
    }
}

fn report_mutation(outcome: &MutationOutcome) {
    match outcome {
        MutationOutcome::Settled { post, temp_id, report } => {
            println!("{} Post {} created (placeholder {})", "✓".green().bold(),
                post.id.to_string().yellow(), temp_id.short_id().dimmed());
            for (key, reconciliation) in &report.feeds {
                println!("  {}: {:?}", key.to_string().bold(), reconciliation);
            }
        }
        MutationOutcome::Failed { error, temp_id, restored } => {
            println!("{} Post failed: {}", "✗".red().bold(), error);
            if let Some(temp_id) = temp_id {
                println!("  Placeholder {} removed", temp_id.short_id().dimmed());
            }
            for key in restored {
                println!("  {}: restored", key.to_string().bold());
            }
        }
    }
}

fn print_feed(client: &FeedClient, key: &FeedKey) -> anyhow::Result<()> {
    let posts = client.posts(key)?;
    let more = client.has_next_page(key)?;
    println!("{} ({} posts{})", key.to_string().bold().underline(), posts.len(),
        if more { ", more below" } else { "" });
    for post in &posts {
        print_post(post);
    }
    Ok(())
}

fn print_post(post: &PostRecord) {
    let id = if post.is_placeholder() {
        "pending".yellow().to_string()
    } else {
        post.id.to_string().dimmed().to_string()
    };
    let media = if post.media.is_empty() {
        String::new()
    } else {
        format!(" [{} media]", post.media.len())
    };
    println!("  {:<10} @{}: {}{}", id, post.author.username.cyan(), post.content, media);
}
