// src/main.rs
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use notion_replica::{
    AppError, BlockTree, Command, CommandLineInput, DocumentNode, NotionId, PropertyInput,
    SharedStore, StoreConfig,
};
use std::fs;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let log_file_path = std::env::temp_dir().join("notion_replica.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(log4rs::append::console::Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Prints a page's title, properties and top-level blocks.
async fn show(store: &SharedStore, id: &NotionId) -> Result<(), AppError> {
    let mut document = DocumentNode::retrieve(store, id).await?;

    println!("{} ({})", document.title(), document.kind.object_name());
    if let Some(url) = &document.url {
        println!("{}", url);
    }
    for (name, property) in &document.properties {
        println!("  {} [{}]: {}", name, property.tag(), property.extract());
    }
    for (name, descriptor) in &document.schema {
        println!("  {} [{}]", name, descriptor.tag);
    }

    for block in document.blocks(store).await?.iter() {
        let marker = if block.has_children { "+" } else { "-" };
        println!("{} {}: {}", marker, block.block.tag(), block.block.plain_text());
    }
    Ok(())
}

async fn duplicate(
    store: &SharedStore,
    source: &NotionId,
    target: notion_replica::Parent,
) -> Result<(), AppError> {
    let mut document = DocumentNode::retrieve(store, source).await?;
    let copy = document.duplicate(store, &target).await?;

    let blocks: usize = copy
        .blocks
        .iter()
        .flatten()
        .map(BlockTree::node_count)
        .sum();
    println!(
        "✓ Copied '{}' to {} ({} blocks)",
        document.title(),
        copy.id.as_ref().map_or("?", NotionId::as_str),
        blocks
    );
    if let Some(url) = &copy.url {
        println!("{}", url);
    }
    Ok(())
}

/// Shapes raw CLI words into the input the property's type expects.
fn property_input(tag: &str, mut values: Vec<String>) -> PropertyInput {
    if values.len() != 1 || matches!(tag, "multi_select" | "relation" | "people") {
        return PropertyInput::List(values);
    }
    let value = values.remove(0);
    match tag {
        "number" => value
            .parse::<i64>()
            .map(PropertyInput::Integer)
            .or_else(|_| value.parse::<f64>().map(PropertyInput::Float))
            .unwrap_or(PropertyInput::Text(value)),
        "checkbox" => value
            .parse::<bool>()
            .map(PropertyInput::Bool)
            .unwrap_or(PropertyInput::Text(value)),
        _ => PropertyInput::Text(value),
    }
}

async fn set(
    store: &SharedStore,
    page: &NotionId,
    property: &str,
    values: Vec<String>,
) -> Result<(), AppError> {
    let mut document = DocumentNode::retrieve(store, page).await?;
    let tag = document.property(property)?.tag().to_string();
    document.set(property, property_input(&tag, values))?;
    document.update(store).await?;
    println!("✓ {} = {}", property, document.extract(property)?);
    Ok(())
}

async fn run(cli: CommandLineInput) -> Result<(), AppError> {
    let store = StoreConfig::resolve(&cli)?.connect()?;

    match cli.command {
        Command::Show { id } => show(&store, &NotionId::parse(&id)?).await,
        Command::Duplicate {
            source,
            into,
            parent_kind,
        } => {
            let target = parent_kind.parent(NotionId::parse(&into)?);
            duplicate(&store, &NotionId::parse(&source)?, target).await
        }
        Command::Set {
            page,
            property,
            values,
        } => set(&store, &NotionId::parse(&page)?, &property, values).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = CommandLineInput::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        if let AppError::DuplicationIncomplete { failures } = &e {
            for failure in failures {
                eprintln!("  ✗ {}", failure);
            }
        }
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
