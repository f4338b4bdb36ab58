//! Tag command - embed a title into a Sound Tracker Pro compiled module

use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::PathBuf;

use chip_formats::aym::soundtrackerpro::{insert_meta_information, make_identifier};

/// Arguments for the tag command
#[derive(Args)]
pub struct TagArgs {
    /// Sound Tracker Pro compiled module
    pub file: PathBuf,

    /// Title to store, cut to 25 characters
    #[arg(long)]
    pub title: String,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Execute the tag command
pub fn execute(args: TagArgs) -> Result<()> {
    let data = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let tagged = tag_module(data, &args.title)?;
    std::fs::write(&args.output, &tagged)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    tracing::info!(
        output = %args.output.display(),
        size = tagged.len(),
        "Tagged module"
    );
    Ok(())
}

fn tag_module(data: Vec<u8>, title: &str) -> Result<Vec<u8>> {
    if !title.is_ascii() {
        bail!("Title must be ASCII");
    }
    let source = chip_binary::Container::new(data);
    let Some(patched) = insert_meta_information(&source, &make_identifier(title)) else {
        bail!("Not a Sound Tracker Pro compiled module");
    };
    Ok(patched.data().to_vec())
}
